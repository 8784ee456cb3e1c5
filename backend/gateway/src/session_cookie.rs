//! Browser session scope.
//!
//! Every browser carries a `schedai_session` cookie holding a v4 UUID. A
//! request without one (or with a malformed one) is given a fresh id, and the
//! response sets it.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

pub const COOKIE_NAME: &str = "schedai_session";

#[derive(Debug, Clone)]
pub struct SessionScope {
    id: String,
    fresh: bool,
}

impl SessionScope {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match cookie_session_id(headers) {
            Some(id) => Self { id, fresh: false },
            None => {
                let id = Uuid::new_v4().to_string();
                debug!(session_id = %id, "Minted new session id");
                Self { id, fresh: true }
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when the browser did not present a usable cookie.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn set_cookie_header(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&format!(
            "{COOKIE_NAME}={}; HttpOnly; SameSite=Lax; Path=/",
            self.id
        ))
        .ok()
    }

    /// Add `Set-Cookie` to the response if this scope was just minted.
    pub fn attach(&self, mut response: Response) -> Response {
        if self.fresh {
            if let Some(value) = self.set_cookie_header() {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

fn cookie_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
        .map(|id| id.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_existing_cookie_is_reused() {
        let id = Uuid::new_v4().to_string();
        let headers = headers_with_cookie(&format!("theme=dark; {COOKIE_NAME}={id}; other=1"));
        let scope = SessionScope::from_headers(&headers);
        assert_eq!(scope.id(), id);
        assert!(!scope.is_fresh());
    }

    #[test]
    fn test_missing_cookie_mints_id() {
        let scope = SessionScope::from_headers(&HeaderMap::new());
        assert!(scope.is_fresh());
        assert!(Uuid::parse_str(scope.id()).is_ok());
    }

    #[test]
    fn test_malformed_cookie_is_replaced() {
        let headers = headers_with_cookie(&format!("{COOKIE_NAME}=../../etc/passwd"));
        let scope = SessionScope::from_headers(&headers);
        assert!(scope.is_fresh());
        assert_ne!(scope.id(), "../../etc/passwd");
    }

    #[test]
    fn test_attach_only_sets_cookie_when_fresh() {
        let fresh = SessionScope::from_headers(&HeaderMap::new());
        let response = fresh.attach("ok".into_response());
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("{COOKIE_NAME}={}", fresh.id())));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));

        let id = Uuid::new_v4().to_string();
        let known = SessionScope::from_headers(&headers_with_cookie(&format!("{COOKIE_NAME}={id}")));
        let response = known.attach("ok".into_response());
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
