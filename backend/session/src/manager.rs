//! Per-user session registry.
//!
//! Sessions are created lazily on first use and dropped once their browser
//! scope has gone quiet for the idle timeout (or capacity forces eviction).
//! A session evicted while an exchange holds its lock is parked instead, and
//! the next request for that scope gets it back rather than a new one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use moka::notification::RemovalCause;
use moka::sync::Cache;
use schedai_core::ChatModel;
use schedai_logging::{ChatEvent, ChatEventLogger};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::persona::Persona;
use crate::session::{Session, SessionId};

/// A session behind its exchange lock. Holding the lock for the whole
/// `submit_message` call keeps one exchange in flight per session.
pub type SessionRef = Arc<Mutex<Session>>;

/// Lifetime limits for the registry.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
    pub max_sessions: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(3600),
            max_sessions: 10_000,
        }
    }
}

/// Sessions evicted mid-exchange, held weakly until the exchange ends.
type Parked = Arc<StdMutex<HashMap<SessionId, Weak<Mutex<Session>>>>>;

fn lock(parked: &Parked) -> MutexGuard<'_, HashMap<SessionId, Weak<Mutex<Session>>>> {
    parked.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct SessionManager {
    model: Arc<dyn ChatModel>,
    persona: Persona,
    sessions: Cache<SessionId, SessionRef>,
    parked: Parked,
}

impl SessionManager {
    pub fn new(model: Arc<dyn ChatModel>, persona: Persona, settings: SessionSettings) -> Self {
        let parked: Parked = Arc::default();
        let on_evict = Arc::clone(&parked);
        let sessions = Cache::builder()
            .time_to_idle(settings.idle_timeout)
            .max_capacity(settings.max_sessions)
            .eviction_listener(move |id: Arc<SessionId>, session: SessionRef, cause: RemovalCause| {
                if cause.was_evicted() && session.try_lock().is_err() {
                    debug!(session_id = %id, ?cause, "Evicted session is mid-exchange; parking it");
                    let mut parked = lock(&on_evict);
                    parked.retain(|_, held| held.strong_count() > 0);
                    parked.insert(id.as_ref().clone(), Arc::downgrade(&session));
                }
            })
            .build();

        Self {
            model,
            persona,
            sessions,
            parked,
        }
    }

    /// Return the live session for `id`, creating it (and its one remote
    /// conversation) on first use. Concurrent callers for the same id share
    /// a single initialisation.
    pub fn get_or_create_session(&self, id: &str) -> SessionRef {
        if let Some(session) = self.sessions.get(id) {
            return session;
        }
        // Deliver pending evictions first so a busy session is parked before
        // we decide to start a new one.
        self.sessions.run_pending_tasks();

        self.sessions.get_with(id.to_string(), || {
            if let Some(session) = self.unpark(id) {
                debug!(session_id = %id, "Reattached parked session");
                return session;
            }
            let handle = self.model.start_chat(self.persona.instruction());
            info!(session_id = %id, provider = %self.model.name(), model = %self.model.model(), "Session started");
            ChatEventLogger::log_event(
                id,
                ChatEvent::SessionStarted {
                    model: self.model.model().to_string(),
                },
            );
            Arc::new(Mutex::new(Session::new(id, handle)))
        })
    }

    /// The live session for `id`, without creating one.
    pub fn get(&self, id: &str) -> Option<SessionRef> {
        self.sessions
            .get(id)
            .or_else(|| lock(&self.parked).get(id).and_then(Weak::upgrade))
    }

    fn unpark(&self, id: &str) -> Option<SessionRef> {
        lock(&self.parked).remove(id).and_then(|held| held.upgrade())
    }

    pub fn session_count(&self) -> u64 {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count()
    }

    pub fn model(&self) -> &dyn ChatModel {
        self.model.as_ref()
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }
}
