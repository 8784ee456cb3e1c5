//! Conversation session management.
//!
//! A [`Session`] pairs the visible transcript with its remote conversation;
//! the [`SessionManager`] hands out one session per user scope.

pub mod manager;
pub mod persona;
pub mod session;

pub use manager::{SessionManager, SessionRef, SessionSettings};
pub use persona::{Persona, SCHEDULING_PERSONA};
pub use session::{Session, SessionId};
