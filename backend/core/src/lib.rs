//! Core types shared by every schedai crate: conversation turns, the
//! append-only transcript, the remote model seam, and the error taxonomy.

pub mod error;
pub mod message;
pub mod traits;

pub use error::ChatError;
pub use message::{Role, Transcript, Turn};
pub use traits::{ChatModel, ConversationHandle};
