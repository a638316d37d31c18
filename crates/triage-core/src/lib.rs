pub mod config;
pub mod error;
pub mod types;

pub use error::{Result, TriageError};
pub use types::{Conversation, Message, Role, TailUpdate};
