mod api;
mod message;

pub use api::ChatRequest;
pub use message::{ChatMessage, MessageId, MessageStatus, Role};
