use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique message identifier. Ids are handed out from a monotonic
/// counter, so two messages created in the same tick never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    pub fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Placeholder created, no fragment received yet.
    Pending,
    Streaming,
    Complete,
    /// Finalized after a transport or stream failure.
    Failed,
}

impl MessageStatus {
    pub fn is_final(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: MessageId,
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
    status: MessageStatus,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
            status: MessageStatus::Complete,
        }
    }

    /// Empty assistant entry that streamed fragments are appended into.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: MessageId::next(),
            role: Role::Assistant,
            content: String::new(),
            created_at: Utc::now(),
            status: MessageStatus::Pending,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    // Mutators below are only reachable through the transcript, which refuses
    // to call them for user messages.

    pub(crate) fn push_content(&mut self, text: &str) {
        self.content.push_str(text);
    }

    pub(crate) fn set_content(&mut self, text: &str) {
        self.content.clear();
        self.content.push_str(text);
    }

    pub(crate) fn set_status(&mut self, status: MessageStatus) {
        self.status = status;
    }
}
