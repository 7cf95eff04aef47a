use crate::types::{ChatMessage, MessageId, MessageStatus};

/// Ordered conversation log. Insertion order is display order; entries are
/// never reordered or deduplicated.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|message| message.id() == id)
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Appends a streamed fragment to an assistant entry and marks it streaming.
    pub(crate) fn append_fragment(&mut self, id: MessageId, fragment: &str) -> bool {
        let Some(message) = self.assistant_mut(id) else {
            return false;
        };
        message.push_content(fragment);
        message.set_status(MessageStatus::Streaming);
        true
    }

    pub(crate) fn replace_content(&mut self, id: MessageId, content: &str) -> bool {
        let Some(message) = self.assistant_mut(id) else {
            return false;
        };
        message.set_content(content);
        true
    }

    /// Appends `notice` after any partial output, separated by a blank line.
    pub(crate) fn append_notice(&mut self, id: MessageId, notice: &str) -> bool {
        let Some(message) = self.assistant_mut(id) else {
            return false;
        };
        if !message.content().is_empty() {
            message.push_content("\n\n");
        }
        message.push_content(notice);
        true
    }

    pub(crate) fn finalize(&mut self, id: MessageId, status: MessageStatus) -> bool {
        let Some(message) = self.assistant_mut(id) else {
            return false;
        };
        message.set_status(status);
        true
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }

    fn assistant_mut(&mut self, id: MessageId) -> Option<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .rev()
            .find(|message| message.id() == id && message.is_assistant())
    }
}
