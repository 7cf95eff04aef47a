use thiserror::Error;

/// Failures raised by the chat core.
///
/// Every variant is converted into a phase transition or a transcript entry by
/// the conversation state machine; none of them reach the frontend unhandled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Settings are unusable for a send, e.g. no API key.
    #[error("configuration error: {0}")]
    Config(String),
    /// The chat request failed before a response stream was available.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response stream failed after it had started.
    #[error("stream read error: {0}")]
    StreamRead(String),
    #[error("health check failed: {0}")]
    HealthCheck(String),
    #[error("settings storage error: {0}")]
    Storage(String),
}

impl ChatError {
    /// Reclassifies an error surfaced while pulling chunks from an open stream.
    pub fn into_stream_read(self) -> Self {
        match self {
            Self::StreamRead(_) => self,
            other => Self::StreamRead(other.to_string()),
        }
    }

    pub fn is_stream_read(&self) -> bool {
        matches!(self, Self::StreamRead(_))
    }
}

impl From<std::io::Error> for ChatError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_stream_read_wraps_transport_errors() {
        let error = ChatError::Transport("connection reset".to_string()).into_stream_read();
        assert!(error.is_stream_read());
        assert_eq!(
            error,
            ChatError::StreamRead("transport error: connection reset".to_string())
        );
    }

    #[test]
    fn test_into_stream_read_keeps_stream_errors() {
        let error = ChatError::StreamRead("eof".to_string()).into_stream_read();
        assert_eq!(error, ChatError::StreamRead("eof".to_string()));
    }
}
