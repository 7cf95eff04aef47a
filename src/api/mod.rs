pub mod client;
pub mod logging;
pub mod mock_client;
pub mod stream;

pub use client::{
    ByteStream, ChatTransport, HttpTransport, CHAT_PATH, DEFAULT_HEALTH_TIMEOUT, HEALTH_PATH,
};
pub use mock_client::{MockChunk, MockReply, MockTransport};
pub use stream::StreamDecoder;
