mod conversation;
mod transcript;

pub use conversation::{
    pump_stream, ConversationManager, ConversationUpdate, Phase, SessionEvent, SubmitRejected,
    HEALTH_PROBE_TIMEOUT, STREAM_ERROR_NOTICE, TRANSPORT_ERROR_NOTICE,
};
pub use transcript::Transcript;
