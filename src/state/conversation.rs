mod core;
mod state;
mod streaming;

#[cfg(test)]
mod tests;

pub use state::{
    ConversationManager, ConversationUpdate, Phase, SubmitRejected, HEALTH_PROBE_TIMEOUT,
    STREAM_ERROR_NOTICE, TRANSPORT_ERROR_NOTICE,
};
pub use streaming::{pump_stream, SessionEvent};
