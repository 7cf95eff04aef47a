use crate::api::{ChatTransport, StreamDecoder};
use crate::error::ChatError;
use crate::types::ChatRequest;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Progress report from a running stream session, tagged with its session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Fragment { session_id: u64, text: String },
    Completed { session_id: u64 },
    Failed { session_id: u64, error: ChatError },
}

impl SessionEvent {
    pub fn session_id(&self) -> u64 {
        match self {
            Self::Fragment { session_id, .. }
            | Self::Completed { session_id }
            | Self::Failed { session_id, .. } => *session_id,
        }
    }
}

/// Drains `stream`, decoding each chunk and handing every non-empty fragment
/// to `on_fragment` in arrival order.
///
/// On a read error the fragments decoded so far have already been delivered;
/// the error is returned as [`ChatError::StreamRead`].
pub async fn pump_stream<S, F>(mut stream: S, mut on_fragment: F) -> Result<(), ChatError>
where
    S: Stream<Item = Result<Bytes, ChatError>> + Unpin,
    F: FnMut(String),
{
    let mut decoder = StreamDecoder::new();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                let tail = decoder.finish();
                if !tail.is_empty() {
                    on_fragment(tail);
                }
                return Err(error.into_stream_read());
            }
        };

        let fragment = decoder.decode(&chunk);
        if !fragment.is_empty() {
            on_fragment(fragment);
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        on_fragment(tail);
    }
    Ok(())
}

/// Body of the task spawned per submit: opens the stream, pumps it, and
/// reports the outcome. Cancellation drops the stream without reporting.
pub(super) async fn run_session(
    transport: Arc<dyn ChatTransport>,
    request: ChatRequest,
    session_id: u64,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(session_id, "stream session cancelled");
            return;
        }
        outcome = open_and_pump(transport.as_ref(), &request, session_id, &events_tx) => outcome,
    };

    let event = match outcome {
        Ok(()) => SessionEvent::Completed { session_id },
        Err(error) => SessionEvent::Failed { session_id, error },
    };
    let _ = events_tx.send(event);
}

async fn open_and_pump(
    transport: &dyn ChatTransport,
    request: &ChatRequest,
    session_id: u64,
    events_tx: &mpsc::UnboundedSender<SessionEvent>,
) -> Result<(), ChatError> {
    let stream = transport.send_chat(request).await?;
    debug!(session_id, "response stream opened");
    pump_stream(stream, |text| {
        let _ = events_tx.send(SessionEvent::Fragment { session_id, text });
    })
    .await
}

/// Liveness probe bounded by `limit`; no answer in time counts as unhealthy.
pub(super) async fn check_health_within(transport: &dyn ChatTransport, limit: Duration) -> bool {
    match tokio::time::timeout(limit, transport.check_health()).await {
        Ok(healthy) => healthy,
        Err(_) => {
            warn!(?limit, "health probe timed out");
            false
        }
    }
}

/// Body of the task spawned per health check; reports one result.
pub(super) async fn run_health_probe(
    transport: Arc<dyn ChatTransport>,
    limit: Duration,
    health_tx: mpsc::UnboundedSender<bool>,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        healthy = check_health_within(transport.as_ref(), limit) => {
            let _ = health_tx.send(healthy);
        }
    }
}
