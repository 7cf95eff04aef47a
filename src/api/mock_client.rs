use crate::api::client::{ByteStream, ChatTransport};
use crate::error::ChatError;
use crate::types::ChatRequest;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// One scripted piece of a mocked response body.
#[derive(Debug, Clone)]
pub enum MockChunk {
    Data(Bytes),
    /// Fails the stream at this point.
    ReadError(String),
    /// The stream stops producing chunks without ever closing.
    Stall,
}

/// Scripted outcome of one `send_chat` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    Stream(Vec<MockChunk>),
    Status(u16),
    NetworkFailure,
}

impl MockReply {
    pub fn text_chunks<S: AsRef<str>>(chunks: &[S]) -> Self {
        Self::Stream(
            chunks
                .iter()
                .map(|chunk| MockChunk::Data(Bytes::copy_from_slice(chunk.as_ref().as_bytes())))
                .collect(),
        )
    }

    pub fn byte_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self::Stream(
            chunks
                .into_iter()
                .map(|chunk| MockChunk::Data(Bytes::from(chunk)))
                .collect(),
        )
    }
}

/// In-process [`ChatTransport`] that replays scripted replies in order and
/// records every request it receives.
#[derive(Clone)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    healthy: Arc<AtomicBool>,
    health_stalls: Arc<AtomicBool>,
    health_checks: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            healthy: Arc::new(AtomicBool::new(true)),
            health_stalls: Arc::new(AtomicBool::new(false)),
            health_checks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Makes every later health check hang without answering.
    pub fn stall_health(&self, stall: bool) {
        self.health_stalls.store(stall, Ordering::SeqCst);
    }

    pub fn push_reply(&self, reply: MockReply) {
        lock(&self.replies).push_back(reply);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    pub fn send_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn health_checks(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        lock(&self.requests).push(request.clone());
        let reply = lock(&self.replies).pop_front().ok_or_else(|| {
            ChatError::Transport("MockTransport: no more replies configured".to_string())
        })?;

        match reply {
            MockReply::Status(status) => Err(ChatError::Transport(format!(
                "mock backend returned HTTP {status}"
            ))),
            MockReply::NetworkFailure => Err(ChatError::Transport(
                "mock backend connection reset".to_string(),
            )),
            MockReply::Stream(chunks) => Ok(scripted_stream(chunks)),
        }
    }

    async fn check_health(&self) -> bool {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        if self.health_stalls.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        self.healthy.load(Ordering::SeqCst)
    }
}

fn scripted_stream(chunks: Vec<MockChunk>) -> ByteStream {
    let stall_at = chunks
        .iter()
        .position(|chunk| matches!(chunk, MockChunk::Stall));
    let stalls = stall_at.is_some();
    let items: Vec<Result<Bytes, ChatError>> = chunks
        .into_iter()
        .take(stall_at.unwrap_or(usize::MAX))
        .filter_map(|chunk| match chunk {
            MockChunk::Data(bytes) => Some(Ok(bytes)),
            MockChunk::ReadError(message) => Some(Err(ChatError::StreamRead(message))),
            MockChunk::Stall => None,
        })
        .collect();

    let scripted = stream::iter(items);
    if stalls {
        Box::pin(scripted.chain(stream::pending()))
    } else {
        Box::pin(scripted)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
