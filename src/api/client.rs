use super::logging::emit_debug_payload;
use crate::config::Config;
use crate::error::ChatError;
use crate::types::ChatRequest;
use crate::util::is_local_endpoint_url;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

pub const CHAT_PATH: &str = "/api/chat";
pub const HEALTH_PATH: &str = "/api/health";
/// Upper bound on one `GET /api/health` round trip.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// The network boundary of the chat core.
///
/// Implementations never touch the transcript or the settings; they only move
/// bytes.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends `request` and returns the reply body as a forward-only byte
    /// stream. Fails with [`ChatError::Transport`] on a non-2xx status or a
    /// network failure, in which case no stream is produced.
    async fn send_chat(&self, request: &ChatRequest) -> Result<ByteStream, ChatError>;

    /// Liveness probe. Resolves to `false` on any failure and never errors.
    async fn check_health(&self) -> bool;
}

#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    debug_payload: bool,
    health_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        let mut transport = Self::with_base_url(&config.api_url)?;
        transport.debug_payload = config.debug_payload;
        Ok(transport)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("streamchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ChatError::Transport(format!("cannot build HTTP client: {error}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            debug_payload: false,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        })
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Runs `GET /api/health` once. Fails with [`ChatError::HealthCheck`] on a
    /// non-2xx status, a network failure, or no reply within the health timeout.
    pub async fn probe_health(&self) -> Result<(), ChatError> {
        let health_url = self.endpoint(HEALTH_PATH);
        let response = self
            .http
            .get(&health_url)
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|error| {
                let reason = if error.is_timeout() {
                    format!("no reply from '{health_url}' within {:?}", self.health_timeout)
                } else {
                    format!("cannot reach '{health_url}': {error}")
                };
                ChatError::HealthCheck(reason)
            })?;

        let status = response.status();
        debug!(url = %health_url, %status, "health probe finished");
        if status.is_success() {
            Ok(())
        } else {
            Err(ChatError::HealthCheck(format!(
                "'{health_url}' returned HTTP {status}"
            )))
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let request_url = self.endpoint(CHAT_PATH);
        if self.debug_payload {
            emit_debug_payload(&request_url, request);
        }
        debug!(url = %request_url, model = %request.model, "opening chat stream");

        let response = self
            .http
            .post(&request_url)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &request_url))?;

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_stream_read_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }

    async fn check_health(&self) -> bool {
        match self.probe_health().await {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "backend reported unhealthy");
                false
            }
        }
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> ChatError {
    let message = if error.is_connect() && is_local_endpoint_url(request_url) {
        format!(
            "cannot reach local chat backend '{request_url}': {error}. Start the backend or update STREAMCHAT_API_URL."
        )
    } else if error.is_connect() {
        format!("cannot reach chat backend '{request_url}': {error}")
    } else if error.is_timeout() {
        format!("chat request to '{request_url}' timed out: {error}")
    } else if let Some(status) = error.status() {
        format!("chat backend '{request_url}' returned HTTP {status}")
    } else {
        format!("chat request to '{request_url}' failed: {error}")
    };
    ChatError::Transport(message)
}

fn map_stream_read_error(error: reqwest::Error, request_url: &str) -> ChatError {
    ChatError::StreamRead(format!(
        "response stream from '{request_url}' broke off: {error}"
    ))
}
