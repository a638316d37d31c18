use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use triage_core::config::EndpointConfig;
use triage_core::Message;

/// Response body as a stream of raw chunks.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("stream read failed: {0}")]
    Read(String),
}

/// What the endpoint answered: a status code and, when readable, the body.
pub struct TransportResponse {
    pub status: u16,
    pub body: Option<ByteStream>,
}

impl TransportResponse {
    pub fn new(status: u16, body: Option<ByteStream>) -> Self {
        Self { status, body }
    }
}

/// Outbound leg of a chat exchange.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport name for logging.
    fn name(&self) -> &str;

    /// POST the full message history and return the raw response.
    /// Non-2xx statuses are returned, not raised; only failures to reach the
    /// endpoint at all are errors.
    async fn send(&self, messages: &[Message]) -> Result<TransportResponse, TransportError>;
}

/// Request body: `{ "messages": [{ "role": "user", "content": "..." }] }`
#[derive(Serialize)]
struct ChatBody<'a> {
    messages: &'a [Message],
}

/// reqwest-backed transport for the health-chat endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
        }
    }

    pub fn from_config(config: &EndpointConfig) -> Self {
        Self::new(config.url.clone(), config.api_key.clone())
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, messages: &[Message]) -> Result<TransportResponse, TransportError> {
        debug!(url = %self.url, messages = messages.len(), "sending chat request");

        let mut req = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .json(&ChatBody { messages });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "health-chat endpoint error");
            return Ok(TransportResponse::new(status, None));
        }

        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(TransportError::from))
            .boxed();
        Ok(TransportResponse::new(status, Some(body)))
    }
}
