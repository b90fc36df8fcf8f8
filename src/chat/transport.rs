//! HTTP seam for the chat endpoint

use super::error::ChatError;
use crate::config::{endpoints, AppConfig};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::Serialize;

/// Raw response body, chunk by chunk
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ChatError>>;

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub username: String,
    pub query: String,
    pub uuid: String,
}

/// Status plus the not-yet-read body
pub struct StreamResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl StreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Opens one streaming chat request
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the request and return as soon as the status line is known
    async fn open(&self, request: &ChatRequest, token: &str) -> Result<StreamResponse, ChatError>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_url(config.api.url(endpoints::CHAT))
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &ChatRequest, token: &str) -> Result<StreamResponse, ChatError> {
        tracing::debug!("POST {} for {}", self.url, request.username);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ChatError::from))
            .boxed();

        Ok(StreamResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn test_chat_url_follows_environment() {
        let mut config = AppConfig::default();
        config.set_environment(Environment::DockerDeploy);
        assert_eq!(
            HttpTransport::new(&config).url(),
            "http://localhost:8088/api/chat"
        );
    }

    #[test]
    fn test_status_classes() {
        let response = StreamResponse {
            status: 204,
            body: futures::stream::empty().boxed(),
        };
        assert!(response.is_success());
        assert_eq!(format!("{:?}", response), "StreamResponse { status: 204, .. }");

        let response = StreamResponse {
            status: 401,
            body: futures::stream::empty().boxed(),
        };
        assert!(!response.is_success());
    }
}
