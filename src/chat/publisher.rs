use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;

use super::message::WebhookMessage;

/// Error bodies longer than this are cut off before logging.
const MAX_ERROR_BODY: usize = 1024 * 1024; // 1MB
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Webhook request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Webhook request timed out after {}s", PUBLISH_TIMEOUT.as_secs())]
    Timeout,
    #[error("Webhook rejected message: status {0}")]
    HttpStatus(u16),
}

/// Best-effort delivery of a formatted message. Callers never retry.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: &WebhookMessage) -> Result<(), PublishError>;
}

/// Posts messages as JSON to an incoming webhook.
pub struct WebhookPublisher {
    client: reqwest::Client,
    url: SecretString,
}

impl WebhookPublisher {
    pub fn new(client: reqwest::Client, url: SecretString) -> Self {
        Self { client, url }
    }
}

impl std::fmt::Debug for WebhookPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookPublisher")
            .field("url", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Publisher for WebhookPublisher {
    async fn publish(&self, message: &WebhookMessage) -> Result<(), PublishError> {
        let body = serde_json::to_vec(message)?;

        let request = self
            .client
            .post(self.url.expose_secret())
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/json;charset=utf-8",
            )
            .body(body)
            .send();
        let response = tokio::time::timeout(PUBLISH_TIMEOUT, request)
            .await
            .map_err(|_| PublishError::Timeout)??;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        match read_error_body(response).await {
            Ok(body) => tracing::warn!(
                status = %status,
                response = %body,
                "Webhook rejected message"
            ),
            Err(e) => tracing::error!(
                status = %status,
                error = %e,
                "Failed reading webhook error response"
            ),
        }
        Err(PublishError::HttpStatus(status.as_u16()))
    }
}

async fn read_error_body(response: reqwest::Response) -> Result<String, reqwest::Error> {
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let room = MAX_ERROR_BODY.saturating_sub(bytes.len());
        bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if bytes.len() >= MAX_ERROR_BODY {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
