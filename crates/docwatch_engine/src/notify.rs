use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docwatch_logging::{watch_debug, watch_info};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("job endpoint answered {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("job dispatch failed: {0}")]
    Transport(String),
}

impl DispatchError {
    pub fn is_transient(&self) -> bool {
        match self {
            DispatchError::Transport(_) => true,
            DispatchError::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

/// Payload handed to the downstream re-indexing job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangePayload<'a> {
    pub url: &'a str,
}

impl ChangePayload<'_> {
    pub fn to_json(&self) -> Result<String, DispatchError> {
        serde_json::to_string(self).map_err(|err| DispatchError::Transport(err.to_string()))
    }
}

/// Triggers the downstream job for a page whose content changed.
///
/// Delivery is at-least-once; the job is expected to be idempotent per URL.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify(&self, url: &str) -> Result<(), DispatchError>;
}

#[async_trait]
impl<T: ChangeNotifier + ?Sized> ChangeNotifier for Arc<T> {
    async fn notify(&self, url: &str) -> Result<(), DispatchError> {
        (**self).notify(url).await
    }
}

/// Posts `{"url": ...}` to an HTTP job endpoint and expects `202 Accepted`.
#[derive(Debug, Clone)]
pub struct HttpJobNotifier {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpJobNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DispatchError::Transport(err.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChangeNotifier for HttpJobNotifier {
    async fn notify(&self, url: &str) -> Result<(), DispatchError> {
        let payload = ChangePayload { url }.to_json()?;
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        watch_debug!("Job endpoint accepted {}", url);
        Ok(())
    }
}

/// Logs the change instead of dispatching it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunNotifier;

#[async_trait]
impl ChangeNotifier for DryRunNotifier {
    async fn notify(&self, url: &str) -> Result<(), DispatchError> {
        watch_info!("[dry run] would dispatch re-index job for {}", url);
        Ok(())
    }
}
