use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::config::ConfigError;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Failed to contact provider: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Provider did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to read provider response: {0}")]
    Body(#[source] reqwest::Error),
}

/// Delivers one JSON payload to the provider and returns the raw reply body.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn post_json(&self, payload: &Value) -> Result<String, TransportError>;
}

/// reqwest transport posting JSON to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("napthe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            http_client,
            url,
            timeout,
        })
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn post_json(&self, payload: &Value) -> Result<String, TransportError> {
        let response = self
            .http_client
            .post(self.url.clone())
            .header("Accept", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Body(e)
            }
        })
    }
}
