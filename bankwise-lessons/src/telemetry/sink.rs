//! Telemetry delivery.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::payload::TelemetryPayload;
use crate::config::TelemetryConfig;
use crate::error::TelemetryError;

/// Receiver of telemetry snapshots.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Deliver one snapshot. Failures are not retried by the caller.
    async fn send(&self, payload: &TelemetryPayload) -> Result<(), TelemetryError>;
}

/// Sink that POSTs snapshots as JSON.
#[derive(Debug, Clone)]
pub struct HttpTelemetrySink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTelemetrySink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Build from configuration; requires `endpoint` to be set.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| TelemetryError::NotConfigured("telemetry.endpoint is not set".into()))?;
        Self::new(endpoint, config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetrySink {
    async fn send(&self, payload: &TelemetryPayload) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TelemetryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(endpoint = %self.endpoint, "Telemetry snapshot delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_endpoint() {
        let config = TelemetryConfig::default();
        let result = HttpTelemetrySink::from_config(&config);
        assert!(matches!(result, Err(TelemetryError::NotConfigured(_))));
    }

    #[test]
    fn from_config_uses_endpoint() {
        let config = TelemetryConfig {
            endpoint: Some("http://localhost:9000/sessions".to_string()),
            ..TelemetryConfig::default()
        };
        let sink = HttpTelemetrySink::from_config(&config).unwrap();
        assert_eq!(sink.endpoint(), "http://localhost:9000/sessions");
    }
}
