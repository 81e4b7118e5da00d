//! HTTP transport for the proctoring log endpoint.
//!
//! The async reqwest client sits behind a blocking facade with its own
//! current-thread runtime, so the monitor loop stays a single cooperative
//! thread and every request is bounded by a per-attempt timeout.

use serde::Deserialize;
use std::time::Duration;

use crate::event::ViolationEvent;

/// Body status value the endpoint uses to acknowledge an event.
pub const SUCCESS_SENTINEL: &str = "success";

/// Outcome of a delivery attempt that reached the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// 2xx with a success status body; the event is done
    Acknowledged,
    /// 2xx but the body carried a different status; logged, not retried
    SoftRejected(String),
}

/// Delivery error types. All of these are hard failures that send the
/// event into the retry queue; a timed-out request surfaces as `Network`.
#[derive(Debug)]
pub enum DeliveryError {
    /// Transport construction problem
    Config(String),
    /// Network-level failure or timeout
    Network(String),
    /// Endpoint returned a non-2xx status
    Server { status: u16, message: String },
    /// Response body could not be interpreted
    Serialization(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Config(msg) => write!(f, "Delivery config error: {msg}"),
            DeliveryError::Network(msg) => write!(f, "Delivery network error: {msg}"),
            DeliveryError::Server { status, message } => {
                write!(f, "Log endpoint error ({status}): {message}")
            }
            DeliveryError::Serialization(msg) => {
                write!(f, "Delivery serialization error: {msg}")
            }
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Response body from the logging endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LogResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Abstract delivery seam so the pipeline can be driven in tests.
pub trait LogTransport {
    /// Attempt one delivery, bounded by `timeout`.
    fn deliver(
        &self,
        event: &ViolationEvent,
        timeout: Duration,
    ) -> Result<SendOutcome, DeliveryError>;
}

/// HTTP client for the proctoring log endpoint.
pub struct HttpLogTransport {
    endpoint_url: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpLogTransport {
    pub fn new(endpoint_url: impl Into<String>) -> Result<Self, DeliveryError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DeliveryError::Config(format!("Failed to create runtime: {e}")))?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DeliveryError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint_url: endpoint_url.into(),
            client,
            runtime,
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    async fn post(
        &self,
        event: &ViolationEvent,
        timeout: Duration,
    ) -> Result<SendOutcome, DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(event)
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DeliveryError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body: LogResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Serialization(e.to_string()))?;

        if body.status == SUCCESS_SENTINEL {
            Ok(SendOutcome::Acknowledged)
        } else {
            Ok(SendOutcome::SoftRejected(
                body.message.unwrap_or(body.status),
            ))
        }
    }
}

impl LogTransport for HttpLogTransport {
    fn deliver(
        &self,
        event: &ViolationEvent,
        timeout: Duration,
    ) -> Result<SendOutcome, DeliveryError> {
        self.runtime.block_on(self.post(event, timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_response_parsing() {
        let ok: LogResponse = serde_json::from_str(r#"{"status": "success"}"#).unwrap();
        assert_eq!(ok.status, SUCCESS_SENTINEL);
        assert!(ok.message.is_none());

        let rejected: LogResponse =
            serde_json::from_str(r#"{"status": "error", "message": "unknown session"}"#).unwrap();
        assert_eq!(rejected.status, "error");
        assert_eq!(rejected.message.as_deref(), Some("unknown session"));
    }

    #[test]
    fn test_transport_construction() {
        let transport = HttpLogTransport::new("http://127.0.0.1:9/log").unwrap();
        assert_eq!(transport.endpoint_url(), "http://127.0.0.1:9/log");
    }
}
