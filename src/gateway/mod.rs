// src/gateway/mod.rs

mod http;
#[cfg(test)]
pub mod stub;

pub use http::HttpGateway;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A file received from a client, held only for the duration of one request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("API ključ nije podešen")]
    MissingCredential,
    #[error("API error {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("{0}")]
    Reported(String),
    #[error("OCR request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected OCR response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Failures that are not explained by the remote service being unavailable.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, GatewayError::Decode(_))
    }
}

/// Turns an uploaded document into the raw payload of a remote OCR service.
#[async_trait]
pub trait OcrGateway: Send + Sync {
    async fn recognize(&self, upload: &Upload) -> Result<Value, GatewayError>;

    /// Short name of the payload shape, for diagnostics.
    fn backend(&self) -> &str;
}

/// A payload carrying a top-level `"error"` is a failure reported by the service.
pub fn reject_reported_error(payload: Value) -> Result<Value, GatewayError> {
    match payload.get("error") {
        None | Some(Value::Null) => Ok(payload),
        Some(Value::String(msg)) => Err(GatewayError::Reported(msg.clone())),
        Some(Value::Object(obj)) => Err(GatewayError::Reported(
            obj.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
        )),
        Some(other) => Err(GatewayError::Reported(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_key_is_rejected() {
        let err = reject_reported_error(json!({"error": "API error 500"})).unwrap_err();
        assert_eq!(err.to_string(), "API error 500");
        assert!(!err.is_unexpected());

        let err = reject_reported_error(json!({"error": {"message": "quota", "code": 429}}))
            .unwrap_err();
        assert_eq!(err.to_string(), "quota");
    }

    #[test]
    fn payload_without_error_passes_through() {
        let payload = json!({"text": "ok", "error": null});
        assert_eq!(reject_reported_error(payload.clone()).unwrap(), payload);
    }

    #[test]
    fn only_decode_errors_are_unexpected() {
        assert!(GatewayError::Decode("x".into()).is_unexpected());
        assert!(!GatewayError::MissingCredential.is_unexpected());
        assert!(
            !GatewayError::Upstream {
                status: 502,
                body: String::new()
            }
            .is_unexpected()
        );
    }
}
