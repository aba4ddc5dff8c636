// src/server/handlers.rs

use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info};

use super::AppState;
use super::error::UploadError;
use crate::assemble::{ExtractionOutcome, OutcomeStatus};
use crate::config::GatewayConfig;
use crate::gateway::Upload;
use crate::heuristics::ExtractedInvoice;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Wire tag of an upload response: an outcome, or a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    OcrFailed,
    ErrorFallback,
    Error,
}

impl From<OutcomeStatus> for ResponseStatus {
    fn from(status: OutcomeStatus) -> Self {
        match status {
            OutcomeStatus::Success => ResponseStatus::Success,
            OutcomeStatus::OcrFailed => ResponseStatus::OcrFailed,
            OutcomeStatus::ErrorFallback => ResponseStatus::ErrorFallback,
        }
    }
}

/// JSON envelope returned by `POST /upload-invoice`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ExtractedInvoice>,
}

impl UploadResponse {
    pub fn from_outcome(filename: Option<String>, outcome: ExtractionOutcome) -> Self {
        let status = outcome.status().into();
        let message = match outcome.status() {
            OutcomeStatus::Success => "Faktura uspešno obrađena".to_string(),
            OutcomeStatus::OcrFailed => format!(
                "OCR nije uspeo: {}. Prikazani su test podaci.",
                outcome.message().unwrap_or_default()
            ),
            OutcomeStatus::ErrorFallback => format!(
                "Greška pri obradi: {}. Prikazani su fallback podaci.",
                outcome.message().unwrap_or_default()
            ),
        };
        Self {
            status,
            filename,
            message: Some(message),
            extracted_data: Some(outcome.into_invoice()),
        }
    }

    pub fn error(filename: Option<String>, message: String) -> Self {
        Self {
            status: ResponseStatus::Error,
            filename,
            message: Some(message),
            extracted_data: None,
        }
    }
}

/// Credential presence and a masked preview, for `GET /api-status`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiStatus {
    pub api_key_configured: bool,
    pub api_key_preview: Option<String>,
    pub backend: &'static str,
    pub endpoint: String,
}

impl ApiStatus {
    pub fn new(gateway: &GatewayConfig) -> Self {
        Self {
            api_key_configured: gateway.api_key.is_some(),
            api_key_preview: gateway.api_key.as_deref().map(mask_secret),
            backend: gateway.backend.as_str(),
            endpoint: gateway.endpoint.clone(),
        }
    }
}

/// Never shows more than a four character prefix; short secrets are hidden entirely.
pub fn mask_secret(secret: &str) -> String {
    const PREFIX: usize = 4;
    if secret.chars().count() <= 2 * PREFIX {
        return "****".to_string();
    }
    let prefix: String = secret.chars().take(PREFIX).collect();
    format!("{prefix}...")
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Invoice Reader API is working!" }))
}

pub async fn test() -> Json<Value> {
    Json(json!({ "message": "Test uspešan! API radi." }))
}

pub async fn api_status(State(state): State<Arc<AppState>>) -> Json<ApiStatus> {
    Json(state.api_status.clone())
}

pub async fn upload_invoice(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, UploadError> {
    let multipart = multipart.map_err(|e| UploadError::InvalidForm {
        reason: e.body_text(),
    })?;
    let upload = match read_upload(multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return Err(UploadError::MissingFile),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(UploadError::TooLarge);
        }
        Err(e) => {
            error!(error = %e, "Failed to read uploaded file");
            let outcome = ExtractionOutcome::error_fallback(e.body_text());
            return Ok(Json(UploadResponse::from_outcome(None, outcome)));
        }
    };

    validate_content_type(&upload, state.upload.accept_pdf)?;

    info!(
        filename = upload.filename.as_deref().unwrap_or("-"),
        content_type = %upload.content_type,
        bytes = upload.bytes.len(),
        "Invoice upload received"
    );

    let outcome = state.pipeline.process(&upload).await;
    info!(status = ?outcome.status(), "Invoice upload processed");

    Ok(Json(UploadResponse::from_outcome(upload.filename, outcome)))
}

/// Take the first `file` field of the form.
async fn read_upload(mut multipart: Multipart) -> Result<Option<Upload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?.to_vec();
        return Ok(Some(Upload {
            filename,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

/// Images always pass; PDFs only when `accept_pdf` is set.
pub(crate) fn validate_content_type(upload: &Upload, accept_pdf: bool) -> Result<(), UploadError> {
    let content_type = upload.content_type.to_ascii_lowercase();
    if content_type == PDF_CONTENT_TYPE {
        if accept_pdf {
            return Ok(());
        }
        return Err(UploadError::PdfNotSupported {
            filename: upload.filename.clone(),
        });
    }
    if content_type.starts_with("image/") {
        return Ok(());
    }
    Err(UploadError::UnsupportedContentType {
        filename: upload.filename.clone(),
        content_type: upload.content_type.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::test_data;

    fn upload(content_type: &str) -> Upload {
        Upload {
            filename: Some("f".to_string()),
            content_type: content_type.to_string(),
            bytes: Vec::new(),
        }
    }

    #[test]
    fn content_type_rules() {
        assert!(validate_content_type(&upload("image/png"), false).is_ok());
        assert!(validate_content_type(&upload("IMAGE/JPEG"), false).is_ok());
        assert!(validate_content_type(&upload("application/pdf"), true).is_ok());
        assert!(matches!(
            validate_content_type(&upload("application/pdf"), false),
            Err(UploadError::PdfNotSupported { .. })
        ));
        assert!(matches!(
            validate_content_type(&upload("text/plain"), true),
            Err(UploadError::UnsupportedContentType { .. })
        ));
    }

    #[test]
    fn masking_never_reveals_more_than_prefix() {
        assert_eq!(mask_secret("sk-1234567890abcdef"), "sk-1...");
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("12345678"), "****");
        assert_eq!(mask_secret(""), "****");
    }

    #[test]
    fn envelope_for_ocr_failure_carries_test_data() {
        let outcome = ExtractionOutcome::ocr_failed("API error 500");
        let body = serde_json::to_value(UploadResponse::from_outcome(
            Some("a.png".to_string()),
            outcome,
        ))
        .unwrap();

        assert_eq!(body["status"], "ocr_failed");
        assert_eq!(body["filename"], "a.png");
        assert_eq!(
            body["extracted_data"],
            serde_json::to_value(test_data()).unwrap()
        );
        assert!(body["message"].as_str().unwrap().contains("API error 500"));
    }

    #[test]
    fn response_status_reuses_outcome_tags() {
        for (outcome, tag) in [
            (OutcomeStatus::Success, "success"),
            (OutcomeStatus::OcrFailed, "ocr_failed"),
            (OutcomeStatus::ErrorFallback, "error_fallback"),
        ] {
            let status = ResponseStatus::from(outcome);
            assert_eq!(serde_json::to_value(status).unwrap(), json!(tag));
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::to_value(outcome).unwrap()
            );
        }
        assert_eq!(serde_json::to_value(ResponseStatus::Error).unwrap(), json!("error"));
    }

    #[test]
    fn error_envelope_has_no_extracted_data() {
        let body = serde_json::to_value(UploadResponse::error(None, "x".to_string())).unwrap();
        assert_eq!(body, json!({"status": "error", "message": "x"}));
    }
}
