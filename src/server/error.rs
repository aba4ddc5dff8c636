// src/server/error.rs

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

use super::handlers::UploadResponse;

/// Uploads rejected before the OCR service is contacted.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Fajl mora biti slika (JPEG, PNG) ili PDF")]
    UnsupportedContentType {
        filename: Option<String>,
        content_type: String,
    },
    #[error("PDF format trenutno nije podržan, pošaljite sliku (JPEG, PNG)")]
    PdfNotSupported { filename: Option<String> },
    #[error("Fajl nije poslat (očekuje se polje 'file')")]
    MissingFile,
    #[error("Zahtev mora biti multipart/form-data: {reason}")]
    InvalidForm { reason: String },
    #[error("Fajl je prevelik")]
    TooLarge,
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::UnsupportedContentType { .. }
            | UploadError::MissingFile
            | UploadError::InvalidForm { .. } => StatusCode::BAD_REQUEST,
            UploadError::PdfNotSupported { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn filename(&self) -> Option<String> {
        match self {
            UploadError::UnsupportedContentType { filename, .. }
            | UploadError::PdfNotSupported { filename } => filename.clone(),
            UploadError::MissingFile | UploadError::InvalidForm { .. } | UploadError::TooLarge => {
                None
            }
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(status = status.as_u16(), error = %self, "Upload rejected");
        let body = UploadResponse::error(self.filename(), self.to_string());
        (status, Json(body)).into_response()
    }
}
