// src/assemble.rs

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::gateway::GatewayError;
use crate::heuristics::{self, ExtractedInvoice, ExtractionOptions};
use crate::normalize;

/// Message attached when the service answered but no text came back.
pub const EMPTY_TEXT_MESSAGE: &str = "OCR nije vratio tekst";

/// Final state of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Fields were extracted from real OCR text.
    Success(ExtractedInvoice),
    /// The OCR service was unavailable or returned nothing; carries [`test_data`].
    OcrFailed {
        invoice: ExtractedInvoice,
        message: String,
    },
    /// Something unexpected broke; carries [`fallback_data`].
    ErrorFallback {
        invoice: ExtractedInvoice,
        message: String,
    },
}

impl ExtractionOutcome {
    pub fn ocr_failed(message: impl Into<String>) -> Self {
        Self::OcrFailed {
            invoice: test_data(),
            message: message.into(),
        }
    }

    pub fn error_fallback(message: impl Into<String>) -> Self {
        Self::ErrorFallback {
            invoice: fallback_data(),
            message: message.into(),
        }
    }

    /// Wire tag of the outcome.
    pub fn status(&self) -> OutcomeStatus {
        match self {
            Self::Success(_) => OutcomeStatus::Success,
            Self::OcrFailed { .. } => OutcomeStatus::OcrFailed,
            Self::ErrorFallback { .. } => OutcomeStatus::ErrorFallback,
        }
    }

    pub fn invoice(&self) -> &ExtractedInvoice {
        match self {
            Self::Success(invoice)
            | Self::OcrFailed { invoice, .. }
            | Self::ErrorFallback { invoice, .. } => invoice,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::OcrFailed { message, .. } | Self::ErrorFallback { message, .. } => {
                Some(message)
            }
        }
    }

    pub fn into_invoice(self) -> ExtractedInvoice {
        match self {
            Self::Success(invoice)
            | Self::OcrFailed { invoice, .. }
            | Self::ErrorFallback { invoice, .. } => invoice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    OcrFailed,
    ErrorFallback,
}

/// Placeholder returned when OCR is unavailable.
pub fn test_data() -> ExtractedInvoice {
    ExtractedInvoice {
        invoice_number: "TEST-001".to_string(),
        date: "2024-01-15".to_string(),
        total_amount: "15.000,00 RSD".to_string(),
        vendor_name: "Test Company DOO".to_string(),
        raw_text: "Test podaci - OCR nije dostupan".to_string(),
    }
}

/// Placeholder returned after an unexpected failure.
pub fn fallback_data() -> ExtractedInvoice {
    ExtractedInvoice {
        invoice_number: "FALLBACK-001".to_string(),
        date: "2024-01-01".to_string(),
        total_amount: "0,00 RSD".to_string(),
        vendor_name: "Fallback Company DOO".to_string(),
        raw_text: "Fallback podaci - greška pri obradi".to_string(),
    }
}

/// Decide the outcome for a gateway result, extracting fields when text is available.
pub fn assemble(
    result: Result<Value, GatewayError>,
    options: &ExtractionOptions,
) -> ExtractionOutcome {
    let payload = match result {
        Ok(payload) => payload,
        Err(e) if e.is_unexpected() => {
            error!(error = %e, "Unexpected OCR failure, using fallback data");
            return ExtractionOutcome::error_fallback(e.to_string());
        }
        Err(e) => {
            warn!(error = %e, "OCR unavailable, using test data");
            return ExtractionOutcome::ocr_failed(e.to_string());
        }
    };

    let text = normalize::text_from_payload(&payload);
    if text.trim().is_empty() {
        warn!("OCR returned empty text, using test data");
        return ExtractionOutcome::ocr_failed(EMPTY_TEXT_MESSAGE);
    }

    let invoice = heuristics::extract_invoice(&text, options);
    let (filled, total) = invoice.coverage();
    info!(
        filled,
        total,
        invoice_number = %invoice.invoice_number,
        vendor = %invoice.vendor_name,
        total_amount = %invoice.total_amount,
        "Extraction result"
    );
    ExtractionOutcome::Success(invoice)
}
