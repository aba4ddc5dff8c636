// src/heuristics/mod.rs

mod generic;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::config::ExtractionSection;
use crate::normalize;

/// Placeholder stored in a field when none of its patterns matched.
pub const NOT_FOUND: &str = "Nije pronađen";

/// The four invoice fields we look for, plus a bounded preview of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    pub invoice_number: String,
    pub date: String,
    pub total_amount: String,
    pub vendor_name: String,
    pub raw_text: String,
}

impl Default for ExtractedInvoice {
    fn default() -> Self {
        Self {
            invoice_number: NOT_FOUND.to_string(),
            date: NOT_FOUND.to_string(),
            total_amount: NOT_FOUND.to_string(),
            vendor_name: NOT_FOUND.to_string(),
            raw_text: String::new(),
        }
    }
}

impl ExtractedInvoice {
    /// How many of the four fields were found.
    pub fn coverage(&self) -> (usize, usize) {
        let total = 4;
        let filled = [
            &self.invoice_number,
            &self.date,
            &self.total_amount,
            &self.vendor_name,
        ]
        .iter()
        .filter(|v| v.as_str() != NOT_FOUND)
        .count();
        (filled, total)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractionOptions {
    pub preview_len: usize,
    pub vendor_scan_lines: usize,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        ExtractionSection::default().into()
    }
}

impl From<ExtractionSection> for ExtractionOptions {
    fn from(section: ExtractionSection) -> Self {
        Self {
            preview_len: section.preview_len,
            vendor_scan_lines: section.vendor_scan_lines,
        }
    }
}

/// Extract structured invoice fields from raw OCR text.
pub fn extract_invoice(text: &str, options: &ExtractionOptions) -> ExtractedInvoice {
    let fields = generic::extract(text, options.vendor_scan_lines);
    ExtractedInvoice {
        raw_text: normalize::preview(text, options.preview_len),
        ..fields
    }
}
