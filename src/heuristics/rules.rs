//! Pattern tables for invoice field extraction.
//!
//! Each field owns an ordered list of patterns. The first pattern (by
//! priority) that finds a match anywhere in the text decides the value.

use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    InvoiceNumber,
    Date,
    TotalAmount,
}

#[derive(Debug)]
pub struct Pattern {
    pub priority: u8,
    pub regex: Regex,
    /// Capture group holding the field value.
    pub group: usize,
}

impl Pattern {
    fn new(priority: u8, source: &str, group: usize) -> Self {
        let regex = Regex::new(source).expect("built-in extraction pattern must compile");
        Self {
            priority,
            regex,
            group,
        }
    }

    /// Search the whole text and return the captured value, trimmed.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        let caps = self.regex.captures(text)?;
        let m = caps.get(self.group)?;
        Some(m.as_str().trim()).filter(|s| !s.is_empty())
    }
}

#[derive(Debug)]
pub struct FieldRule {
    pub field: Field,
    /// Sorted by ascending priority.
    pub patterns: Vec<Pattern>,
}

impl FieldRule {
    fn new(field: Field, mut patterns: Vec<Pattern>) -> Self {
        patterns.sort_by_key(|p| p.priority);
        Self { field, patterns }
    }

    pub fn first_match<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.patterns.iter().find_map(|p| p.find(text))
    }
}

// "Faktura br. 42", "Invoice No 7", "Invoice number: X" - skip the number sub-label.
const NUMBER_SUBLABEL: &str = r"(?:(?:broj|number|br|no|nr)[.\s:#]\s*)?";
const INVOICE_TOKEN: &str = r"[:#\-]?\s*([A-Z0-9\-]+)";
const AMOUNT_TOKEN: &str = r"\s*[:\-]?\s*([\d.,]*\d(?:[ \t]*(?:RSD|EUR|USD|€|\$))?)";

pub static INVOICE_NUMBER_RULE: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::new(
        Field::InvoiceNumber,
        vec![
            Pattern::new(0, &format!(r"(?i)\bfaktura\b\s*{NUMBER_SUBLABEL}{INVOICE_TOKEN}"), 1),
            Pattern::new(1, &format!(r"(?i)\binvoice\b\s*{NUMBER_SUBLABEL}{INVOICE_TOKEN}"), 1),
            Pattern::new(2, &format!(r"(?i)\bbroj\b\s*{INVOICE_TOKEN}"), 1),
            Pattern::new(3, &format!(r"(?i)\bbr\.\s*{INVOICE_TOKEN}"), 1),
        ],
    )
});

// Day/month/year is checked before ISO on purpose; reordering changes results
// for texts that carry both forms. Dates only need to be fenced off from other
// digits: OCR often glues them to the neighbouring word.
pub static DATE_RULE: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::new(
        Field::Date,
        vec![
            Pattern::new(0, r"(?:^|\D)(\d{1,2}[./]\d{1,2}[./]\d{2,4})(?:\D|$)", 1),
            Pattern::new(1, r"(?:^|\D)(\d{4}-\d{2}-\d{2})(?:\D|$)", 1),
        ],
    )
});

pub static TOTAL_AMOUNT_RULE: LazyLock<FieldRule> = LazyLock::new(|| {
    let labels = [r"ukupno", r"total", r"za\s+uplatu", r"iznos", r"suma?"];
    FieldRule::new(
        Field::TotalAmount,
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                Pattern::new(i as u8, &format!(r"(?i)\b{label}\b{AMOUNT_TOKEN}"), 1)
            })
            .collect(),
    )
});

/// All pattern-driven field rules, in extraction order.
#[cfg(test)]
pub fn field_rules() -> [&'static FieldRule; 3] {
    [&*INVOICE_NUMBER_RULE, &*DATE_RULE, &*TOTAL_AMOUNT_RULE]
}

/// Lines containing any of these (case-insensitive) are never a vendor name.
pub const VENDOR_EXCLUDED_KEYWORDS: &[&str] =
    &["faktura", "invoice", "datum", "date", "ukupno", "total"];

/// Vendor lines must be longer than this many characters.
pub const VENDOR_MIN_CHARS: usize = 3;

pub static BARE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{1,2}[./]\d{1,2}[./]\d{2,4}\.?|\d{4}-\d{2}-\d{2})$")
        .expect("built-in bare date pattern must compile")
});

pub static BARE_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:RSD|EUR|USD|€|\$)\s*)?\d[\d.,\s]*(?:\s*(?:RSD|EUR|USD|€|\$))?$")
        .expect("built-in bare amount pattern must compile")
});
