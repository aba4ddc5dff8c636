use super::rules::{
    BARE_AMOUNT, BARE_DATE, DATE_RULE, FieldRule, INVOICE_NUMBER_RULE, TOTAL_AMOUNT_RULE,
    VENDOR_EXCLUDED_KEYWORDS, VENDOR_MIN_CHARS,
};
use super::{ExtractedInvoice, NOT_FOUND};
use tracing::debug;

/// Run every field rule over the text. `raw_text` is left empty for the caller.
pub fn extract(text: &str, vendor_scan_lines: usize) -> ExtractedInvoice {
    ExtractedInvoice {
        invoice_number: field_or_sentinel(&INVOICE_NUMBER_RULE, text),
        date: field_or_sentinel(&DATE_RULE, text),
        total_amount: field_or_sentinel(&TOTAL_AMOUNT_RULE, text),
        vendor_name: extract_vendor(text, vendor_scan_lines)
            .unwrap_or(NOT_FOUND)
            .to_string(),
        raw_text: String::new(),
    }
}

fn field_or_sentinel(rule: &FieldRule, text: &str) -> String {
    match rule.first_match(text) {
        Some(value) => {
            debug!(field = ?rule.field, value, "Field matched");
            value.to_string()
        }
        None => {
            debug!(field = ?rule.field, "No pattern matched");
            NOT_FOUND.to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Vendor name
// ---------------------------------------------------------------------------

/// The vendor is usually printed at the top: take the first early line that
/// is not a label, a date or an amount.
fn extract_vendor(text: &str, scan_lines: usize) -> Option<&str> {
    text.lines()
        .take(scan_lines)
        .map(str::trim)
        .find(|line| is_vendor_candidate(line))
}

fn is_vendor_candidate(line: &str) -> bool {
    if line.chars().count() <= VENDOR_MIN_CHARS {
        return false;
    }
    let lower = line.to_lowercase();
    if VENDOR_EXCLUDED_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return false;
    }
    !BARE_DATE.is_match(line) && !BARE_AMOUNT.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_skips_labels_dates_and_amounts() {
        let text = "\n  \nFAKTURA 12\n15.01.2024\n15.000,00 RSD\nABC\nMega Trade DOO\nDrugi red";
        assert_eq!(extract_vendor(text, 10), Some("Mega Trade DOO"));
    }

    #[test]
    fn vendor_scan_respects_line_window() {
        let text = "Datum: 1.1.2024\n2024-01-01\n100 EUR\nxyz\n\nLate Vendor DOO";
        assert_eq!(extract_vendor(text, 5), None);
        assert_eq!(extract_vendor(text, 10), Some("Late Vendor DOO"));
    }

    #[test]
    fn vendor_never_returns_bare_date_or_amount_first() {
        for text in ["01/02/24\nReal Vendor", "$ 1.250,00\nReal Vendor", "2023-12-31\nReal Vendor"] {
            assert_eq!(extract_vendor(text, 5), Some("Real Vendor"), "{text:?}");
        }
    }

    #[test]
    fn vendor_keyword_check_is_case_insensitive() {
        assert!(!is_vendor_candidate("Invoice Systems Ltd"));
        assert!(!is_vendor_candidate("TOTAL Energies"));
        assert!(is_vendor_candidate("Acme Company DOO"));
    }

    #[test]
    fn vendor_trims_surrounding_whitespace() {
        assert_eq!(extract_vendor("   Acme DOO   \n", 5), Some("Acme DOO"));
    }

    #[test]
    fn fields_are_found_regardless_of_whitespace() {
        let text = "  invoice  :   A-17  \n\tdatum 2024-06-30\nUkupno:\t  1.500,00   EUR";
        let invoice = extract(text, 10);
        assert_eq!(invoice.invoice_number, "A-17");
        assert_eq!(invoice.date, "2024-06-30");
        assert_eq!(invoice.total_amount, "1.500,00   EUR");
        assert_eq!(invoice.vendor_name, NOT_FOUND);
    }

    #[test]
    fn glued_date_is_found_and_line_still_scanned_for_vendor() {
        let invoice = extract("Izdato 15.01.2024god\nDatum15.01.2024", 10);
        assert_eq!(invoice.date, "15.01.2024");
        assert_eq!(invoice.vendor_name, "Izdato 15.01.2024god");
    }

    #[test]
    fn missing_fields_fall_back_to_sentinel() {
        let invoice = extract("Acme Company DOO\nBeograd", 10);
        assert_eq!(invoice.invoice_number, NOT_FOUND);
        assert_eq!(invoice.date, NOT_FOUND);
        assert_eq!(invoice.total_amount, NOT_FOUND);
        assert_eq!(invoice.vendor_name, "Acme Company DOO");
    }
}
