// src/normalize.rs

use serde_json::Value;

/// Appended to a preview that was cut short.
pub const ELLIPSIS: &str = "...";

/// Pull plain text out of whatever shape the OCR service answered with.
///
/// Recognised shapes, in order: a bare string, `{"text": ..}`,
/// `{"results": [{"text": ..}, ..]}` (joined with spaces) and
/// `{"data": {"text": ..}}`. Anything else is serialized as-is.
pub fn text_from_payload(payload: &Value) -> String {
    match payload {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(obj) => {
            if let Some(text) = obj.get("text").and_then(Value::as_str) {
                return text.to_string();
            }
            if let Some(results) = obj.get("results").and_then(Value::as_array) {
                return results
                    .iter()
                    .filter_map(|r| r.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(" ");
            }
            if let Some(text) = obj
                .get("data")
                .and_then(|d| d.get("text"))
                .and_then(Value::as_str)
            {
                return text.to_string();
            }
            payload.to_string()
        }
        other => other.to_string(),
    }
}

/// Bound `text` to `max_len` characters, marking the cut with [`ELLIPSIS`].
pub fn preview(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
    }
}
