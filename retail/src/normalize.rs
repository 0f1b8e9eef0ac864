//! Price text normalization.
//!
//! Every extractor funnels raw price text through [`normalize`]. The result
//! is a whole-rupee amount; fractional parts are truncated, never rounded.

use crate::errors::NormalizeError;

/// Parses price text such as `"₹72,900"`, `"1,234.56"` or `"1.234,56"`.
///
/// Only digits, `.` and `,` are considered. When both separators appear, the
/// one seen first is the thousands separator and the other is the decimal
/// point. A lone `,` is always a thousands separator.
pub fn normalize(text: &str) -> Result<i64, NormalizeError> {
    let not_numeric = || NormalizeError::NotNumeric(text.to_string());

    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if cleaned.is_empty() {
        return Err(not_numeric());
    }

    let canonical = match (cleaned.find('.'), cleaned.find(',')) {
        (Some(dot), Some(comma)) if comma < dot => cleaned.replace(',', ""),
        (Some(_), Some(_)) => cleaned.replace('.', "").replace(',', "."),
        (None, Some(_)) => cleaned.replace(',', ""),
        _ => cleaned,
    };

    let (whole, fraction) = match canonical.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (canonical.as_str(), None),
    };

    // A second decimal point ("1.234.567") is not a number.
    if let Some(f) = fraction {
        if !f.bytes().all(|b| b.is_ascii_digit()) {
            return Err(not_numeric());
        }
        if whole.is_empty() && f.is_empty() {
            return Err(not_numeric());
        }
    }

    match (whole.is_empty(), fraction) {
        (true, None) => return Err(not_numeric()),
        (true, Some(_)) => return Ok(0),
        _ => {}
    }

    whole.parse::<i64>().map_err(|_| not_numeric())
}
