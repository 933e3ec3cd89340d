//! Lenient numeric coercion.
//!
//! Everything here degrades to `0` instead of failing: callers render tables
//! and charts from whatever the backend returned and never surface a parse
//! error to the user.

use crate::models::FieldValue;

// ── Text parsers ──────────────────────────────────────────────────────────────

/// Parse a decimal. Empty, unparsable or non-finite input → `0.0`.
pub fn parse_float(s: &str) -> f64 {
    try_parse_float(s).unwrap_or(0.0)
}

/// Parse an integer, stripping thousands separators first.
/// "1,234" → 1234 | "12.9" → 12 | "abc" → 0
pub fn parse_int(s: &str) -> i64 {
    try_parse_int(s).unwrap_or(0)
}

fn try_parse_int(s: &str) -> Option<i64> {
    let cleaned = s.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(n) = cleaned.parse::<i64>() {
        return Some(n);
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.trunc() as i64)
}

fn try_parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

// ── Field coercion ────────────────────────────────────────────────────────────

/// `None` when the value has no numeric reading. Sorting needs this
/// distinction; everything else goes through [`to_float`].
pub fn try_float(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Int(n) => Some(*n as f64),
        FieldValue::Float(f) if f.is_finite() => Some(*f),
        FieldValue::Float(_) => None,
        FieldValue::Text(s) => try_parse_float(s),
        FieldValue::Null => None,
    }
}

pub fn to_float(value: &FieldValue) -> f64 {
    try_float(value).unwrap_or(0.0)
}

/// Integer reading with thousands separators stripped; `None` for text that
/// is not a number.
pub fn try_int(value: &FieldValue) -> Option<i64> {
    match value {
        FieldValue::Int(n) => Some(*n),
        FieldValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        FieldValue::Float(_) => None,
        FieldValue::Text(s) => try_parse_int(s),
        FieldValue::Null => None,
    }
}

pub fn to_int(value: &FieldValue) -> i64 {
    try_int(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_float_degrades_to_zero() {
        assert_eq!(to_float(&FieldValue::Null), 0.0);
        assert_eq!(to_float(&"".into()), 0.0);
        assert_eq!(to_float(&"   ".into()), 0.0);
        assert_eq!(to_float(&"abc".into()), 0.0);
        assert_eq!(to_float(&FieldValue::Float(f64::NAN)), 0.0);
        assert_eq!(to_float(&FieldValue::Float(f64::INFINITY)), 0.0);
    }

    #[test]
    fn test_to_float_reads_numbers_and_strings() {
        assert_eq!(to_float(&" 12.5 ".into()), 12.5);
        assert_eq!(to_float(&FieldValue::Int(7)), 7.0);
        assert_eq!(to_float(&FieldValue::Float(3.25)), 3.25);
    }

    #[test]
    fn test_to_int_strips_commas() {
        assert_eq!(to_int(&"1,234,567".into()), 1_234_567);
        assert_eq!(to_int(&"12.9".into()), 12);
        assert_eq!(to_int(&FieldValue::Float(99.99)), 99);
        assert_eq!(to_int(&FieldValue::Int(-5)), -5);
    }

    #[test]
    fn test_to_int_degrades_to_zero() {
        assert_eq!(to_int(&FieldValue::Null), 0);
        assert_eq!(to_int(&"".into()), 0);
        assert_eq!(to_int(&"n/a".into()), 0);
        assert_eq!(to_int(&FieldValue::Float(f64::NAN)), 0);
    }

    #[test]
    fn test_try_float_distinguishes_missing() {
        assert_eq!(try_float(&"abc".into()), None);
        assert_eq!(try_float(&FieldValue::Null), None);
        assert_eq!(try_float(&"2".into()), Some(2.0));
    }

    #[test]
    fn test_try_int_reads_grouped_volumes() {
        assert_eq!(try_int(&"2,000,000".into()), Some(2_000_000));
        assert_eq!(try_int(&"1,500".into()), Some(1500));
        assert_eq!(try_int(&"n/a".into()), None);
        assert_eq!(try_int(&FieldValue::Null), None);
    }

    #[test]
    fn test_parse_text_input() {
        assert_eq!(parse_float("1.5"), 1.5);
        assert_eq!(parse_float("x"), 0.0);
        assert_eq!(parse_int("10,000"), 10_000);
        assert_eq!(parse_int("-"), 0);
    }
}
