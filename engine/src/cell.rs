//! FILENAME: engine/src/cell.rs
//! PURPOSE: Defines the scalar value stored in one field of one source row.
//! CONTEXT: Source tables are schemaless; every field holds a `CellValue` and
//! the pivot engine decides per operation whether to read it as a label
//! (`display_value`) or as a number (`as_number`). Both coercions live here so
//! that grouping, filtering, aggregation and UI defaults all agree.

use serde::{Deserialize, Serialize};

/// The raw value of a source field.
/// `Empty` covers both an explicit null and a field missing from the row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// True for `Empty` and for text that is the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns the value coerced to a string.
    /// Used for filter matching, unique counts and group labels.
    pub fn display_value(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
        }
    }

    /// Returns the value as a finite number, if it has one.
    ///
    /// Numbers qualify when finite. Text qualifies when its longest numeric
    /// prefix parses to a finite number (`"12.5kg"` is 12.5, `"kg"` is not
    /// numeric). Booleans and empties never qualify.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => parse_float_prefix(s).filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// Formats a number the way a dynamic host stringifies it:
/// integral values carry no decimal point and negative zero prints as "0".
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Parses the longest numeric prefix of `input`, after leading whitespace.
///
/// Accepts an optional sign, digits with an optional fraction, and an
/// exponent only when digits follow it. `Infinity` is recognized. Returns
/// `None` when no digits are found.
pub fn parse_float_prefix(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    if s[end..].starts_with("Infinity") {
        let negative = s.starts_with('-');
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digit_count = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digit_count += frac_end - frac_start;
        if digit_count > 0 {
            end = frac_end;
        }
    }

    if digit_count == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_value_matches_host_stringification() {
        assert_eq!(CellValue::Number(10.0).display_value(), "10");
        assert_eq!(CellValue::Number(2.5).display_value(), "2.5");
        assert_eq!(CellValue::Number(-0.0).display_value(), "0");
        assert_eq!(CellValue::Boolean(true).display_value(), "true");
        assert_eq!(CellValue::Empty.display_value(), "");
        assert_eq!(CellValue::text("East").display_value(), "East");
    }

    #[test]
    fn as_number_reads_numeric_prefixes() {
        assert_eq!(CellValue::text("12.5kg").as_number(), Some(12.5));
        assert_eq!(CellValue::text("  -3").as_number(), Some(-3.0));
        assert_eq!(CellValue::text("1e3x").as_number(), Some(1000.0));
        assert_eq!(CellValue::text("5.").as_number(), Some(5.0));
        assert_eq!(CellValue::text(".5").as_number(), Some(0.5));
    }

    #[test]
    fn as_number_rejects_non_numeric_values() {
        assert_eq!(CellValue::text("kg").as_number(), None);
        assert_eq!(CellValue::text("").as_number(), None);
        assert_eq!(CellValue::text("Infinity").as_number(), None);
        assert_eq!(CellValue::Number(f64::NAN).as_number(), None);
        assert_eq!(CellValue::Boolean(true).as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn parse_float_prefix_ignores_dangling_exponent() {
        assert_eq!(parse_float_prefix("2e"), Some(2.0));
        assert_eq!(parse_float_prefix("2e+"), Some(2.0));
        assert_eq!(parse_float_prefix("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("-"), None);
    }

    #[test]
    fn deserializes_json_scalars() {
        let values: Vec<CellValue> = serde_json::from_str(r#"[null, 3, "x", false]"#).unwrap();
        assert_eq!(
            values,
            vec![
                CellValue::Empty,
                CellValue::Number(3.0),
                CellValue::text("x"),
                CellValue::Boolean(false),
            ]
        );
    }

    #[test]
    fn blank_covers_empty_strings() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::text("").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }
}
