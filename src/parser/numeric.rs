//! Numeric Coercion
//!
//! smartctl prints many values in human-oriented forms: `40 (Min/Max 20/50)`,
//! `1,234,567 [632 GB]`, `100%`, `0x00`, `24299h+04m+13.789s`. Only the
//! leading numeric token is significant. Everything that needs a number
//! from such text goes through this module.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static LEADING_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?").expect("valid decimal pattern"));

/// Parse the leading numeric token of `text`.
///
/// Takes the first whitespace-separated token, drops thousands separators
/// and a trailing `%`, accepts `0x` hex, then parses the longest decimal
/// prefix. Returns `None` when there is no numeric prefix at all; callers
/// must drop the value rather than substitute zero.
pub fn leading_number(text: &str) -> Option<f64> {
    let token = text.split_whitespace().next()?;
    let token: String = token.chars().filter(|c| *c != ',').collect();
    let token = token.trim_end_matches('%');

    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }

    LEADING_DECIMAL
        .find(token)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Coerce a JSON value to a number.
///
/// Numbers pass through, strings go through [`leading_number`], booleans
/// map to 1/0. Everything else is not numeric.
pub fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_plain_integers() {
        assert_eq!(leading_number("24299"), Some(24299.0));
        assert_eq!(leading_number("  073 "), Some(73.0));
        assert_eq!(leading_number("-5"), Some(-5.0));
    }

    #[test]
    fn test_annotated_values() {
        assert_eq!(leading_number("40 (Min/Max 20/50)"), Some(40.0));
        assert_eq!(leading_number("38 Celsius"), Some(38.0));
        assert_eq!(leading_number("1,234,567 [632 GB]"), Some(1_234_567.0));
        assert_eq!(leading_number("100%"), Some(100.0));
        assert_eq!(leading_number("24299h+04m+13.789s"), Some(24299.0));
        assert_eq!(leading_number("12345.678"), Some(12345.678));
    }

    #[test]
    fn test_hex_values() {
        assert_eq!(leading_number("0x00"), Some(0.0));
        assert_eq!(leading_number("0x1f"), Some(31.0));
        assert_eq!(leading_number("0x"), None);
        assert_eq!(leading_number("0xzz"), None);
    }

    #[test]
    fn test_non_numeric() {
        assert_eq!(leading_number(""), None);
        assert_eq!(leading_number("   "), None);
        assert_eq!(leading_number("-"), None);
        assert_eq!(leading_number("n/a"), None);
        assert_eq!(leading_number("FAILING_NOW"), None);
    }

    #[test]
    fn test_json_number() {
        assert_eq!(json_number(&json!(73)), Some(73.0));
        assert_eq!(json_number(&json!(1.5)), Some(1.5));
        assert_eq!(json_number(&json!("40 (Min/Max 20/50)")), Some(40.0));
        assert_eq!(json_number(&json!(true)), Some(1.0));
        assert_eq!(json_number(&json!(null)), None);
        assert_eq!(json_number(&json!({"value": 1})), None);
        assert_eq!(json_number(&json!([1, 2])), None);
    }

    proptest! {
        #[test]
        fn prop_integers_survive_annotation(n in 0u32..u32::MAX, suffix in "[ a-zA-Z()/\\[\\]]{0,16}") {
            let text = format!("{}{}", n, if suffix.is_empty() { String::new() } else { format!(" {}", suffix) });
            prop_assert_eq!(leading_number(&text), Some(n as f64));
        }

        #[test]
        fn prop_thousands_separators_are_ignored(n in 0u64..1_000_000_000_000u64) {
            let digits = n.to_string();
            let mut grouped = String::new();
            for (i, c) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push(',');
                }
                grouped.push(c);
            }
            prop_assert_eq!(leading_number(&grouped), Some(n as f64));
        }

        #[test]
        fn prop_alphabetic_text_is_rejected(text in "[a-zA-Z_/]{1,24}") {
            prop_assert_eq!(leading_number(&text), None);
        }
    }
}
