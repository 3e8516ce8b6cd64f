//! Scalar materialization.
//!
//! Turns a terminal event into a typed value while keeping its literal text.
//! The upstream parser has already classified the literal by shape; this is
//! where the literal is actually parsed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{DecodeError, Result};
use crate::event::{Event, Kind};
use crate::node::{Datetime, Scalar, ScalarValue};

/// Convert a scalar-kind event into a typed scalar.
pub fn materialize(event: &Event) -> Result<Scalar> {
    let literal = event.raw();
    let value = match event.kind() {
        Kind::Key | Kind::String => ScalarValue::String(literal.to_string()),
        Kind::Bool => ScalarValue::Bool(literal == "true"),
        Kind::Integer => ScalarValue::Integer(
            parse_integer(literal).map_err(|reason| malformed(Kind::Integer, literal, reason))?,
        ),
        Kind::Float => ScalarValue::Float(
            parse_float(literal).map_err(|reason| malformed(Kind::Float, literal, reason))?,
        ),
        Kind::DateTime => ScalarValue::Datetime(
            parse_datetime(literal).map_err(|reason| malformed(Kind::DateTime, literal, reason))?,
        ),
        kind => return Err(DecodeError::UnsupportedEvent(kind)),
    };
    Ok(Scalar::new(value, literal))
}

fn malformed(kind: Kind, literal: &str, reason: String) -> DecodeError {
    DecodeError::MalformedScalar {
        kind,
        literal: literal.to_string(),
        reason,
    }
}

/// Parse an integer literal: optional sign, `_` separators, and
/// `0x`/`0o`/`0b` prefixes.
pub fn parse_integer(literal: &str) -> std::result::Result<i64, String> {
    let (negative, unsigned) = match literal.as_bytes().first() {
        Some(b'-') => (true, &literal[1..]),
        Some(b'+') => (false, &literal[1..]),
        _ => (false, literal),
    };

    let (radix, digits) = match unsigned.get(..2) {
        Some("0x") => (16, &unsigned[2..]),
        Some("0o") => (8, &unsigned[2..]),
        Some("0b") => (2, &unsigned[2..]),
        _ => (10, unsigned),
    };

    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') {
        return Err("expected digits".to_string());
    }
    if digits.contains("__") {
        return Err("separators must be surrounded by digits".to_string());
    }

    let mut cleaned = String::with_capacity(digits.len() + 1);
    if negative {
        cleaned.push('-');
    }
    for c in digits.chars().filter(|c| *c != '_') {
        if !c.is_ascii_alphanumeric() {
            return Err(format!("unexpected character {:?}", c));
        }
        cleaned.push(c);
    }

    i64::from_str_radix(&cleaned, radix).map_err(|e| e.to_string())
}

/// Parse a float literal, accepting `_` separators and `inf`/`nan`.
pub fn parse_float(literal: &str) -> std::result::Result<f64, String> {
    let (sign, unsigned) = match literal.as_bytes().first() {
        Some(b'-') => (-1.0, &literal[1..]),
        Some(b'+') => (1.0, &literal[1..]),
        _ => (1.0, literal),
    };

    match unsigned {
        "inf" => return Ok(sign * f64::INFINITY),
        "nan" => return Ok(f64::NAN.copysign(sign)),
        _ => {}
    }

    if unsigned.is_empty()
        || !unsigned
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'_' | b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return Err("expected a decimal number".to_string());
    }
    if unsigned.starts_with('_') || unsigned.ends_with('_') || unsigned.contains("__") {
        return Err("separators must be surrounded by digits".to_string());
    }

    let cleaned: String = literal.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().map_err(|e| e.to_string())
}

/// Parse an RFC 3339 date-time, local date-time, local date or local time.
pub fn parse_datetime(literal: &str) -> std::result::Result<Datetime, String> {
    let normalized = normalize_datetime(literal);

    let offset_err = match DateTime::parse_from_rfc3339(&normalized) {
        Ok(dt) => return Ok(Datetime::Offset(dt)),
        Err(e) => e,
    };
    if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Datetime::Local(dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        return Ok(Datetime::Date(date));
    }
    if let Ok(time) = NaiveTime::parse_from_str(&normalized, "%H:%M:%S%.f") {
        return Ok(Datetime::Time(time));
    }

    Err(offset_err.to_string())
}

/// Upper-case the `T`/`Z` designators and accept a space between date and time.
fn normalize_datetime(literal: &str) -> String {
    let mut normalized: String = literal
        .chars()
        .map(|c| match c {
            't' => 'T',
            'z' => 'Z',
            c => c,
        })
        .collect();
    if normalized.len() > 10 && normalized.as_bytes()[10] == b' ' {
        normalized.replace_range(10..11, "T");
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn scalar(kind: Kind, raw: &str) -> Scalar {
        materialize(&Event::scalar(kind, raw)).unwrap()
    }

    #[test]
    fn test_bool_is_true_only_for_exact_literal() {
        assert_eq!(scalar(Kind::Bool, "true").as_bool(), Some(true));
        assert_eq!(scalar(Kind::Bool, "false").as_bool(), Some(false));
        assert_eq!(scalar(Kind::Bool, "TRUE").as_bool(), Some(false));
    }

    #[test]
    fn test_key_and_string_are_strings() {
        assert_eq!(scalar(Kind::Key, "name").as_str(), Some("name"));
        let s = scalar(Kind::String, "Tom Preston-Werner");
        assert_eq!(s.as_str(), Some("Tom Preston-Werner"));
        assert_eq!(s.literal, "Tom Preston-Werner");
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("3"), Ok(3));
        assert_eq!(parse_integer("+99"), Ok(99));
        assert_eq!(parse_integer("-17"), Ok(-17));
        assert_eq!(parse_integer("1_000"), Ok(1000));
        assert_eq!(parse_integer("0xDEADBEEF"), Ok(0xDEAD_BEEF));
        assert_eq!(parse_integer("0xdead_beef"), Ok(0xDEAD_BEEF));
        assert_eq!(parse_integer("0o755"), Ok(0o755));
        assert_eq!(parse_integer("0b11010110"), Ok(0b1101_0110));
        assert_eq!(parse_integer("-9223372036854775808"), Ok(i64::MIN));
        assert!(parse_integer("9223372036854775808").is_err());
        assert!(parse_integer("notanumber").is_err());
        assert!(parse_integer("1__0").is_err());
        assert!(parse_integer("0x").is_err());
    }

    #[test]
    fn test_integer_keeps_literal() {
        let s = scalar(Kind::Integer, "0xFF");
        assert_eq!(s.as_i64(), Some(255));
        assert_eq!(s.literal, "0xFF");
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("6.626e-34"), Ok(6.626e-34));
        assert_eq!(parse_float("+1.0"), Ok(1.0));
        assert_eq!(parse_float("-0.01"), Ok(-0.01));
        assert_eq!(parse_float("5e+22"), Ok(5e22));
        assert_eq!(parse_float("224_617.445_991"), Ok(224_617.445_991));
        assert_eq!(parse_float("inf"), Ok(f64::INFINITY));
        assert_eq!(parse_float("-inf"), Ok(f64::NEG_INFINITY));
        assert!(parse_float("nan").unwrap().is_nan());
        assert!(parse_float("infinity").is_err());
        assert!(parse_float("1.2.3").is_err());
    }

    #[test]
    fn test_malformed_integer() {
        let err = materialize(&Event::scalar(Kind::Integer, "notanumber")).unwrap_err();
        match err {
            DecodeError::MalformedScalar { kind, literal, .. } => {
                assert_eq!(kind, Kind::Integer);
                assert_eq!(literal, "notanumber");
            }
            other => panic!("expected MalformedScalar, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_offset_datetime() {
        match parse_datetime("1979-05-27T07:32:00-08:00").unwrap() {
            Datetime::Offset(dt) => {
                assert_eq!(dt.year(), 1979);
                assert_eq!(dt.hour(), 7);
                assert_eq!(dt.offset().local_minus_utc(), -8 * 3600);
            }
            other => panic!("expected offset datetime, got {:?}", other),
        }
        assert!(matches!(
            parse_datetime("1979-05-27 07:32:00z"),
            Ok(Datetime::Offset(_))
        ));
    }

    #[test]
    fn test_parse_local_datetimes() {
        assert!(matches!(
            parse_datetime("1979-05-27T00:32:00.999999"),
            Ok(Datetime::Local(_))
        ));
        assert!(matches!(parse_datetime("1979-05-27"), Ok(Datetime::Date(_))));
        assert!(matches!(parse_datetime("07:32:00"), Ok(Datetime::Time(_))));
        assert!(parse_datetime("1979-13-45").is_err());
    }
}
