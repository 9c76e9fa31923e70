//! Scalar coercions applied by [`Field`](super::Field) kinds.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Number, Value};

use super::{DateFormat, MarshalError, lookup, type_name};

pub(super) fn string(value: &Value) -> Value {
    match value {
        Value::String(_) | Value::Null => value.clone(),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => Value::String(other.to_string()),
    }
}

/// Integral numbers pass through untouched (however large), fractional
/// numbers are truncated toward zero, numeric strings are parsed.
pub(super) fn integer(value: &Value) -> Result<Value, MarshalError> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) if is_integral_text(&n.to_string()) => Ok(value.clone()),
        Value::Number(n) => n.as_f64()
            .and_then(truncate)
            .map(Value::from)
            .ok_or_else(|| MarshalError::new(format!("{n} does not fit an integer"))),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::from(i));
            }
            match Number::from_str(trimmed) {
                Ok(n) if is_integral_text(&n.to_string()) => Ok(Value::Number(n)),
                _ => Err(MarshalError::new(format!("invalid literal for integer: {s:?}"))),
            }
        }
        Value::Bool(b) => Ok(Value::from(i64::from(*b))),
        other => Err(MarshalError::new(format!("cannot convert {} to an integer", type_name(other)))),
    }
}

fn truncate(f: f64) -> Option<i64> {
    let t = f.trunc();
    (t.is_finite() && t >= i64::MIN as f64 && t <= i64::MAX as f64).then_some(t as i64)
}

fn is_integral_text(text: &str) -> bool {
    !text.contains(['.', 'e', 'E'])
}

pub(super) fn float(value: &Value) -> Result<Value, MarshalError> {
    let f = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    f.and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| MarshalError::new(format!("cannot convert {value} to a float")))
}

pub(super) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Every digit of the input, written without an exponent.
pub(super) fn arbitrary(value: &Value) -> Result<Value, MarshalError> {
    let text = decimal_text(value)?;
    expand_exponent(&text).map(Value::String)
}

/// `decimals` places, half-to-even rounding.
pub(super) fn fixed(value: &Value, decimals: u32) -> Result<Value, MarshalError> {
    let text = decimal_text(value)?;
    let parsed = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| MarshalError::new(format!("{text} is not a representable decimal: {e}")))?;
    let mut rounded = parsed.round_dp_with_strategy(decimals, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(decimals);
    Ok(Value::String(rounded.to_string()))
}

fn decimal_text(value: &Value) -> Result<String, MarshalError> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Number::from_str(s.trim())
            .map(|n| n.to_string())
            .or_else(|_| Decimal::from_str(s.trim()).map(|d| d.to_string()))
            .map_err(|_| MarshalError::new(format!("invalid literal for decimal: {s:?}"))),
        Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_owned()),
        other => Err(MarshalError::new(format!("cannot convert {} to a decimal", type_name(other)))),
    }
}

/// Longest plain decimal [`arbitrary`] will spell out.
const MAX_EXPANDED_DIGITS: usize = 4096;

/// Rewrites `6.5e3` as `6500` and `1.5e-3` as `0.0015`.
fn expand_exponent(text: &str) -> Result<String, MarshalError> {
    let Some(at) = text.find(['e', 'E']) else {
        return Ok(text.to_owned());
    };
    let exponent: i64 = text[at + 1..]
        .parse()
        .map_err(|_| MarshalError::new(format!("exponent out of range in {text}")))?;
    let mantissa = &text[..at];
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa.trim_start_matches('+')),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{int}{frac}");
    if digits.bytes().all(|b| b == b'0') {
        return Ok("0".to_owned());
    }

    let too_long = || MarshalError::new(format!("{text} expands past {MAX_EXPANDED_DIGITS} digits"));
    let point = i64::try_from(int.len())
        .ok()
        .and_then(|len| len.checked_add(exponent))
        .ok_or_else(too_long)?;
    let expanded_len = if point <= 0 {
        point.unsigned_abs().saturating_add(digits.len() as u64)
    } else {
        point.unsigned_abs().max(digits.len() as u64)
    };
    if expanded_len > MAX_EXPANDED_DIGITS as u64 {
        return Err(too_long());
    }
    let point_abs = point.unsigned_abs() as usize;

    let (whole, fraction) = if point <= 0 {
        (String::new(), format!("{}{digits}", "0".repeat(point_abs)))
    } else if point_abs >= digits.len() {
        (format!("{digits}{}", "0".repeat(point_abs - digits.len())), String::new())
    } else {
        (digits[..point_abs].to_owned(), digits[point_abs..].to_owned())
    };

    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        Ok(format!("{sign}{whole}"))
    } else {
        Ok(format!("{sign}{whole}.{fraction}"))
    }
}

// ── Timestamps ────────────────────────────────────────────────────────────────

enum Stamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

const NAIVE_LAYOUTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn parse_stamp(value: &Value) -> Option<Stamp> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(Stamp::Aware(dt));
            }
            if let Some(naive) = NAIVE_LAYOUTS.iter()
                .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
            {
                return Some(Stamp::Naive(naive));
            }
            if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
                return Some(Stamp::Aware(dt));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(Stamp::Naive)
        }
        Value::Number(n) => n.as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| Stamp::Aware(dt.fixed_offset())),
        _ => None,
    }
}

pub(super) fn datetime(value: &Value, layout: DateFormat) -> Result<Value, MarshalError> {
    let stamp = parse_stamp(value)
        .ok_or_else(|| MarshalError::new(format!("{value} is not a timestamp")))?;
    let text = match (layout, stamp) {
        (DateFormat::Rfc822, Stamp::Naive(n)) => rfc822(&n),
        (DateFormat::Rfc822, Stamp::Aware(dt)) => rfc822(&dt.naive_utc()),
        (DateFormat::Iso8601, Stamp::Naive(n)) => iso8601(&n),
        (DateFormat::Iso8601, Stamp::Aware(dt)) => {
            format!("{}{}", iso8601(&dt.naive_local()), dt.format("%:z"))
        }
    };
    Ok(Value::String(text))
}

fn rfc822(utc: &NaiveDateTime) -> String {
    utc.format("%a, %d %b %Y %H:%M:%S -0000").to_string()
}

fn iso8601(naive: &NaiveDateTime) -> String {
    let base = naive.format("%Y-%m-%dT%H:%M:%S").to_string();
    match naive.nanosecond() / 1_000 {
        0 => base,
        micros => format!("{base}.{micros:06}"),
    }
}

// ── Templates ─────────────────────────────────────────────────────────────────

/// Renders `{key}` placeholders against `source`. `{{` and `}}` are literal
/// braces; anything after `:` or `!` inside a placeholder is ignored.
/// Returns `None` when a placeholder names a key the source does not have.
pub(super) fn template(template: &str, source: &Value) -> Result<Option<String>, MarshalError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(MarshalError::new(format!("unclosed placeholder in {template:?}"))),
                    }
                }
                let key = name.split([':', '!']).next().unwrap_or_default().trim();
                let Some(value) = lookup(source, key) else {
                    return Ok(None);
                };
                match value {
                    Value::String(s) => out.push_str(s),
                    other => out.push_str(&other.to_string()),
                }
            }
            '}' => return Err(MarshalError::new(format!("single '}}' in {template:?}"))),
            c => out.push(c),
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_casts() {
        assert_eq!(integer(&json!("01")).unwrap(), json!(1));
        assert_eq!(integer(&json!(2)).unwrap(), json!(2));
        assert_eq!(integer(&json!(3.0)).unwrap(), json!(3));
        assert_eq!(integer(&json!(3.7)).unwrap(), json!(3));
        assert_eq!(integer(&json!(true)).unwrap(), json!(1));
        assert!(integer(&json!("3.5")).is_err());
        assert!(integer(&json!([1])).is_err());
    }

    #[test]
    fn integer_keeps_big_integers_exact() {
        let big: Value = serde_json::from_str("123456789012345678901234567890").unwrap();
        assert_eq!(integer(&big).unwrap().to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn float_casts() {
        assert_eq!(float(&json!(1)).unwrap().as_f64(), Some(1.0));
        assert_eq!(float(&json!("2.5")).unwrap().as_f64(), Some(2.5));
        assert!(float(&json!("abc")).is_err());
    }

    #[test]
    fn string_casts() {
        assert_eq!(string(&json!(1)), json!("1"));
        assert_eq!(string(&json!(false)), json!("false"));
        assert_eq!(string(&json!(["a"])), json!(r#"["a"]"#));
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!("false")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!([])));
        assert!(truthy(&json!({ "k": 1 })));
    }

    #[test]
    fn arbitrary_keeps_every_digit() {
        let big: Value = serde_json::from_str("634271127864378216478362784632784678324.23432").unwrap();
        assert_eq!(arbitrary(&big).unwrap(), json!("634271127864378216478362784632784678324.23432"));
        assert_eq!(expand_exponent("6.5e3").unwrap(), "6500");
        assert_eq!(expand_exponent("1.5e-3").unwrap(), "0.0015");
        assert_eq!(expand_exponent("-2E+2").unwrap(), "-200");
        assert_eq!(expand_exponent("0.5e1").unwrap(), "5");
        assert_eq!(expand_exponent("0e999999999").unwrap(), "0");
    }

    #[test]
    fn arbitrary_rejects_runaway_exponents() {
        for text in ["1e200000000", "1e-200000000", "1e9223372036854775807", "1e99999999999999999999"] {
            let huge: Value = serde_json::from_str(text).unwrap();
            assert!(arbitrary(&huge).is_err(), "{text}");
        }
        let edge: Value = serde_json::from_str("1e4095").unwrap();
        assert_eq!(arbitrary(&edge).unwrap().as_str().map(str::len), Some(4096));
    }

    #[test]
    fn fixed_pads_and_rounds_half_even() {
        assert_eq!(fixed(&json!(23432), 5).unwrap(), json!("23432.00000"));
        assert_eq!(fixed(&json!("2.125"), 2).unwrap(), json!("2.12"));
        assert_eq!(fixed(&json!("2.135"), 2).unwrap(), json!("2.14"));
        assert!(fixed(&json!("wat"), 2).is_err());
    }

    #[test]
    fn datetime_layouts() {
        let naive = json!("2019-01-01T00:00:00");
        assert_eq!(datetime(&naive, DateFormat::Rfc822).unwrap(), json!("Tue, 01 Jan 2019 00:00:00 -0000"));
        assert_eq!(datetime(&naive, DateFormat::Iso8601).unwrap(), json!("2019-01-01T00:00:00"));

        let aware = json!("2018-01-01T08:00:00+08:00");
        assert_eq!(datetime(&aware, DateFormat::Rfc822).unwrap(), json!("Mon, 01 Jan 2018 00:00:00 -0000"));
        assert_eq!(datetime(&aware, DateFormat::Iso8601).unwrap(), json!("2018-01-01T08:00:00+08:00"));
    }

    #[test]
    fn datetime_accepts_other_timestamp_shapes() {
        assert_eq!(datetime(&json!("2019-01-01"), DateFormat::Iso8601).unwrap(), json!("2019-01-01T00:00:00"));
        assert_eq!(datetime(&json!(0), DateFormat::Iso8601).unwrap(), json!("1970-01-01T00:00:00+00:00"));
        assert_eq!(
            datetime(&json!("2019-01-01 10:00:00.250"), DateFormat::Iso8601).unwrap(),
            json!("2019-01-01T10:00:00.250000")
        );
        assert!(datetime(&json!("yesterday"), DateFormat::Rfc822).is_err());
        assert!(datetime(&json!(true), DateFormat::Rfc822).is_err());
    }

    #[test]
    fn template_rendering() {
        let src = json!({ "name": "bot", "n": 3, "user": { "id": 7 } });
        assert_eq!(template("Hello {name}", &src).unwrap(), Some("Hello bot".to_owned()));
        assert_eq!(template("{n} items for {user.id}", &src).unwrap(), Some("3 items for 7".to_owned()));
        assert_eq!(template("{{literal}} {name}", &src).unwrap(), Some("{literal} bot".to_owned()));
        assert_eq!(template("{missing}", &src).unwrap(), None);
        assert!(template("{name", &src).is_err());
    }
}
