//! Argument types: how a raw request value becomes a typed one.
//!
//! Query, form and header values always arrive as strings; JSON body values
//! arrive with their JSON type. Every coercion accepts both where it makes
//! sense, so `?page=2` and `{"page": 2}` parse the same way.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};

type Convert = dyn Fn(&Value) -> Result<Value, String> + Send + Sync + 'static;

/// The expected type of an argument.
#[derive(Clone, Default)]
pub enum ArgType {
    /// Text; numbers and booleans are printed, containers become JSON text.
    #[default]
    String,
    Integer,
    Float,
    /// `true`/`false`/`1`/`0` in any casing, or a JSON boolean.
    Boolean,
    /// Integer ≥ 0.
    Natural,
    /// Integer ≥ 1.
    Positive,
    /// Integer within an inclusive range.
    IntRange(i64, i64),
    /// Absolute `http`/`https` URL.
    Url,
    /// `YYYY-MM-DD`, stored as the same text.
    Date,
    /// ISO 8601 timestamp, stored as RFC 3339 (naive input is taken as UTC).
    DateTimeIso8601,
    /// RFC 822 timestamp, stored as RFC 3339.
    DateTimeRfc822,
    /// Any JSON value, unchanged.
    Json,
    /// A named conversion; the error string becomes the argument's message.
    Custom { name: String, convert: Arc<Convert> },
}

impl ArgType {
    pub fn custom(
        name: impl Into<String>,
        convert: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Self::Custom { name: name.into(), convert: Arc::new(convert) }
    }

    /// A short name used in error reports.
    pub fn name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Natural => "natural",
            Self::Positive => "positive",
            Self::IntRange(..) => "int_range",
            Self::Url => "url",
            Self::Date => "date",
            Self::DateTimeIso8601 => "datetime_from_iso8601",
            Self::DateTimeRfc822 => "datetime_from_rfc822",
            Self::Json => "json",
            Self::Custom { name, .. } => name,
        }
    }

    pub(crate) fn coerce(&self, raw: &Value) -> Result<Value, String> {
        match self {
            Self::String => Ok(text(raw)),
            Self::Integer => integer(raw).map(Value::from),
            Self::Float => float(raw),
            Self::Boolean => boolean(raw).map(Value::Bool),
            Self::Natural => {
                let n = integer(raw)?;
                if n < 0 {
                    return Err(format!("Invalid argument: {n}. argument must be a non-negative integer"));
                }
                Ok(Value::from(n))
            }
            Self::Positive => {
                let n = integer(raw)?;
                if n < 1 {
                    return Err(format!("Invalid argument: {n}. argument must be a positive integer"));
                }
                Ok(Value::from(n))
            }
            Self::IntRange(low, high) => {
                let n = integer(raw)?;
                if n < *low || n > *high {
                    return Err(format!(
                        "Invalid argument: {n}. argument must be within the range {low} - {high}"
                    ));
                }
                Ok(Value::from(n))
            }
            Self::Url => url(raw),
            Self::Date => date(raw),
            Self::DateTimeIso8601 => datetime_iso8601(raw),
            Self::DateTimeRfc822 => datetime_rfc822(raw),
            Self::Json => Ok(raw.clone()),
            Self::Custom { convert, .. } => convert(raw),
        }
    }
}

impl fmt::Debug for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntRange(low, high) => write!(f, "IntRange({low}, {high})"),
            other => f.write_str(other.name()),
        }
    }
}

fn text(raw: &Value) -> Value {
    match raw {
        Value::String(_) => raw.clone(),
        other => Value::String(other.to_string()),
    }
}

fn integer(raw: &Value) -> Result<i64, String> {
    match raw {
        Value::Number(n) => n.as_i64().ok_or_else(|| format!("invalid literal for integer: {n}")),
        Value::String(s) => s.trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid literal for integer: {s:?}")),
        other => Err(format!("invalid literal for integer: {other}")),
    }
}

fn float(raw: &Value) -> Result<Value, String> {
    let f = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    f.and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("could not convert {raw} to float"))
}

fn boolean(raw: &Value) -> Result<bool, String> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Value::String(s) if s.is_empty() => Err("boolean type must be non-null".to_owned()),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(format!("Invalid literal for boolean(): {s}")),
        },
        other => Err(format!("Invalid literal for boolean(): {other}")),
    }
}

fn url(raw: &Value) -> Result<Value, String> {
    let Value::String(s) = raw else {
        return Err(format!("{raw} is not a valid URL"));
    };
    match url::Url::parse(s) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Ok(raw.clone())
        }
        Ok(_) => Err(format!("{s} is not a valid URL. Did you mean: http://{s}")),
        Err(e) => Err(format!("{s} is not a valid URL: {e}")),
    }
}

fn date(raw: &Value) -> Result<Value, String> {
    raw.as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .ok_or_else(|| format!("Invalid date literal: {raw}"))
}

fn datetime_iso8601(raw: &Value) -> Result<Value, String> {
    let invalid = || format!("Invalid ISO 8601 datetime: {raw}");
    let s = raw.as_str().ok_or_else(invalid)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Value::String(dt.to_rfc3339()));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Value::String(naive.and_utc().to_rfc3339()))
        .map_err(|_| invalid())
}

fn datetime_rfc822(raw: &Value) -> Result<Value, String> {
    raw.as_str()
        .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
        .map(|dt| Value::String(dt.to_rfc3339()))
        .ok_or_else(|| format!("Invalid RFC 822 datetime: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_accepts_strings_and_numbers() {
        assert_eq!(ArgType::Integer.coerce(&json!("1")), Ok(json!(1)));
        assert_eq!(ArgType::Integer.coerce(&json!(1)), Ok(json!(1)));
        assert!(ArgType::Integer.coerce(&json!("one")).is_err());
        assert!(ArgType::Integer.coerce(&json!(1.5)).is_err());
    }

    #[test]
    fn string_prints_non_strings() {
        assert_eq!(ArgType::String.coerce(&json!(5)), Ok(json!("5")));
        assert_eq!(ArgType::String.coerce(&json!("x")), Ok(json!("x")));
    }

    #[test]
    fn boolean_literals() {
        for (raw, expected) in [("true", true), ("TRUE", true), ("1", true), ("false", false), ("0", false)] {
            assert_eq!(ArgType::Boolean.coerce(&json!(raw)), Ok(json!(expected)));
        }
        assert_eq!(ArgType::Boolean.coerce(&json!(false)), Ok(json!(false)));
        assert!(ArgType::Boolean.coerce(&json!("yes")).is_err());
        assert!(ArgType::Boolean.coerce(&json!("")).is_err());
    }

    #[test]
    fn integer_bounds() {
        assert_eq!(ArgType::Natural.coerce(&json!("0")), Ok(json!(0)));
        assert!(ArgType::Natural.coerce(&json!("-1")).is_err());
        assert!(ArgType::Positive.coerce(&json!("0")).is_err());
        assert_eq!(ArgType::IntRange(1, 10).coerce(&json!("10")), Ok(json!(10)));
        assert_eq!(
            ArgType::IntRange(1, 10).coerce(&json!("11")),
            Err("Invalid argument: 11. argument must be within the range 1 - 10".to_owned())
        );
    }

    #[test]
    fn url_requires_http_scheme_and_host() {
        assert_eq!(ArgType::Url.coerce(&json!("https://example.com/x")), Ok(json!("https://example.com/x")));
        assert!(ArgType::Url.coerce(&json!("example.com")).is_err());
        assert!(ArgType::Url.coerce(&json!("ftp://example.com")).is_err());
    }

    #[test]
    fn timestamps_normalise_to_rfc3339() {
        assert_eq!(
            ArgType::DateTimeIso8601.coerce(&json!("2019-01-01T00:00:00")),
            Ok(json!("2019-01-01T00:00:00+00:00"))
        );
        assert_eq!(
            ArgType::DateTimeRfc822.coerce(&json!("Tue, 01 Jan 2019 00:00:00 -0000")),
            Ok(json!("2019-01-01T00:00:00+00:00"))
        );
        assert_eq!(ArgType::Date.coerce(&json!("2019-01-01")), Ok(json!("2019-01-01")));
        assert!(ArgType::Date.coerce(&json!("01/01/2019")).is_err());
    }

    #[test]
    fn custom_conversions_keep_their_name() {
        let upper = ArgType::custom("upper", |raw| {
            raw.as_str().map(|s| json!(s.to_uppercase())).ok_or_else(|| "not text".to_owned())
        });
        assert_eq!(upper.name(), "upper");
        assert_eq!(upper.coerce(&json!("abc")), Ok(json!("ABC")));
    }
}
