//! Representation writers: turning reply data into response bytes for one
//! mediatype.
//!
//! An [`Api`](crate::Api) owns a [`Representations`] registry. After
//! negotiation picks a mediatype, its writer receives the data, the status
//! and the extra headers the handler returned, and builds the response.
//!
//! ```rust
//! use http::StatusCode;
//! use serde_json::Value;
//! use tsu_restful::{Error, Representations, Response};
//!
//! let reprs = Representations::default().with("text/csv", |data: &Value, status: StatusCode, headers: &[(String, String)]| {
//!     let line = data.as_array()
//!         .map(|row| row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(","))
//!         .unwrap_or_default();
//!     Ok::<_, Error>(Response::builder()
//!         .status(status)
//!         .headers(headers)
//!         .bytes("text/csv", format!("{line}\n").into_bytes()))
//! });
//! assert_eq!(reprs.mediatypes().collect::<Vec<_>>(), ["application/json", "text/csv"]);
//! ```

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::response::Response;

type WriterFn =
    dyn Fn(&Value, StatusCode, &[(String, String)]) -> Result<Response, Error> + Send + Sync + 'static;

/// Serializes data for one mediatype.
pub type Writer = Arc<WriterFn>;

/// Mediatype → writer, in registration order.
///
/// The order matters: it is the `supported` list handed to
/// [`best_match`](crate::best_match).
#[derive(Clone)]
pub struct Representations {
    writers: IndexMap<String, Writer>,
}

impl Representations {
    /// A registry with no writers at all.
    pub fn empty() -> Self {
        Self { writers: IndexMap::new() }
    }

    /// Registers (or replaces) the writer for `mediatype`.
    pub fn with<F>(mut self, mediatype: &str, writer: F) -> Self
    where
        F: Fn(&Value, StatusCode, &[(String, String)]) -> Result<Response, Error> + Send + Sync + 'static,
    {
        self.writers.insert(mediatype.to_owned(), Arc::new(writer));
        self
    }

    pub fn get(&self, mediatype: &str) -> Option<&Writer> {
        self.writers.get(mediatype)
    }

    pub fn mediatypes(&self) -> impl Iterator<Item = &str> {
        self.writers.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl Default for Representations {
    /// `application/json` with [`JsonSettings::default`].
    fn default() -> Self {
        Self::empty().with("application/json", json_writer(JsonSettings::default()))
    }
}

impl fmt::Debug for Representations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.writers.keys()).finish()
    }
}

/// Options for the built-in JSON writer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JsonSettings {
    /// Pretty-print with this many spaces per level. `None` is compact.
    pub indent: Option<usize>,
    /// Emit object keys in sorted order instead of insertion order.
    pub sort_keys: bool,
}

/// The built-in `application/json` writer. Output always ends with a newline.
pub fn json_writer(
    settings: JsonSettings,
) -> impl Fn(&Value, StatusCode, &[(String, String)]) -> Result<Response, Error> + Send + Sync + 'static {
    move |data: &Value, status: StatusCode, headers: &[(String, String)]| {
        output_json(data, status, headers, &settings)
    }
}

pub fn output_json(
    data: &Value,
    status: StatusCode,
    headers: &[(String, String)],
    settings: &JsonSettings,
) -> Result<Response, Error> {
    let sorted;
    let data = if settings.sort_keys {
        sorted = sort_keys(data);
        &sorted
    } else {
        data
    };

    let mut body = match settings.indent {
        Some(width) => {
            let indent = vec![b' '; width];
            let mut body = Vec::new();
            let mut ser = Serializer::with_formatter(&mut body, PrettyFormatter::with_indent(&indent));
            data.serialize(&mut ser)?;
            body
        }
        None => serde_json::to_vec(data)?,
    };
    body.push(b'\n');

    Ok(Response::builder()
        .status(status)
        .headers(headers)
        .bytes("application/json", body))
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(entries.into_iter()
                .map(|(k, v)| (k.clone(), sort_keys(v)))
                .collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Fallback for `text/plain` when no writer is registered for it: strings
/// are sent as-is, anything else as compact JSON text.
pub(crate) fn output_text(data: &Value, status: StatusCode, headers: &[(String, String)]) -> Response {
    let text = match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Response::builder().status(status).headers(headers).text(text)
}
