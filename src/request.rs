//! Incoming HTTP request type.
//!
//! The body is fully buffered before a handler runs, so every view of the
//! request (query pairs, form pairs, JSON document) is plain in-memory data.
//! Form and JSON views are decoded on first use and cached for the rest of
//! the request.

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;
use serde_json::Value;
use tracing::warn;
use url::form_urlencoded;

const MULTIPART_BOUNDARY: &str = "tsu-restful-form-boundary";

/// An incoming HTTP request with its body already read.
pub struct Request {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) query: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    query_pairs: OnceLock<Vec<(String, String)>>,
    form_pairs: OnceLock<Vec<(String, String)>>,
    json_body: OnceLock<Result<Option<Value>, String>>,
}

impl Request {
    /// Builds a request by hand. `target` may carry a query string
    /// (`"/todos?page=2"`).
    ///
    /// ```rust
    /// use tsu_restful::Request;
    ///
    /// let req = Request::new("POST", "/todos?notify=1")
    ///     .with_json(&serde_json::json!({ "task": "write docs" }));
    /// assert_eq!(req.path(), "/todos");
    /// ```
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        Self::assemble(method.to_owned(), path.to_owned(), query.to_owned(), Vec::new(), Bytes::new())
    }

    /// Converts the head of a hyper request plus its collected body.
    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let headers = parts.headers.iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        Self::assemble(
            parts.method.as_str().to_owned(),
            parts.uri.path().to_owned(),
            parts.uri.query().unwrap_or_default().to_owned(),
            headers,
            body,
        )
    }

    fn assemble(
        method: String,
        path: String,
        query: String,
        headers: Vec<(String, String)>,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            path,
            query,
            headers,
            body,
            params: HashMap::new(),
            query_pairs: OnceLock::new(),
            form_pairs: OnceLock::new(),
            json_body: OnceLock::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and the matching `content-type`.
    pub fn with_json(self, body: &Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(body.to_string())
    }

    /// Sets an `application/x-www-form-urlencoded` body.
    pub fn with_form(self, fields: &[(&str, &str)]) -> Self {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.with_header("content-type", "application/x-www-form-urlencoded")
            .with_body(encoded)
    }

    /// Sets a `multipart/form-data` body of text fields.
    pub fn with_multipart(self, fields: &[(&str, &str)]) -> Self {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{MULTIPART_BOUNDARY}--\r\n"));
        self.with_header("content-type", &format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"))
            .with_body(body)
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_owned(), value.to_owned());
        self
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params.extend(params);
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query_string(&self) -> &str { &self.query }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/todos/{id}`, `req.param("id")` on `/todos/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Decoded query-string pairs in their original order, repeats included.
    pub fn query(&self) -> &[(String, String)] {
        self.query_pairs.get_or_init(|| decode_pairs(self.query.as_bytes()))
    }

    /// Decoded form pairs. Empty unless the body is
    /// `application/x-www-form-urlencoded`, or `multipart/form-data` that the
    /// router has already decoded.
    pub fn form(&self) -> &[(String, String)] {
        self.form_pairs.get_or_init(|| {
            if self.content_type_is("application/x-www-form-urlencoded") {
                decode_pairs(&self.body)
            } else {
                Vec::new()
            }
        })
    }

    /// The decoded JSON body.
    ///
    /// `Ok(None)` when there is no JSON body. A body that declares a JSON
    /// content type but does not parse is an `Err` carrying the decoder's
    /// message; an undeclared body that does not parse is simply absent.
    pub fn json(&self) -> Result<Option<&Value>, &str> {
        let decoded = self.json_body.get_or_init(|| {
            if self.body.is_empty() {
                return Ok(None);
            }
            match self.header("content-type") {
                Some(ct) if ct.to_ascii_lowercase().contains("json") => {
                    serde_json::from_slice(&self.body)
                        .map(Some)
                        .map_err(|e| e.to_string())
                }
                Some(_) => Ok(None),
                None => Ok(serde_json::from_slice(&self.body).ok()),
            }
        });
        match decoded {
            Ok(value) => Ok(value.as_ref()),
            Err(e) => Err(e.as_str()),
        }
    }

    /// Collects the text fields of a `multipart/form-data` body into the form
    /// pairs. File parts are skipped. A malformed body keeps the fields read
    /// before the fault.
    pub(crate) async fn decode_multipart(&self) {
        if !self.content_type_is("multipart/form-data") {
            return;
        }
        let Some(boundary) = self.header("content-type").and_then(|ct| multer::parse_boundary(ct).ok()) else {
            warn!("multipart body without a boundary");
            return;
        };

        let mut multipart = multer::Multipart::with_reader(std::io::Cursor::new(self.body.clone()), boundary);
        let mut pairs = Vec::new();
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "malformed multipart body");
                    break;
                }
            };
            if field.file_name().is_some() {
                continue;
            }
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match field.text().await {
                Ok(text) => pairs.push((name, text)),
                Err(e) => {
                    warn!(field = %name, error = %e, "unreadable multipart field");
                    break;
                }
            }
        }
        let _ = self.form_pairs.set(pairs);
    }

    fn content_type_is(&self, mime: &str) -> bool {
        self.header("content-type")
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(mime))
    }
}

fn decode_pairs(input: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(input).into_owned().collect()
}
