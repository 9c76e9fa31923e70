//! Request argument parsing.
//!
//! A [`RequestParser`] is a list of [`Argument`] declarations. Parsing a
//! request runs every declaration and collects the results into a
//! [`Namespace`], keyed by each argument's destination:
//!
//! ```rust
//! use serde_json::json;
//! use tsu_restful::Request;
//! use tsu_restful::reqparse::{ArgType, Argument, RequestParser};
//!
//! let parser = RequestParser::new()
//!     .add_argument(Argument::new("rate").kind(ArgType::Integer).help("Rate cannot be converted"))
//!     .add_argument(Argument::new("name"));
//!
//! let args = parser.parse_args(&Request::new("GET", "/?rate=3")).unwrap();
//! assert_eq!(args["rate"], json!(3));
//! assert_eq!(args["name"], json!(null));
//! ```
//!
//! Parsers are plain values. Derive a variant with [`RequestParser::copy`]
//! and [`RequestParser::replace_argument`] without touching the original.

mod argument;
mod error;
mod inputs;

use std::ops::Index;

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::request::Request;

pub use argument::{Action, Argument, DEFAULT_LOCATIONS, Location};
pub use error::ParseError;
pub use inputs::ArgType;

/// Parsed arguments, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Namespace {
    values: IndexMap<String, Value>,
}

impl Namespace {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Deserializes one entry. Absent and mistyped entries give `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(|v| T::deserialize(v).ok())
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values.into_iter().collect())
    }
}

static NULL: Value = Value::Null;

impl Index<&str> for Namespace {
    type Output = Value;

    /// Missing keys index to `null`, like `serde_json::Value`.
    fn index(&self, key: &str) -> &Value {
        self.values.get(key).unwrap_or(&NULL)
    }
}

/// Declared arguments plus parser-wide options.
#[derive(Clone, Debug, Default)]
pub struct RequestParser {
    args: Vec<Argument>,
    trim: bool,
    bundle_errors: bool,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip surrounding whitespace from string values, unless an argument
    /// says otherwise.
    pub fn trim(mut self, yes: bool) -> Self {
        self.trim = yes;
        self
    }

    /// Report every failing argument at once instead of stopping at the first.
    pub fn bundle_errors(mut self, yes: bool) -> Self {
        self.bundle_errors = yes;
        self
    }

    /// # Panics
    ///
    /// Panics if another argument already stores into the same destination.
    pub fn add_argument(mut self, arg: Argument) -> Self {
        if self.args.iter().any(|a| a.dest() == arg.dest()) {
            panic!("duplicate argument destination `{}`", arg.dest());
        }
        self.args.push(arg);
        self
    }

    /// An independent parser with the same declarations and options.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Rebuilds the argument named `name` in place. The name is kept.
    pub fn replace_argument(mut self, name: &str, f: impl FnOnce(Argument) -> Argument) -> Self {
        match self.args.iter().position(|a| a.name() == name) {
            Some(i) => {
                let old = self.args.remove(i);
                let mut new = f(old);
                new.name = name.to_owned();
                self.args.insert(i, new);
            }
            None => warn!(argument = name, "replace_argument: no such argument"),
        }
        self
    }

    pub fn remove_argument(mut self, name: &str) -> Self {
        let before = self.args.len();
        self.args.retain(|a| a.name() != name);
        if self.args.len() == before {
            warn!(argument = name, "remove_argument: no such argument");
        }
        self
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.args
    }

    /// Parses every declared argument out of `req`.
    pub fn parse_args(&self, req: &Request) -> Result<Namespace, ParseError> {
        let mut namespace = Namespace::default();
        let mut errors = Vec::new();

        for arg in &self.args {
            match arg.parse(req, self.trim) {
                Ok(Some(value)) => {
                    namespace.values.insert(arg.dest().to_owned(), value);
                }
                Ok(None) => {}
                Err(e) if self.bundle_errors => errors.push(e),
                Err(e) => {
                    debug!(argument = arg.name(), error = %e, "argument rejected");
                    return Err(e);
                }
            }
        }

        if errors.is_empty() {
            return Ok(namespace);
        }
        debug!(failed = errors.len(), "arguments rejected");
        Err(ParseError::Bundle(errors))
    }

    /// Like [`parse_args`](Self::parse_args), but also rejects keys no
    /// argument declares. Only the query string, form body and JSON body are
    /// checked; headers never are.
    pub fn parse_args_strict(&self, req: &Request) -> Result<Namespace, ParseError> {
        let namespace = self.parse_args(req)?;

        let mut unknown: Vec<String> = Vec::new();
        let mut flag = |key: &str| {
            if !self.args.iter().any(|a| a.matches(key)) && !unknown.iter().any(|u| u == key) {
                unknown.push(key.to_owned());
            }
        };
        for (key, _) in req.query().iter().chain(req.form()) {
            flag(key.as_str());
        }
        if let Ok(Some(Value::Object(map))) = req.json() {
            map.keys().for_each(|key| flag(key.as_str()));
        }

        if unknown.is_empty() {
            return Ok(namespace);
        }
        debug!(unknown = ?unknown, "unexpected arguments");
        Err(ParseError::UnexpectedArgument { names: unknown })
    }
}
