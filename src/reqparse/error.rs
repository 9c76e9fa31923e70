//! Argument validation failures.

use serde_json::{Map, Value, json};

/// Why a request's arguments were rejected. Always a client error (400).
///
/// Messages already include the argument's help text when one was
/// declared, with `{error_msg}` replaced by the underlying reason.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("{name}: {message}")]
    MissingArgument { name: String, message: String },

    #[error("{name}: {message}")]
    NullNotAllowed { name: String, message: String },

    #[error("{name}: {message}")]
    InvalidType {
        name: String,
        expected: String,
        value: Value,
        message: String,
    },

    #[error("{name}: {message}")]
    InvalidChoice {
        name: String,
        choices: Vec<Value>,
        value: Value,
        message: String,
    },

    #[error("Unknown arguments: {}", .names.join(", "))]
    UnexpectedArgument { names: Vec<String> },

    /// The body claims to be JSON but does not decode.
    #[error("{name}: {message}")]
    MalformedBody { name: String, message: String },

    /// Every failing argument, when the parser bundles errors.
    #[error("{} arguments failed validation", .0.len())]
    Bundle(Vec<ParseError>),
}

impl ParseError {
    /// The argument the error is about, if it concerns a single one.
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::MissingArgument { name, .. }
            | Self::NullNotAllowed { name, .. }
            | Self::InvalidType { name, .. }
            | Self::InvalidChoice { name, .. }
            | Self::MalformedBody { name, .. } => Some(name.as_str()),
            Self::UnexpectedArgument { .. } | Self::Bundle(_) => None,
        }
    }

    /// The `message` member of the 400 body: `{argument: message}` for
    /// argument errors, a plain string for unknown arguments.
    pub(crate) fn message_body(&self) -> Value {
        match self {
            Self::UnexpectedArgument { .. } => json!(self.to_string()),
            Self::Bundle(errors) => {
                let mut out = Map::new();
                for error in errors {
                    error.collect_into(&mut out);
                }
                Value::Object(out)
            }
            single => {
                let mut out = Map::with_capacity(1);
                single.collect_into(&mut out);
                Value::Object(out)
            }
        }
    }

    fn collect_into(&self, out: &mut Map<String, Value>) {
        match self {
            Self::MissingArgument { name, message }
            | Self::NullNotAllowed { name, message }
            | Self::InvalidType { name, message, .. }
            | Self::InvalidChoice { name, message, .. }
            | Self::MalformedBody { name, message } => {
                out.insert(name.clone(), json!(message));
            }
            Self::UnexpectedArgument { names } => {
                for name in names {
                    out.insert(name.clone(), json!("Unknown argument"));
                }
            }
            Self::Bundle(errors) => errors.iter().for_each(|e| e.collect_into(out)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_error_body_is_keyed_by_argument() {
        let err = ParseError::MissingArgument {
            name: "key".into(),
            message: "Missing required parameter in the query string".into(),
        };
        assert_eq!(err.argument(), Some("key"));
        assert_eq!(
            err.message_body(),
            json!({ "key": "Missing required parameter in the query string" })
        );
    }

    #[test]
    fn bundle_body_merges_every_argument() {
        let err = ParseError::Bundle(vec![
            ParseError::NullNotAllowed { name: "a".into(), message: "Must not be null!".into() },
            ParseError::MissingArgument { name: "b".into(), message: "missing".into() },
        ]);
        assert_eq!(err.message_body(), json!({ "a": "Must not be null!", "b": "missing" }));
        assert_eq!(err.to_string(), "2 arguments failed validation");
    }

    #[test]
    fn unexpected_arguments_render_as_text() {
        let err = ParseError::UnexpectedArgument { names: vec!["x".into(), "y".into()] };
        assert_eq!(err.message_body(), json!("Unknown arguments: x, y"));
    }
}
