//! Unified error type.
//!
//! Every failure a request can end in is an [`Error`]: client mistakes caught
//! by the argument parser (400), unsatisfiable `Accept` headers (406),
//! undeclared verbs (405), and server-side marshaling problems (500).
//! Handlers return it with `?`; the resource layer turns it into a JSON
//! `{"message": ...}` response with the matching status.

use http::StatusCode;
use serde_json::{Value, json};

use crate::fields::MarshalError;
use crate::method::Method;
use crate::reqparse::ParseError;
use crate::response::{IntoResponse, Response};

/// The error type returned by tsu-restful's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request arguments failed validation.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Handler output did not fit its schema.
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// Nothing in the `Accept` header can be produced: no default mediatype
    /// is configured, or the negotiated one has no writer.
    #[error("not acceptable: no representation satisfies `{accept}`")]
    NotAcceptable { accept: String },

    /// The resource declares no handler for the verb.
    #[error("method `{method}` is not allowed")]
    MethodNotAllowed { method: String, allowed: Vec<Method> },

    /// A representation writer could not encode the payload.
    #[error("failed to encode response body: {0}")]
    Encode(#[from] serde_json::Error),

    /// An explicit abort from handler code, e.g. a 404 for a missing record.
    #[error("{message}")]
    Abort { status: StatusCode, message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Ends the request with `status` and a message, like a framework abort.
    ///
    /// ```rust
    /// use http::StatusCode;
    /// use tsu_restful::Error;
    ///
    /// let err = Error::abort(StatusCode::NOT_FOUND, "Todo todo9 doesn't exist");
    /// assert_eq!(err.status(), StatusCode::NOT_FOUND);
    /// ```
    pub fn abort(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Abort { status, message: message.into() }
    }

    /// The HTTP status this error ends a request with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Parse(_) => StatusCode::BAD_REQUEST,
            Self::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Abort { status, .. } => *status,
            Self::Marshal(_) | Self::Encode(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The `message` member of the error body. Server-side failures do not
    /// leak their details to the client.
    fn message(&self) -> Value {
        match self {
            Self::Parse(e) => e.message_body(),
            Self::NotAcceptable { .. } => json!("Not Acceptable"),
            Self::MethodNotAllowed { .. } => {
                json!("The method is not allowed for the requested URL.")
            }
            Self::Abort { message, .. } => json!(message),
            Self::Marshal(_) | Self::Encode(_) | Self::Io(_) => {
                json!("Internal Server Error")
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = json!({ "message": self.message() });
        let mut builder = Response::builder().status(status);
        if let Self::MethodNotAllowed { allowed, .. } = &self {
            let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
            builder = builder.header("allow", &allow);
        }
        builder.json(format!("{body}\n").into_bytes())
    }
}
