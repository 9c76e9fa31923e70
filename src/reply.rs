//! What a resource handler hands back before serialization.
//!
//! A handler either builds the final [`Response`] itself, which is sent
//! untouched, or returns data plus a status and headers, which still goes
//! through marshaling and content negotiation. [`IntoReply`] lets handlers
//! return the shapes they naturally have:
//!
//! | handler returns                     | becomes                         |
//! |-------------------------------------|---------------------------------|
//! | `Response`                          | passthrough                     |
//! | `Value`                             | data, `200`, no extra headers   |
//! | `(Value, u16)`                      | data with status                |
//! | `(Value, u16, Vec<(String, String)>)` | data with status and headers  |
//! | `Result<T, E>`                      | `T`'s reply, or `E` as an error |

use http::StatusCode;
use serde_json::Value;

use crate::error::Error;
use crate::response::Response;

/// Handler output awaiting serialization.
#[derive(Debug)]
pub enum Reply {
    /// A finished response, sent as-is.
    Response(Response),
    /// Data to marshal and serialize per the client's `Accept` header.
    Data {
        data: Value,
        status: StatusCode,
        headers: Vec<(String, String)>,
    },
    /// The request failed; rendered as an error response.
    Error(Error),
}

impl Reply {
    /// Data with `200 OK` and no extra headers.
    pub fn data(data: impl Into<Value>) -> Self {
        Self::Data { data: data.into(), status: StatusCode::OK, headers: Vec::new() }
    }

    /// Overrides the status of a data reply. Other replies are unchanged.
    pub fn with_status(mut self, code: StatusCode) -> Self {
        if let Self::Data { status, .. } = &mut self {
            *status = code;
        }
        self
    }

    /// Adds a header to a data reply. Other replies are unchanged.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let Self::Data { headers, .. } = &mut self {
            headers.push((name.to_owned(), value.to_owned()));
        }
        self
    }

    /// Rewrites the data of a data reply; responses and errors pass through.
    /// A failing rewrite turns the reply into an error.
    pub fn try_map_data<E: Into<Error>>(
        self,
        f: impl FnOnce(Value) -> Result<Value, E>,
    ) -> Self {
        match self {
            Self::Data { data, status, headers } => match f(data) {
                Ok(data) => Self::Data { data, status, headers },
                Err(e) => Self::Error(e.into()),
            },
            other => other,
        }
    }
}

/// Conversion into a [`Reply`].
pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply { self }
}

impl IntoReply for Response {
    fn into_reply(self) -> Reply { Reply::Response(self) }
}

impl IntoReply for Value {
    fn into_reply(self) -> Reply { Reply::data(self) }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply { Reply::data(self) }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply { Reply::data(self) }
}

impl IntoReply for Error {
    fn into_reply(self) -> Reply { Reply::Error(self) }
}

impl IntoReply for (Value, StatusCode) {
    fn into_reply(self) -> Reply { Reply::data(self.0).with_status(self.1) }
}

impl IntoReply for (Value, u16) {
    fn into_reply(self) -> Reply {
        match StatusCode::from_u16(self.1) {
            Ok(code) => Reply::data(self.0).with_status(code),
            Err(_) => Reply::Error(Error::abort(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("handler returned invalid status {}", self.1),
            )),
        }
    }
}

impl IntoReply for (Value, StatusCode, Vec<(String, String)>) {
    fn into_reply(self) -> Reply {
        let (data, status, headers) = self;
        Reply::Data { data, status, headers }
    }
}

impl IntoReply for (Value, u16, Vec<(String, String)>) {
    fn into_reply(self) -> Reply {
        let (data, status, headers) = self;
        match (data, status).into_reply() {
            Reply::Data { data, status, .. } => Reply::Data { data, status, headers },
            other => other,
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<Error>,
{
    fn into_reply(self) -> Reply {
        match self {
            Ok(ok) => ok.into_reply(),
            Err(e) => Reply::Error(e.into()),
        }
    }
}
