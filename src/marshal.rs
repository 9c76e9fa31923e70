//! Applying schemas to data and to handler replies.
//!
//! [`marshal`] is the plain function. [`marshal_with`] and
//! [`marshal_with_field`] package it as [`Middleware`] so a resource verb
//! can declare its output shape next to its handler:
//!
//! ```rust
//! use serde_json::json;
//! use tsu_restful::fields::{Field, Schema};
//! use tsu_restful::{Method, Request, Resource, marshal_with};
//!
//! let todo = Schema::new()
//!     .field("id", Field::integer())
//!     .field("task", Field::string());
//!
//! let resource = Resource::new("todo")
//!     .get(|_req: Request| async { json!({ "id": "1", "task": "ship it", "secret": true }) })
//!     .decorate(Method::Get, marshal_with(todo, Some("todo")));
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

use crate::fields::{Field, MarshalError, Schema};
use crate::middleware::Middleware;
use crate::reply::Reply;

/// Projects `data` through `schema`.
///
/// A list marshals element-wise into a list of objects. With an envelope
/// the result is wrapped as `{envelope: result}`.
pub fn marshal<T: Serialize + ?Sized>(
    data: &T,
    schema: &Schema,
    envelope: Option<&str>,
) -> Result<Value, MarshalError> {
    let source = serde_json::to_value(data)
        .map_err(|e| MarshalError::new(format!("source is not serializable: {e}")))?;
    let marshaled = match &source {
        Value::Array(items) => items.iter()
            .enumerate()
            .map(|(i, item)| schema.apply(item).map_err(|e| e.within(&i.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)?,
        other => schema.apply(other)?,
    };
    Ok(wrap(marshaled, envelope))
}

fn wrap(value: Value, envelope: Option<&str>) -> Value {
    match envelope {
        Some(key) => {
            let mut outer = Map::with_capacity(1);
            outer.insert(key.to_owned(), value);
            Value::Object(outer)
        }
        None => value,
    }
}

/// Middleware marshaling the data of every reply through `schema`.
///
/// Status and headers are kept; finished responses and errors pass through.
/// A marshal failure becomes a `500`.
pub fn marshal_with(schema: Schema, envelope: Option<&str>) -> Middleware {
    let envelope = envelope.map(str::to_owned);
    Middleware::map_reply(move |reply: Reply| {
        reply.try_map_data(|data| marshal(&data, &schema, envelope.as_deref()))
    })
}

/// Middleware applying a single field to the data of every reply.
pub fn marshal_with_field(field: Field) -> Middleware {
    Middleware::map_reply(move |reply: Reply| reply.try_map_data(|data| field.format(&data)))
}
