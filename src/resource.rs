//! Resources: named sets of verb handlers.
//!
//! ```rust
//! use http::StatusCode;
//! use serde_json::json;
//! use tsu_restful::{Request, Resource};
//!
//! let hello = Resource::new("HelloWorld")
//!     .get(|_req: Request| async { json!({ "hello": "world" }) })
//!     .delete(|_req: Request| async { (json!(""), StatusCode::NO_CONTENT) });
//! assert_eq!(hello.name(), "HelloWorld");
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedResourceHandler, ErasedResourceHandler, ResourceHandler};
use crate::method::Method;
use crate::middleware::{Middleware, compose};
use crate::reply::Reply;
use crate::representation::Representations;
use crate::request::Request;
use crate::response::Response;

/// A named set of handlers, one per HTTP verb, each with its own
/// middleware chain.
pub struct Resource {
    name: String,
    handlers: BTreeMap<Method, BoxedResourceHandler>,
    decorators: BTreeMap<Method, Vec<Middleware>>,
    representations: Representations,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: BTreeMap::new(),
            decorators: BTreeMap::new(),
            representations: Representations::empty(),
        }
    }

    /// Registers the handler for `method`, replacing any previous one.
    pub fn on(mut self, method: Method, handler: impl ResourceHandler) -> Self {
        self.handlers.insert(method, handler.into_boxed_resource_handler());
        self
    }

    pub fn get(self, handler: impl ResourceHandler) -> Self {
        self.on(Method::Get, handler)
    }

    pub fn post(self, handler: impl ResourceHandler) -> Self {
        self.on(Method::Post, handler)
    }

    pub fn put(self, handler: impl ResourceHandler) -> Self {
        self.on(Method::Put, handler)
    }

    pub fn patch(self, handler: impl ResourceHandler) -> Self {
        self.on(Method::Patch, handler)
    }

    pub fn delete(self, handler: impl ResourceHandler) -> Self {
        self.on(Method::Delete, handler)
    }

    pub fn head(self, handler: impl ResourceHandler) -> Self {
        self.on(Method::Head, handler)
    }

    pub fn options(self, handler: impl ResourceHandler) -> Self {
        self.on(Method::Options, handler)
    }

    /// Wraps the handler for `method` in `middleware`. The first middleware
    /// added for a verb runs closest to the handler.
    pub fn decorate(mut self, method: Method, middleware: Middleware) -> Self {
        self.decorators.entry(method).or_default().push(middleware);
        self
    }

    /// Adds `middleware` to every verb registered so far.
    pub fn decorate_all(mut self, middleware: Middleware) -> Self {
        for method in self.handlers.keys() {
            self.decorators.entry(*method).or_default().push(middleware.clone());
        }
        self
    }

    /// Serializes this resource's data as `mediatype` when the client asks
    /// for it. Consulted before the [`Api`](crate::Api) registry; requests
    /// that match none of the resource's own mediatypes fall through to it.
    pub fn representation<F>(mut self, mediatype: &str, writer: F) -> Self
    where
        F: Fn(&Value, StatusCode, &[(String, String)]) -> Result<Response, Error>
            + Send
            + Sync
            + 'static,
    {
        self.representations = self.representations.with(mediatype, writer);
        self
    }

    pub(crate) fn representations(&self) -> &Representations {
        &self.representations
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The verbs this resource answers, in a stable order.
    pub fn methods(&self) -> Vec<Method> {
        self.handlers.keys().copied().collect()
    }

    /// Freezes the resource into a single handler. Every verb's chain is
    /// composed here, once.
    pub(crate) fn into_dispatch(self) -> BoxedResourceHandler {
        let Self { name, handlers, mut decorators, .. } = self;
        let handlers = handlers.into_iter()
            .map(|(method, handler)| {
                let chain = decorators.remove(&method).unwrap_or_default();
                (method, compose(handler, &chain))
            })
            .collect();
        Arc::new(Dispatch { name, handlers })
    }
}

struct Dispatch {
    name: String,
    handlers: BTreeMap<Method, BoxedResourceHandler>,
}

impl ErasedResourceHandler for Dispatch {
    fn call(&self, req: Request) -> BoxFuture<Reply> {
        let handler = req.method().parse::<Method>()
            .ok()
            .and_then(|method| self.handlers.get(&method));
        match handler {
            Some(handler) => {
                debug!(resource = %self.name, method = req.method(), "dispatching");
                handler.call(req)
            }
            None => {
                let err = Error::MethodNotAllowed {
                    method: req.method().to_owned(),
                    allowed: self.handlers.keys().copied().collect(),
                };
                Box::pin(async move { Reply::Error(err) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn todo() -> BoxedResourceHandler {
        Resource::new("todo")
            .get(|_req: Request| async { json!({ "task": "build an API" }) })
            .put(|_req: Request| async { (json!({ "task": "updated" }), StatusCode::CREATED) })
            .into_dispatch()
    }

    #[tokio::test]
    async fn verb_lookup_ignores_case() {
        let Reply::Data { status, .. } = todo().call(Request::new("get", "/todos/1")).await else {
            panic!("expected data");
        };
        assert_eq!(status, StatusCode::OK);

        let Reply::Data { status, .. } = todo().call(Request::new("PUT", "/todos/1")).await else {
            panic!("expected data");
        };
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn undeclared_verb_is_405_listing_the_declared_ones() {
        match todo().call(Request::new("POST", "/todos/1")).await {
            Reply::Error(Error::MethodNotAllowed { method, allowed }) => {
                assert_eq!(method, "POST");
                assert_eq!(allowed, vec![Method::Get, Method::Put]);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn decorators_only_wrap_their_verb() {
        let shout = Middleware::map_reply(|reply| {
            reply.try_map_data(|data| -> Result<_, Error> {
                Ok(json!(data.as_str().unwrap_or_default().to_uppercase()))
            })
        });
        let resource = Resource::new("echo")
            .get(|_req: Request| async { "hi" })
            .post(|_req: Request| async { "hi" })
            .decorate(Method::Get, shout)
            .into_dispatch();

        let Reply::Data { data, .. } = resource.call(Request::new("GET", "/")).await else {
            panic!("expected data");
        };
        assert_eq!(data, json!("HI"));
        let Reply::Data { data, .. } = resource.call(Request::new("POST", "/")).await else {
            panic!("expected data");
        };
        assert_eq!(data, json!("hi"));
    }
}
