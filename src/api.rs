//! The API: resources, URLs and output negotiation in one place.
//!
//! ```rust
//! use serde_json::json;
//! use tsu_restful::{Api, Request, Resource, Router};
//!
//! let hello = Resource::new("HelloWorld")
//!     .get(|_req: Request| async { json!({ "hello": "world" }) });
//!
//! let router = Api::new()
//!     .prefix("/v1")
//!     .add_resource(hello, &["/", "/hello"])
//!     .register(Router::new());
//! ```
//!
//! Every registered URL is mounted on the router for all methods. The
//! resource answers the verbs it declares and `405` for the rest. A data
//! reply is serialized by the representation [`best_match`] picks from the
//! request's `Accept` header.

use std::sync::Arc;

use http::StatusCode;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, BoxedResourceHandler, ErasedHandler};
use crate::middleware::{Middleware, compose};
use crate::negotiate::best_match;
use crate::reply::Reply;
use crate::representation::{JsonSettings, Representations, json_writer, output_text};
use crate::request::Request;
use crate::resource::Resource;
use crate::response::{IntoResponse, Response};
use crate::router::Router;

struct Registered {
    urls: Vec<String>,
    handler: BoxedResourceHandler,
    representations: Representations,
}

/// A collection of resources sharing a URL prefix, output settings and
/// API-wide middleware.
pub struct Api {
    prefix: String,
    default_mediatype: Option<String>,
    representations: Representations,
    decorators: Vec<Middleware>,
    endpoints: IndexMap<String, Registered>,
}

impl Api {
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            default_mediatype: Some("application/json".to_owned()),
            representations: Representations::default(),
            decorators: Vec::new(),
            endpoints: IndexMap::new(),
        }
    }

    /// Prepended to every resource URL.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.trim_end_matches('/').to_owned();
        self
    }

    /// Mediatype used when nothing in `Accept` matches. `None` turns such
    /// requests into `406 Not Acceptable`.
    pub fn default_mediatype(mut self, mediatype: Option<&str>) -> Self {
        self.default_mediatype = mediatype.map(str::to_owned);
        self
    }

    /// Registers (or replaces) the writer for `mediatype`.
    pub fn representation<F>(mut self, mediatype: &str, writer: F) -> Self
    where
        F: Fn(&serde_json::Value, StatusCode, &[(String, String)]) -> Result<Response, Error>
            + Send
            + Sync
            + 'static,
    {
        self.representations = self.representations.with(mediatype, writer);
        self
    }

    /// Replaces the whole representation registry.
    pub fn representations(mut self, representations: Representations) -> Self {
        self.representations = representations;
        self
    }

    /// Reconfigures the built-in `application/json` writer.
    pub fn json_settings(self, settings: JsonSettings) -> Self {
        self.representation("application/json", json_writer(settings))
    }

    /// Wraps every resource of this API. Applied outside each resource's own
    /// verb middleware, first declared innermost.
    pub fn decorator(mut self, middleware: Middleware) -> Self {
        self.decorators.push(middleware);
        self
    }

    /// Adds `resource` under its lowercased name as the endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the endpoint name is already taken.
    pub fn add_resource(self, resource: Resource, urls: &[&str]) -> Self {
        let endpoint = resource.name().to_lowercase();
        self.add_resource_as(resource, &endpoint, urls)
    }

    /// Adds `resource` under an explicit endpoint name.
    ///
    /// # Panics
    ///
    /// Panics if the endpoint name is already taken.
    pub fn add_resource_as(mut self, resource: Resource, endpoint: &str, urls: &[&str]) -> Self {
        if self.endpoints.contains_key(endpoint) {
            panic!(
                "endpoint `{endpoint}` is already registered for {}",
                resource.name()
            );
        }
        let urls = urls.iter().map(|url| format!("{}{url}", self.prefix)).collect();
        self.endpoints.insert(endpoint.to_owned(), Registered {
            urls,
            representations: resource.representations().clone(),
            handler: resource.into_dispatch(),
        });
        self
    }

    /// The first URL registered for `endpoint`, prefix included.
    pub fn url_for(&self, endpoint: &str) -> Option<&str> {
        self.endpoints.get(endpoint)
            .and_then(|r| r.urls.first())
            .map(String::as_str)
    }

    /// Mounts every resource on `router`.
    ///
    /// # Panics
    ///
    /// Panics if a URL is malformed or already taken on the router.
    pub fn register(self, mut router: Router) -> Router {
        let output = Arc::new(Output {
            representations: self.representations,
            default_mediatype: self.default_mediatype,
        });
        for (name, registered) in self.endpoints {
            let handler: BoxedHandler = Arc::new(Endpoint {
                name: name.clone(),
                handler: compose(registered.handler, &self.decorators),
                representations: Arc::new(registered.representations),
                output: Arc::clone(&output),
            });
            for url in &registered.urls {
                debug!(endpoint = %name, url = %url, "registering resource");
                router = router.mount(None, url, Arc::clone(&handler));
            }
        }
        router
    }
}

impl Default for Api {
    fn default() -> Self { Self::new() }
}

struct Output {
    representations: Representations,
    default_mediatype: Option<String>,
}

impl Output {
    /// `own` is the resource's representation table, tried before the
    /// API-wide one.
    fn respond(&self, reply: Reply, accept: Option<&str>, own: &Representations) -> Response {
        match reply {
            Reply::Response(response) => response,
            Reply::Error(err) => err.into_response(),
            Reply::Data { data, status, headers } => write_own(own, &data, status, &headers, accept)
                .unwrap_or_else(|| self.make_response(&data, status, &headers, accept))
                .unwrap_or_else(IntoResponse::into_response),
        }
    }

    /// Serializes `data` in the mediatype the client prefers.
    fn make_response(
        &self,
        data: &serde_json::Value,
        status: StatusCode,
        headers: &[(String, String)],
        accept: Option<&str>,
    ) -> Result<Response, Error> {
        let supported: Vec<&str> = self.representations.mediatypes().collect();
        let Some(mediatype) = best_match(accept, supported.as_slice(), self.default_mediatype.as_deref()) else {
            return Err(Error::NotAcceptable { accept: accept.unwrap_or_default().to_owned() });
        };
        debug!(%mediatype, "negotiated representation");

        match self.representations.get(&mediatype) {
            Some(writer) => stamp(writer(data, status, headers), &mediatype),
            None if mediatype == "text/plain" => Ok(output_text(data, status, headers)),
            None => {
                debug!(%mediatype, "no writer for negotiated mediatype");
                Err(Error::NotAcceptable { accept: accept.unwrap_or_default().to_owned() })
            }
        }
    }
}

/// Serializes through the resource's own table when the client asks for one
/// of its mediatypes. `None` defers to the API.
fn write_own(
    own: &Representations,
    data: &serde_json::Value,
    status: StatusCode,
    headers: &[(String, String)],
    accept: Option<&str>,
) -> Option<Result<Response, Error>> {
    if own.is_empty() {
        return None;
    }
    let supported: Vec<&str> = own.mediatypes().collect();
    let mediatype = best_match(accept, supported.as_slice(), None)?;
    let writer = own.get(&mediatype)?;
    debug!(%mediatype, "resource representation");
    Some(stamp(writer(data, status, headers), &mediatype))
}

/// The negotiated mediatype is the one and only `Content-Type`.
fn stamp(written: Result<Response, Error>, mediatype: &str) -> Result<Response, Error> {
    written.map(|mut response| {
        response.set_header("content-type", mediatype);
        response
    })
}

struct Endpoint {
    name: String,
    handler: BoxedResourceHandler,
    representations: Arc<Representations>,
    output: Arc<Output>,
}

impl ErasedHandler for Endpoint {
    fn call(&self, req: Request) -> BoxFuture<Response> {
        debug!(endpoint = %self.name, method = req.method(), path = req.path(), "request");
        let accept = req.header("accept").map(str::to_owned);
        let reply = self.handler.call(req);
        let output = Arc::clone(&self.output);
        let own = Arc::clone(&self.representations);
        Box::pin(async move { output.respond(reply.await, accept.as_deref(), &own) })
    }
}
