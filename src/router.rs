//! Radix-tree request router.
//!
//! One tree per HTTP method, plus one for routes that take every method.
//! O(path-length) lookup. You register a path, you get a handler.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup, let an [`Api`](crate::Api) register its
/// resources on it, then pass it to [`Server::serve`](crate::Server::serve).
/// Method-specific routes win over [`any`](Router::any) routes on the same
/// path.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    any: MatchitRouter<BoxedHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), any: MatchitRouter::new() }
    }

    /// Registers a handler for a method + path pair. Returns `self` for
    /// chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust
    /// # use tsu_restful::{Method, Request, Response, Router};
    /// # async fn health(_: Request) -> Response { Response::text("ok") }
    /// # async fn version(_: Request) -> &'static str { "1.0" }
    /// Router::new()
    ///     .on(Method::Get, "/healthz", health)
    ///     .on(Method::Get, "/version/{component}", version);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or conflicts with an existing route.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.mount(Some(method), path, handler.into_boxed_handler())
    }

    /// Registers a handler for every method on `path`. The handler decides
    /// which methods it answers.
    pub fn any(self, path: &str, handler: impl Handler) -> Self {
        self.mount(None, path, handler.into_boxed_handler())
    }

    pub(crate) fn mount(mut self, method: Option<Method>, path: &str, handler: BoxedHandler) -> Self {
        let tree = match method {
            Some(method) => self.routes.entry(method).or_default(),
            None => &mut self.any,
        };
        tree.insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: &str,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let specific = method.parse::<Method>().ok().and_then(|m| self.routes.get(&m));
        let matched = specific
            .and_then(|tree| tree.at(path).ok())
            .or_else(|| self.any.at(path).ok())?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Routes one request and produces one response; `404` when no route
    /// matches.
    ///
    /// The server calls this for every request. Tests can call it directly
    /// to exercise the whole stack in-process.
    pub async fn call(&self, mut req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.set_params(params);
                req.decode_multipart().await;
                handler.call(req).await
            }
            None => {
                debug!(method = req.method(), path = req.path(), "no route");
                Response::status(StatusCode::NOT_FOUND)
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
