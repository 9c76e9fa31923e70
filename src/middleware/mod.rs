//! Middleware layer.
//!
//! A [`Middleware`] wraps a resource handler: it receives the request and a
//! [`Next`] that runs everything inside it, and returns the [`Reply`].
//! Chains are composed once, when a resource is registered, and stored as a
//! single handler; nothing is re-wrapped per request.
//!
//! Within a chain the first middleware declared is the innermost:
//!
//! ```text
//! .decorate(Get, a).decorate(Get, b)
//!
//! Request → b → a → handler → a → b → Reply
//! ```
//!
//! ```rust
//! use http::StatusCode;
//! use tsu_restful::middleware::{Middleware, Next};
//! use tsu_restful::{Error, Reply, Request};
//!
//! let login_required = Middleware::new(|req: Request, next: Next| async move {
//!     if req.header("authorization").is_none() {
//!         return Reply::Error(Error::abort(StatusCode::UNAUTHORIZED, "login required"));
//!     }
//!     next.run(req).await
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedResourceHandler, ErasedResourceHandler};
use crate::reply::Reply;
use crate::request::Request;

type MiddlewareFn = dyn Fn(Request, Next) -> BoxFuture<Reply> + Send + Sync + 'static;

/// A wrapper around a resource handler.
#[derive(Clone)]
pub struct Middleware(Arc<MiddlewareFn>);

impl Middleware {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Reply> + Send + 'static,
    {
        Self(Arc::new(move |req: Request, next: Next| -> BoxFuture<Reply> {
            Box::pin(f(req, next))
        }))
    }

    /// Rewrites every reply coming out of the wrapped handler.
    pub fn map_reply(f: impl Fn(Reply) -> Reply + Send + Sync + 'static) -> Self {
        let f = Arc::new(f);
        Self::new(move |req, next: Next| {
            let f = Arc::clone(&f);
            async move { f(next.run(req).await) }
        })
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware(..)")
    }
}

/// The rest of the chain, handed to a middleware.
pub struct Next {
    inner: BoxedResourceHandler,
}

impl Next {
    /// Runs the wrapped handler (and any middleware inside this one).
    pub async fn run(self, req: Request) -> Reply {
        self.inner.call(req).await
    }
}

struct Layer {
    middleware: Middleware,
    inner: BoxedResourceHandler,
}

impl ErasedResourceHandler for Layer {
    fn call(&self, req: Request) -> BoxFuture<Reply> {
        let next = Next { inner: Arc::clone(&self.inner) };
        (self.middleware.0)(req, next)
    }
}

/// Wraps `handler` in `chain`, first element innermost.
pub(crate) fn compose(handler: BoxedResourceHandler, chain: &[Middleware]) -> BoxedResourceHandler {
    chain.iter().fold(handler, |inner, middleware| -> BoxedResourceHandler {
        Arc::new(Layer { middleware: middleware.clone(), inner })
    })
}
