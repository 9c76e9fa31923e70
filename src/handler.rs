//! Handler traits and type erasure.
//!
//! Two kinds of async functions are stored behind trait objects:
//!
//! - router handlers, `async fn(Request) -> impl IntoResponse`, mounted
//!   directly on a [`Router`](crate::Router);
//! - resource handlers, `async fn(Request) -> impl IntoReply`, mounted on a
//!   [`Resource`](crate::Resource) verb. Their output still has to go through
//!   marshaling and content negotiation, so they produce a [`Reply`] rather
//!   than a finished response.
//!
//! ```text
//! async fn get(req: Request) -> Value { … }        ← user writes this
//!        ↓ Resource::new("todo").get(get)
//! get.into_boxed_resource_handler()                ← blanket impl
//!        ↓
//! Arc::new(ReplyFn(get))                           ← stored as BoxedResourceHandler
//!        ↓
//! handler.call(req)  at request time               ← one vtable dispatch
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::reply::{IntoReply, Reply};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future.
///
/// `Send + 'static` let tokio move the future across worker threads.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface for router handlers.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<Response>;
}

/// A type-erased router handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Internal dispatch interface for resource handlers and middleware layers.
#[doc(hidden)]
pub trait ErasedResourceHandler {
    fn call(&self, req: Request) -> BoxFuture<Reply>;
}

/// A type-erased resource handler, possibly already wrapped in middleware.
#[doc(hidden)]
pub type BoxedResourceHandler = Arc<dyn ErasedResourceHandler + Send + Sync + 'static>;

// ── Public traits ─────────────────────────────────────────────────────────────

/// Implemented for every valid router handler:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::SealedHandler + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// Implemented for every valid resource verb handler:
///
/// ```text
/// async fn name(req: Request) -> impl IntoReply
/// ```
///
/// Sealed like [`Handler`].
pub trait ResourceHandler: private::SealedResourceHandler + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_resource_handler(self) -> BoxedResourceHandler;
}

mod private {
    pub trait SealedHandler {}
    pub trait SealedResourceHandler {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::SealedHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(ResponseFn(self))
    }
}

impl<F, Fut, R> private::SealedResourceHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
}

impl<F, Fut, R> ResourceHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn into_boxed_resource_handler(self) -> BoxedResourceHandler {
        Arc::new(ReplyFn(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

struct ResponseFn<F>(F);

impl<F, Fut, R> ErasedHandler for ResponseFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Response> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

struct ReplyFn<F>(F);

impl<F, Fut, R> ErasedResourceHandler for ReplyFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Reply> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_reply() })
    }
}
