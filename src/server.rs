//! HTTP server and graceful shutdown.
//!
//! Connections are served by hyper's auto builder, so clients may speak
//! HTTP/1.1 or HTTP/2. Each request body is read in full before routing;
//! handlers and argument parsers only ever see buffered bytes.
//!
//! On SIGTERM or Ctrl-C the accept loop stops, in-flight connections run to
//! completion, and [`Server::serve`] returns.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;

/// The HTTP server.
///
/// ```rust,no_run
/// use tsu_restful::{Router, Server};
///
/// # async fn run() -> Result<(), tsu_restful::Error> {
/// Server::bind("127.0.0.1:5000").serve(Router::new()).await
/// # }
/// ```
pub struct Server {
    addr: String,
}

impl Server {
    /// Remembers `addr`; nothing is bound until [`serve`](Server::serve).
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `signal` resolves, then drains.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()> + Send,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(&self.addr).await?;
        let local = listener.local_addr()?;
        let router = Arc::new(router);
        let mut connections = JoinSet::new();

        info!(addr = %local, "tsu-restful listening");

        tokio::pin!(signal);
        loop {
            tokio::select! {
                biased;

                () = &mut signal => {
                    info!(in_flight = connections.len(), "shutting down, draining connections");
                    break;
                }

                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!("accept failed: {e}");
                            continue;
                        }
                    };
                    connections.spawn(serve_connection(Arc::clone(&router), stream, peer));
                }

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        while connections.join_next().await.is_some() {}
        info!("tsu-restful stopped");
        Ok(())
    }
}

async fn serve_connection(router: Arc<Router>, stream: tokio::net::TcpStream, peer: SocketAddr) {
    let svc = service_fn(move |req| {
        let router = Arc::clone(&router);
        async move { Ok::<_, Infallible>(dispatch(&router, req).await) }
    });
    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), svc)
        .await
    {
        warn!(%peer, "connection closed with error: {e}");
    }
}

/// Buffers the body, routes, and converts the response for hyper.
async fn dispatch(router: &Router, req: hyper::Request<Incoming>) -> http::Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!("failed to read request body: {e}");
            return Error::abort(StatusCode::BAD_REQUEST, "Failed to read request body")
                .into_response()
                .into_inner();
        }
    };

    let response: Response = router.call(Request::from_parts(parts, body)).await;
    response.into_inner()
}

/// Resolves on the first SIGTERM or Ctrl-C.
///
/// If a handler cannot be installed that signal is logged and ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;

    async fn pong(_req: Request) -> &'static str {
        "pong"
    }

    #[tokio::test]
    async fn stops_when_the_signal_fires() {
        let router = Router::new().on(Method::Get, "/ping", pong);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(
            Server::bind("127.0.0.1:0").serve_with_shutdown(router, async {
                let _ = rx.await;
            }),
        );
        tx.send(()).ok();
        let result = server.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn bad_address_is_an_error() {
        let result = Server::bind("not an address").serve_with_shutdown(Router::new(), async {}).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
