//! HTTP server hosting the extraction handlers.
//!
//! Each accepted connection is served by its own task. A request whose path
//! cannot be normalized (not UTF-8 once decoded, or climbing above the root)
//! gets 400 before any route is tried. A request that no route matches gets
//! 404; a request whose configuration cannot be resolved makes the service
//! return an error, which closes the connection without a response.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::archive::ArchiveBackend;
use crate::error::HandlerError;
use crate::request::RequestInfo;
use crate::router::Router;

pub struct Server<B> {
    listener: TcpListener,
    router: Arc<Router<B>>,
}

impl<B: ArchiveBackend + 'static> Server<B> {
    /// Bind the listening socket; port 0 picks a free port
    pub async fn bind(addr: SocketAddr, router: Router<B>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router: Arc::new(router),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails
    pub async fn run(self) -> std::io::Result<()> {
        info!("Listening on http://{}", self.local_addr()?);

        loop {
            let (stream, peer) = self.listener.accept().await?;
            let io = TokioIo::new(stream);
            let router = Arc::clone(&self.router);

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let router = Arc::clone(&router);
                    async move { handle_request(req, router).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer, "Connection closed: {:?}", err);
                }
            });
        }
    }
}

async fn handle_request<B: ArchiveBackend, T>(
    req: Request<T>,
    router: Arc<Router<B>>,
) -> Result<Response<Full<Bytes>>, HandlerError> {
    let info = RequestInfo::from_request(&req);

    if info.decoded_path().is_none() {
        warn!(uri = %info.uri, "Rejecting request path outside the root");
        return empty_response(StatusCode::BAD_REQUEST);
    }

    let Some(handler) = router.find(&info) else {
        debug!(uri = %info.uri, "No route matches request");
        return empty_response(StatusCode::NOT_FOUND);
    };

    let response = handler.handle(&info).await;
    match &response {
        Ok(resp) => info!(
            method = %info.method,
            uri = %info.uri,
            status = resp.status().as_u16(),
            "Request served"
        ),
        Err(e) => error!(method = %info.method, uri = %info.uri, "Aborting request: {}", e),
    }
    response
}

fn empty_response(status: StatusCode) -> Result<Response<Full<Bytes>>, HandlerError> {
    Ok(Response::builder()
        .status(status)
        .header(hyper::header::CONTENT_LENGTH, 0)
        .body(Full::new(Bytes::new()))?)
}
