//! HTTP front end
//!
//! ```text
//! GET /metrics  → one collection pass, 200 or 500
//! GET /healthz  → connectivity gate only, {"status": ...}
//! GET <other>   → informational text
//! ```

mod health;

pub use health::{HealthBody, HealthStatus};

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::domain::ports::GraphSource;
use crate::error::{Error, Result};
use crate::metrics::CollectionEngine;

/// Body served for every path other than the two endpoints.
pub const FALLBACK_BODY: &str = "This exporter only serves /metrics and /healthz\n";

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub engine: CollectionEngine,
    pub source: Arc<dyn GraphSource>,
}

impl AppState {
    pub fn new(engine: CollectionEngine, source: Arc<dyn GraphSource>) -> Self {
        Self { engine, source }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("definitions", &self.engine.store().len())
            .finish()
    }
}

fn response(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("text/plain"));
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

async fn metrics(state: &AppState) -> Response<Full<Bytes>> {
    let outcome = match state.engine.collect(state.source.as_ref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Scrape failed");
            return response(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", e.to_string());
        }
    };

    match outcome.encode() {
        Ok(body) => {
            let status = StatusCode::from_u16(outcome.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            response(status, &outcome.content_type(), body)
        }
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            response(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", e.to_string())
        }
    }
}

async fn healthz(state: &AppState) -> Response<Full<Bytes>> {
    let status = if state.engine.healthy(state.source.as_ref()).await {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let body = serde_json::to_vec(&HealthBody { status })
        .unwrap_or_else(|_| format!(r#"{{"status":"{}"}}"#, status).into_bytes());
    response(code, "application/json", body)
}

/// Route one request.
pub async fn handle(state: &AppState, method: &Method, path: &str) -> Response<Full<Bytes>> {
    info!("HTTP {} {}", method, path);

    if *method != Method::GET {
        return response(StatusCode::METHOD_NOT_ALLOWED, "text/plain", "method not allowed\n");
    }

    match path {
        "/metrics" => metrics(state).await,
        "/healthz" => healthz(state).await,
        _ => response(StatusCode::OK, "text/plain; charset=utf-8", FALLBACK_BODY),
    }
}

/// Accept connections until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = &mut shutdown => {
                info!("Metrics server shutting down");
                return Ok(());
            }
        };

        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let state = state.clone();
                async move {
                    let response = handle(&state, req.method(), req.uri().path()).await;
                    Ok::<_, Infallible>(response)
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%peer, error = %e, "Metrics server connection error");
            }
        });
    }
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn run(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!(%addr, error = %e, "Failed to bind metrics server");
        Error::Io(e)
    })?;

    info!("Metrics server listening on {}", addr);

    serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await
}
