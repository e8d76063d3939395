//! HTTP surface
//!
//! `GET /scrape?url=<target>` returns the page metadata or one of three
//! fixed error bodies. `GET /health` is a liveness check.

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::handler::ScrapeHandler;
use crate::utils::{ErrorCategory, ScrapeError};

/// Successful scrapes are cacheable for an hour, stale for a day
pub const SUCCESS_CACHE_CONTROL: &str = "public, s-maxage=3600, stale-while-revalidate=86400";

const ERROR_CACHE_CONTROL: &str = "no-store";

/// Build the router serving the scrape endpoint
pub fn router(handler: ScrapeHandler) -> Router {
    Router::new()
        .route("/scrape", get(scrape))
        .route("/health", get(health))
        .with_state(handler)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn scrape(State(handler): State<ScrapeHandler>, RawQuery(query): RawQuery) -> Response {
    let url = query.as_deref().and_then(url_param);

    match handler.handle(url.as_deref()).await {
        Ok(metadata) => (
            [(header::CACHE_CONTROL, HeaderValue::from_static(SUCCESS_CACHE_CONTROL))],
            Json(metadata),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// First `url` parameter of a raw query string, percent-decoded
fn url_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}

impl ErrorCategory {
    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorCategory::InvalidUrl => StatusCode::BAD_REQUEST,
            ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCategory::Failure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; internal causes are only logged
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ErrorCategory::InvalidUrl => "Invalid URL",
            ErrorCategory::Timeout => "Timeout",
            ErrorCategory::Failure => "Unable to complete scrape",
        }
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let category = self.category();
        (
            category.status_code(),
            [(header::CACHE_CONTROL, HeaderValue::from_static(ERROR_CACHE_CONTROL))],
            Json(json!({ "error": category.message() })),
        )
            .into_response()
    }
}

/// Handle to a running server
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        self.task.await??;
        Ok(())
    }
}

/// Serve `router` on an already bound listener
///
/// Non-blocking: the server runs in a background task until
/// [`ServerHandle::shutdown`] is called.
pub async fn serve(listener: TcpListener, router: Router) -> anyhow::Result<ServerHandle> {
    let local_addr = listener.local_addr()?;
    let shutdown = CancellationToken::new();

    let signal = shutdown.clone();
    let task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .await
    });

    info!("pagemeta server listening on {}", local_addr);
    Ok(ServerHandle {
        local_addr,
        shutdown,
        task,
    })
}
