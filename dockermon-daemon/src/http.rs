//! HTTP shell.
//!
//! A minimal `axum` router served on `http.bind`. It shares no state with
//! the alarm monitor and only reports liveness.
//!
//! | route | response |
//! |---|---|
//! | `GET /health` | `200 {"status":"ok"}` |
//! | anything else | `404 {"error":"Resource not found"}` |
//! | slower than [`REQUEST_TIMEOUT`] | `408 {"error":"The server is overloaded. Try later."}` |

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use dockermon_core::config::HttpConfig;

/// Upper bound on request handling time.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const NOT_FOUND_MESSAGE: &str = "Resource not found";
const TIMEOUT_MESSAGE: &str = "The server is overloaded. Try later.";

/// Router with the health route, the JSON 404 fallback and the request timeout.
pub fn router(request_timeout: Duration) -> Router {
    with_request_timeout(
        Router::new()
            .route("/health", get(health))
            .fallback(not_found),
        request_timeout,
    )
}

/// Wraps every route of `router` with the 408 timeout.
pub fn with_request_timeout(router: Router, request_timeout: Duration) -> Router {
    router.layer(middleware::from_fn_with_state(
        request_timeout,
        enforce_timeout,
    ))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": NOT_FOUND_MESSAGE })),
    )
}

async fn enforce_timeout(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(path = %path, timeout_ms = limit.as_millis() as u64, "request timed out");
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(json!({ "error": TIMEOUT_MESSAGE })),
            )
                .into_response()
        }
    }
}

/// Bind the HTTP listener and serve `router` in a background task.
///
/// Binding happens before returning so an unusable address fails startup.
///
/// # Errors
///
/// - `bind` is not a valid socket address
/// - The address cannot be bound
pub async fn spawn_server(bind: &str, router: Router) -> Result<(SocketAddr, JoinHandle<()>)> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http bind address '{}': {}", bind, e))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind http listener on {}: {}", addr, e))?;
    let local_addr = listener.local_addr()?;

    tracing::info!(bind = %local_addr, "http server listening");

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "http server stopped");
        }
    });

    Ok((local_addr, task))
}

/// Start the HTTP shell described by `config`.
pub async fn start(config: &HttpConfig) -> Result<(SocketAddr, JoinHandle<()>)> {
    spawn_server(&config.bind, router(REQUEST_TIMEOUT)).await
}
