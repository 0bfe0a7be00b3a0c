use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use futures::future::join_all;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::provider::SignerProvider;
use crate::rpc::envelope::{JsonRpcError, Request, Response};
use crate::utils::metrics::METRICS;

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;

/// Serves a `SignerProvider` as a local JSON-RPC endpoint.
///
/// - `POST /` single request or batch
/// - `GET /health`, `GET /metrics`
pub struct ProxyServer {
    addr: SocketAddr,
    provider: SignerProvider,
}

impl ProxyServer {
    pub fn new(addr: SocketAddr, provider: SignerProvider) -> Self {
        Self { addr, provider }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", post(json_rpc_endpoint))
            .route("/health", get(|| async { "ok" }))
            .route("/metrics", get(metrics_handler))
            .with_state(self.provider.clone())
    }

    /// Bind and serve until ctrl-c.
    pub async fn serve(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Starting JSON-RPC proxy on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            })
            .await?;
        Ok(())
    }
}

async fn metrics_handler() -> String {
    METRICS.render()
}

/// JSON-RPC router: a request object or a batch array.
///
/// The body is parsed here rather than by the `Json` extractor so malformed
/// JSON or a missing `Content-Type` still get a JSON-RPC error envelope.
/// Batch entries are started in array order, so transactions inside one batch
/// are queued in the order they were listed.
pub async fn json_rpc_endpoint(State(provider): State<SignerProvider>, body: Bytes) -> Json<Value> {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "rejecting unparsable request body");
            return Json(error_value(Value::Null, PARSE_ERROR, "Parse error"));
        }
    };
    match payload {
        Value::Array(items) if items.is_empty() => {
            Json(error_value(Value::Null, INVALID_REQUEST, "empty batch"))
        }
        Value::Array(items) => {
            let responses =
                join_all(items.into_iter().map(|item| handle_one(&provider, item))).await;
            Json(Value::Array(responses))
        }
        single => Json(handle_one(&provider, single).await),
    }
}

/// Serve one request object; well-formed JSON that is not a request gets
/// `-32600 Invalid Request`.
async fn handle_one(provider: &SignerProvider, payload: Value) -> Value {
    let id = payload.get("id").cloned().unwrap_or(Value::Null);
    let request: Request = match serde_json::from_value(payload) {
        Ok(r) => r,
        Err(_) => return error_value(id, INVALID_REQUEST, "Invalid Request"),
    };
    match provider.handle(request).await {
        Ok(resp) => to_value(resp),
        Err(e) => to_value(Response::error(id, e.to_rpc_error())),
    }
}

fn error_value(id: Value, code: i64, message: &str) -> Value {
    to_value(Response::error(id, JsonRpcError::new(code, message)))
}

fn to_value(resp: Response) -> Value {
    serde_json::to_value(resp).unwrap_or(Value::Null)
}
