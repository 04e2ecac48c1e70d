// src/runtime.rs

use crate::{
    assistant::{AssistantRelay, AssistantReply, AssistantRequest},
    config::Config,
    error::RelayError,
    judge0::{ExecuteCodeRequest, Judge0Relay},
    piston::{PistonRelay, PistonRequest, PistonResponse},
    transport::{ReqwestTransport, Upstream},
};

use axum::debug_handler;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header::CONTENT_TYPE, Method, Request},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

/* ---------------- state ---------------- */

/// Relays shared by all handlers. Each call is independent; nothing in here
/// is mutated after construction.
#[derive(Clone)]
pub struct AppState {
    judge0: Arc<Judge0Relay>,
    piston: Arc<PistonRelay>,
    assistant: Arc<AssistantRelay>,
}

impl AppState {
    pub fn new(cfg: &Config, upstream: Upstream) -> Self {
        Self {
            judge0: Arc::new(Judge0Relay::new(cfg, upstream.clone())),
            piston: Arc::new(PistonRelay::new(cfg, upstream.clone())),
            assistant: Arc::new(AssistantRelay::new(cfg, upstream)),
        }
    }
}

/// Production upstream: reqwest with the configured per-call deadline.
pub fn default_upstream(cfg: &Config) -> Upstream {
    Upstream::new(Arc::new(ReqwestTransport::new()), cfg.timeouts.upstream())
}

/* ---------------- server ---------------- */

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/api/execute-code", post(execute_code))
        .route("/api/execute-code/:token", get(submission_status))
        .route("/api/execute", post(execute_piston))
        .route("/api/assistant", post(ask_assistant))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        path = %req.uri().path(),
                    )
                })
                .on_response(|res: &Response, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = res.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "request completed"
                    );
                }),
        )
}

pub async fn serve(cfg: Config) -> anyhow::Result<()> {
    for name in cfg.missing_secrets() {
        tracing::warn!("{} is not set; the relays that need it will answer 500", name);
    }

    let app = router(AppState::new(&cfg, default_upstream(&cfg)));

    let socket: SocketAddr = cfg.server.addr.parse()?;
    let listener = TcpListener::bind(socket).await?;

    tracing::info!("codex-relay listening on http://{}", socket);

    axum::serve(listener, app).await?;
    Ok(())
}

/* ---------------- endpoints ---------------- */

async fn health() -> &'static str {
    "ok"
}

/// Well-formed JSON that lacks a field or has the wrong types is the caller's
/// mistake (400). Anything else unreadable is a local failure (500).
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RelayError> {
    payload.map(|Json(v)| v).map_err(|rejection| match rejection {
        JsonRejection::JsonDataError(err) => RelayError::BadRequest(err.body_text()),
        other => RelayError::Internal(other.body_text()),
    })
}

#[debug_handler]
async fn execute_code(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteCodeRequest>, JsonRejection>,
) -> Result<Json<Value>, RelayError> {
    let req = body(payload)?;
    state.judge0.submit(&req).await.map(Json)
}

#[debug_handler]
async fn submission_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, RelayError> {
    state.judge0.status(&token).await.map(Json)
}

#[debug_handler]
async fn execute_piston(
    State(state): State<AppState>,
    payload: Result<Json<PistonRequest>, JsonRejection>,
) -> Result<Json<PistonResponse>, RelayError> {
    let req = body(payload)?;
    state.piston.execute(&req).await.map(Json)
}

#[debug_handler]
async fn ask_assistant(
    State(state): State<AppState>,
    payload: Result<Json<AssistantRequest>, JsonRejection>,
) -> Result<Json<AssistantReply>, RelayError> {
    let req = body(payload)?;
    let reply = state.assistant.ask(&req.prompt).await?;
    Ok(Json(AssistantReply::new(reply)))
}
