//! HTTP API for faucet service

use super::config::FaucetConfig;
use super::error::FaucetResult;
use super::service::{DispenseResponse, FaucetService, FaucetStatus};
use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FaucetService>,
    pub trust_proxy: bool,
}

/// Front-end switches taken from the config.
#[derive(Debug, Clone, Copy)]
pub struct RouterOptions {
    pub cors_enabled: bool,
    pub trust_proxy: bool,
    pub metrics_enabled: bool,
}

impl From<&FaucetConfig> for RouterOptions {
    fn from(config: &FaucetConfig) -> Self {
        Self {
            cors_enabled: config.cors_enabled,
            trust_proxy: config.trust_proxy,
            metrics_enabled: config.metrics_enabled,
        }
    }
}

/// Build the faucet router.
pub fn router(service: Arc<FaucetService>, options: RouterOptions) -> Router {
    let state = AppState {
        service,
        trust_proxy: options.trust_proxy,
    };

    let mut app = Router::new()
        .route("/", get(root_handler).post(raw_dispense_handler))
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/dispense", post(dispense_handler));

    if options.metrics_enabled {
        app = app.route("/metrics", get(metrics_handler));
    }

    let mut app = app.with_state(state).layer(TraceLayer::new_for_http());

    if options.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Dispense request
#[derive(Debug, Deserialize)]
pub struct DispenseRequest {
    pub address: String,
}

/// Success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub data: T,
    pub timestamp: String,
}

impl<T> SuccessResponse<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Identify the requester: first `X-Forwarded-For` hop behind a trusted
/// proxy, otherwise the socket peer.
pub fn client_origin(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(forwarded) = forwarded {
            return forwarded.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// `POST /` with the bare address as the body; replies with the tx hash.
pub async fn raw_dispense_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let origin = client_origin(&headers, peer.map(|ConnectInfo(addr)| addr), state.trust_proxy);

    match state.service.dispense(&origin, &body).await {
        Ok(response) => (StatusCode::OK, response.tx_hash.0).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Dispense handler
pub async fn dispense_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<DispenseRequest>,
) -> FaucetResult<Json<SuccessResponse<DispenseResponse>>> {
    let origin = client_origin(&headers, peer.map(|ConnectInfo(addr)| addr), state.trust_proxy);
    let response = state.service.dispense(&origin, &request.address).await?;
    Ok(Json(SuccessResponse::new(response)))
}

/// Status handler
pub async fn status_handler(
    State(state): State<AppState>,
) -> FaucetResult<Json<SuccessResponse<FaucetStatus>>> {
    let status = state.service.get_status().await?;
    Ok(Json(SuccessResponse::new(status)))
}

pub async fn metrics_handler(State(state): State<AppState>) -> FaucetResult<Response> {
    let text = state.service.metrics().gather_text()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Root handler with info
pub async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "faucet",
        "version": env!("CARGO_PKG_VERSION"),
        "faucet_address": state.service.faucet_address(),
        "dispense_amount": state.service.policy().dispense_amount,
        "endpoints": {
            "POST /": "Request funds; body is the target address",
            "POST /api/dispense": "Request funds with {\"address\": ...}",
            "GET /api/status": "Faucet status",
            "GET /health": "Health check",
            "GET /metrics": "Prometheus metrics"
        }
    }))
}
