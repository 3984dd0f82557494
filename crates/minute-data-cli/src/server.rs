use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use minute_data_core::request::{
    DEFAULT_LOOKBACK_MINUTES, MAX_LOOKBACK_MINUTES, MIN_LOOKBACK_MINUTES,
};
use minute_data_core::result::BatchResponse;
use minute_data_providers::batch::BatchRunner;
use minute_data_providers::error::BatchError;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<BatchRunner>,
}

#[derive(Debug, Deserialize)]
pub struct MinuteDataQuery {
    /// Comma-separated symbols, e.g. `AAPL,MSFT`.
    pub symbols: String,
    #[serde(default = "default_minutes")]
    pub minutes: u32,
}

fn default_minutes() -> u32 {
    DEFAULT_LOOKBACK_MINUTES
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<BatchError> for ApiError {
    fn from(e: BatchError) -> Self {
        match e {
            BatchError::InvalidRequest(e) => ApiError::BadRequest(e.to_string()),
            BatchError::Config(msg) => {
                error!("Batch rejected, provider misconfigured: {msg}");
                ApiError::Internal(msg)
            }
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn minute_data(
    State(state): State<AppState>,
    query: Result<Query<MinuteDataQuery>, QueryRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if !(MIN_LOOKBACK_MINUTES..=MAX_LOOKBACK_MINUTES).contains(&query.minutes) {
        return Err(ApiError::BadRequest(format!(
            "minutes must be between {MIN_LOOKBACK_MINUTES} and {MAX_LOOKBACK_MINUTES}"
        )));
    }

    let response = state.runner.run(&query.symbols, query.minutes).await?;
    Ok(Json(response))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/.well-known/health", get(health))
        .route("/minute-data", get(minute_data))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("server error")
}
