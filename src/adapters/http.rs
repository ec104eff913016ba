use crate::core::runner::{JobQueue, JobStatus};
use crate::domain::model::{BookingRequest, BrowserProfile};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const INDEX_PAGE: &str = include_str!("index.html");

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobQueue>,
    pub default_profile: BrowserProfile,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct RunParams {
    browser_type: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/run-scraper", post(run_scraper))
        .route("/jobs/{run_id}", get(job_status))
        .with_state(state)
}

/// 啟動 HTTP 服務，直到收到 Ctrl-C
pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("🚀 HTTP intake listening on {}", bind);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("HTTP intake shutting down");
        })
        .await
}

/// 手動送出測試工作的表單，預設勾選設定檔中的瀏覽器
async fn index(State(state): State<AppState>) -> Html<String> {
    let checked = |profile: BrowserProfile| {
        if state.default_profile == profile {
            "checked"
        } else {
            ""
        }
    };
    Html(
        INDEX_PAGE
            .replace("{{chromium_checked}}", checked(BrowserProfile::Chromium))
            .replace("{{firefox_checked}}", checked(BrowserProfile::Firefox)),
    )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn run_scraper(
    State(state): State<AppState>,
    Query(params): Query<RunParams>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: BookingRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("Rejected booking request: {}", e);
        ApiError::bad_request("Invalid JSON")
    })?;

    let profile = match params.browser_type.as_deref() {
        Some(name) => name
            .parse::<BrowserProfile>()
            .map_err(|_| ApiError::bad_request(format!("Unknown browser type: {}", name)))?,
        None => state.default_profile,
    };

    let run_id = state.jobs.enqueue(request, profile).await;
    tracing::info!("Queued booking {} with {} browser", run_id, profile);

    Ok(Json(json!({
        "status": "Scraper started",
        "timestamp": run_id,
    })))
}

async fn job_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    state
        .jobs
        .status(&run_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Job {} not found", run_id)))
}
