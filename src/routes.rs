//! src/routes.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    engine::{run_generation, Dashboard, GENERATION_FAILED},
    error::GenerateError,
    lead_agent::LeadSource,
    settings::{Settings, Theme},
    view::{PageView, StatusFilter},
};

/// Everything one dashboard session needs.
pub struct AppState {
    pub dashboard: Mutex<Dashboard>,
    pub settings:  Mutex<Settings>,
    pub source:    Arc<dyn LeadSource>,
}

impl AppState {
    pub fn new(source: Arc<dyn LeadSource>, page_size: usize, settings: Settings) -> Self {
        Self {
            dashboard: Mutex::new(Dashboard::new(page_size)),
            settings: Mutex::new(settings),
            source,
        }
    }
}

pub type SharedState = Arc<AppState>;

// ── errors ─────────────────────────────────────────────────────────────
#[derive(Debug)]
pub struct ApiError {
    pub status:  StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("{err:#}");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        let status = match err {
            GenerateError::EmptyNiche => StatusCode::BAD_REQUEST,
            GenerateError::Busy       => StatusCode::CONFLICT,
            _                         => StatusCode::BAD_GATEWAY,
        };
        let message = match err {
            GenerateError::Busy => err.to_string(),
            _                   => GENERATION_FAILED.to_string(),
        };
        ApiError { status, message }
    }
}

// ── payloads ───────────────────────────────────────────────────────────
#[derive(Deserialize)]
pub struct GenerateRequest {
    niche: String,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    added: usize,
    view:  PageView,
}

#[derive(Deserialize)]
pub struct FilterRequest {
    status: StatusFilter,
}

#[derive(Serialize, Deserialize)]
pub struct ThemeBody {
    theme: Theme,
}

// ── router ─────────────────────────────────────────────────────────────
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health",                 get(health))
        .route("/leads",                  get(get_leads))
        .route("/leads/generate",         post(post_generate))
        .route("/leads/filter",           put(put_filter))
        .route("/leads/page/next",        post(post_next_page))
        .route("/leads/page/prev",        post(post_prev_page))
        .route("/leads/:id/toggle",       post(post_toggle))
        .route("/settings/theme",         get(get_theme).put(put_theme))
        .route("/settings/theme/toggle",  post(post_toggle_theme))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// ── GET /health ────────────────────────────────────────────────────────
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "service": "lead_agent" }))
}

// ── GET /leads ─────────────────────────────────────────────────────────
pub async fn get_leads(State(state): State<SharedState>) -> Json<PageView> {
    Json(state.dashboard.lock().await.view())
}

// ── POST /leads/generate ───────────────────────────────────────────────
pub async fn post_generate(
    State(state): State<SharedState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let added = run_generation(&state.dashboard, state.source.as_ref(), &req.niche).await?;
    let view = state.dashboard.lock().await.view();
    Ok(Json(GenerateResponse { added, view }))
}

// ── PUT /leads/filter ──────────────────────────────────────────────────
pub async fn put_filter(
    State(state): State<SharedState>,
    Json(req): Json<FilterRequest>,
) -> Json<PageView> {
    let mut dash = state.dashboard.lock().await;
    dash.select_filter(req.status);
    Json(dash.view())
}

// ── POST /leads/page/{next,prev} ───────────────────────────────────────
pub async fn post_next_page(State(state): State<SharedState>) -> Json<PageView> {
    let mut dash = state.dashboard.lock().await;
    dash.next_page();
    Json(dash.view())
}

pub async fn post_prev_page(State(state): State<SharedState>) -> Json<PageView> {
    let mut dash = state.dashboard.lock().await;
    dash.prev_page();
    Json(dash.view())
}

// ── POST /leads/:id/toggle ─────────────────────────────────────────────
pub async fn post_toggle(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<PageView> {
    let mut dash = state.dashboard.lock().await;
    // ids the store never issued, well-formed or not, leave it untouched
    let toggled = Uuid::parse_str(&id).ok().and_then(|id| dash.toggle_status(id));
    if let Some(status) = toggled {
        info!("lead {id} is now {status:?}");
    }
    Json(dash.view())
}

// ── /settings/theme ────────────────────────────────────────────────────
pub async fn get_theme(State(state): State<SharedState>) -> Json<ThemeBody> {
    let theme = state.settings.lock().await.theme();
    Json(ThemeBody { theme })
}

pub async fn put_theme(
    State(state): State<SharedState>,
    Json(body): Json<ThemeBody>,
) -> Result<Json<ThemeBody>, ApiError> {
    state.settings.lock().await.set_theme(body.theme)?;
    Ok(Json(body))
}

pub async fn post_toggle_theme(
    State(state): State<SharedState>,
) -> Result<Json<ThemeBody>, ApiError> {
    let theme = state.settings.lock().await.toggle_theme()?;
    Ok(Json(ThemeBody { theme }))
}
