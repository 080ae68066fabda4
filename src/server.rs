//! REST endpoints for the two pipeline phases.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{DocumentError, PipelineError};
use crate::pipeline::PayslipService;
use crate::template::CompanyTemplate;

/// Headroom above the service's upload limit, so oversize uploads reach
/// upload validation and get a JSON error instead of a bare 413.
const UPLOAD_LIMIT_SLACK: usize = 64 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PayslipService>,
    pub template: Arc<CompanyTemplate>,
}

/// Build the Axum router with the health, preview and send routes.
pub fn api_routes(service: Arc<PayslipService>, template: Arc<CompanyTemplate>) -> Router {
    let body_limit = DefaultBodyLimit::max(service.max_upload_bytes().saturating_add(UPLOAD_LIMIT_SLACK));
    let state = AppState { service, template };

    Router::new()
        .route("/api/health", get(health))
        .route("/api/process/preview", post(preview))
        .route("/api/process/send", post(send))
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn company_json(template: &CompanyTemplate) -> serde_json::Value {
    json!({
        "company_id": template.company_id,
        "company_name": template.company_name,
    })
}

/// Raw PDF body in, ordered page results plus a process id out.
async fn preview(State(state): State<AppState>, body: Bytes) -> Result<Json<serde_json::Value>, ApiError> {
    let template = &state.template;
    let preview = state
        .service
        .start_extraction(body.to_vec(), &template.name_crop_area, &template.employee_emails)
        .await?;

    Ok(Json(json!({
        "success": true,
        "process_id": preview.correlation_id,
        "preview": preview.results,
        "company": company_json(template),
    })))
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    process_id: Uuid,
}

async fn send(
    State(state): State<AppState>,
    Json(body): Json<SendRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = state.service.dispatch(body.process_id).await?;

    Ok(Json(json!({
        "success": true,
        "email_results": report.outcomes,
        "sent_count": report.sent_count,
        "failed_count": report.failed_count,
        "company": company_json(&state.template),
    })))
}

/// Maps pipeline errors onto HTTP statuses.
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            PipelineError::InvalidUpload(_)
            | PipelineError::Document(DocumentError::Decode(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        }

        (
            status,
            Json(json!({
                "success": false,
                "error": self.0.to_string(),
            })),
        )
            .into_response()
    }
}
