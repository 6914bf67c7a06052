//! Organization pulse announcements.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use kmp_core::error::require_text;
use kmp_core::Error;
use kmp_store::PulseUpdate;
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_DAYS: u32 = 5;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/pulse", get(list_pulse).post(create_pulse))
}

#[derive(Debug, Deserialize)]
pub struct PulseQuery {
    pub days: Option<u32>,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePulseRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub department: String,
}

/// GET /api/pulse?days=&department=
///
/// Last 5 days by default.
async fn list_pulse(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PulseQuery>,
) -> ApiResult<Vec<PulseUpdate>> {
    let days = query.days.unwrap_or(DEFAULT_DAYS);
    let mut updates = state.store.recent_pulse_updates(days)?;
    if let Some(department) = query.department.filter(|d| !d.trim().is_empty()) {
        updates.retain(|u| u.department == department);
    }
    Ok(Json(updates))
}

async fn create_pulse(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePulseRequest>,
) -> Result<(StatusCode, Json<PulseUpdate>), ApiError> {
    require_text("title", &req.title)?;
    require_text("content", &req.content)?;

    let id = state
        .store
        .put_pulse_update(req.title.trim(), req.content.trim(), req.department.trim())?;
    let update = state
        .store
        .scan_pulse()?
        .into_iter()
        .find(|u| u.id == id)
        .ok_or_else(|| Error::Internal(format!("pulse update {} vanished after insert", id)))?;
    Ok((StatusCode::CREATED, Json(update)))
}
