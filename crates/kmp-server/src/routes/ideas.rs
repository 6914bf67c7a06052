//! Ideas and initiatives: proposal, status workflow and support.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use kmp_core::error::require_text;
use kmp_core::Error;
use kmp_store::{Idea, IdeaStatus};
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ideas", get(list_ideas).post(create_idea))
        .route("/ideas/{id}/status", put(update_status))
        .route("/ideas/{id}/support", post(support_idea))
}

#[derive(Debug, Deserialize)]
pub struct IdeaFilter {
    pub status: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdeaRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub employee_name: String,
    #[serde(default)]
    pub department: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportRequest {
    pub employee_name: String,
}

/// GET /api/ideas?status=&department=
///
/// Newest first.
async fn list_ideas(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<IdeaFilter>,
) -> ApiResult<Vec<Idea>> {
    let status: Option<IdeaStatus> = match filter.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(s.parse()?),
    };
    let department = filter.department.filter(|d| !d.trim().is_empty());

    let ideas = state
        .store
        .scan_ideas()?
        .into_iter()
        .filter(|idea| status.map_or(true, |s| idea.status == s))
        .filter(|idea| department.as_ref().map_or(true, |d| &idea.department == d))
        .collect();
    Ok(Json(ideas))
}

async fn create_idea(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateIdeaRequest>,
) -> Result<(StatusCode, Json<Idea>), ApiError> {
    require_text("title", &req.title)?;
    require_text("description", &req.description)?;

    let id = state.store.put_idea(
        req.title.trim(),
        req.description.trim(),
        req.employee_name.trim(),
        req.department.trim(),
    )?;
    let idea = state
        .store
        .get_idea(&id)?
        .ok_or_else(|| Error::Internal(format!("idea {} vanished after insert", id)))?;
    Ok((StatusCode::CREATED, Json(idea)))
}

/// PUT /api/ideas/{id}/status: move an idea through its workflow.
async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Idea> {
    let status: IdeaStatus = req.status.trim().parse()?;
    state.store.set_idea_status(&id, status)?;
    state
        .store
        .get_idea(&id)?
        .map(Json)
        .ok_or_else(|| ApiError(Error::NotFound(format!("idea {}", id))))
}

/// POST /api/ideas/{id}/support: idempotent per employee.
async fn support_idea(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SupportRequest>,
) -> ApiResult<serde_json::Value> {
    require_text("employeeName", &req.employee_name)?;
    let supporters = state.store.add_supporter(&id, req.employee_name.trim())?;
    let count = supporters.len();
    Ok(Json(serde_json::json!({
        "id": id,
        "supporters": supporters,
        "count": count,
    })))
}
