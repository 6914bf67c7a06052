//! Knowledge collection sessions.
//!
//! Each handler locks only its own session; LLM calls for one user never
//! block another.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kmp_collect::{Author, SessionReply, SessionSnapshot};
use kmp_core::error::require_text;
use kmp_core::Error;
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::state::{AppState, SharedSession};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/start", post(start_session))
        .route("/sessions/{id}/answer", post(answer_session))
        .route("/sessions/{id}/reset", post(reset_session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub text: String,
    #[serde(default)]
    pub employee_name: String,
    #[serde(default)]
    pub department: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    #[serde(default)]
    pub text: String,
}

fn lookup(state: &AppState, id: &str) -> Result<SharedSession, ApiError> {
    state
        .session(id)
        .ok_or_else(|| ApiError(Error::NotFound(format!("session {}", id))))
}

/// POST /api/sessions: open an idle session.
async fn create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let id = state.create_session();
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": id,
            "maxTurns": state.config.collection.max_turns,
        })),
    )
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let session = lookup(&state, &id)?;
    let session = session.lock().await;
    Ok(Json(session.snapshot(state.config.collection.max_turns)))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    if !state.remove_session(&id) {
        return Err(ApiError(Error::NotFound(format!("session {}", id))));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/sessions/{id}/start: submit new knowledge text.
async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StartRequest>,
) -> ApiResult<SessionReply> {
    require_text("text", &req.text)?;
    let session = lookup(&state, &id)?;
    let author = Author {
        employee_name: req.employee_name.trim().to_string(),
        department: req.department.trim().to_string(),
    };

    let mut session = session.lock().await;
    let reply = session.start(&state.collector, &req.text, author).await?;
    Ok(Json(reply))
}

/// POST /api/sessions/{id}/answer: answer the pending question.
async fn answer_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<SessionReply> {
    let session = lookup(&state, &id)?;
    let mut session = session.lock().await;
    let reply = session.answer(&state.collector, &req.text).await?;
    Ok(Json(reply))
}

async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let session = lookup(&state, &id)?;
    let mut session = session.lock().await;
    session.reset();
    Ok(Json(session.snapshot(state.config.collection.max_turns)))
}
