//! Dashboard statistics and reference data.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use kmp_core::config::DEPARTMENTS;
use kmp_store::DashboardStats;

use super::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/departments", get(get_departments))
}

/// GET /api/stats: knowledge, idea and activity aggregates.
async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<DashboardStats> {
    let stats = DashboardStats::collect(state.store.as_ref())?;
    Ok(Json(stats))
}

async fn get_departments() -> Json<&'static [&'static str]> {
    Json(DEPARTMENTS)
}
