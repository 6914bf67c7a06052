//! Stored knowledge: listing, lookup and search.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use kmp_collect::{SearchMode, SearchResults};
use kmp_core::error::require_text;
use kmp_core::Error;
use kmp_store::KnowledgeRecord;
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/knowledge", get(list_knowledge))
        .route("/knowledge/search", get(search_knowledge))
        .route("/knowledge/{id}", get(get_knowledge))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub mode: SearchMode,
}

/// GET /api/knowledge: newest first, optionally one department.
async fn list_knowledge(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<KnowledgeRecord>> {
    let mut records = state.store.scan_knowledge()?;
    if let Some(department) = query.department.filter(|d| !d.trim().is_empty()) {
        records.retain(|r| r.department == department);
    }
    Ok(Json(records))
}

async fn get_knowledge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<KnowledgeRecord> {
    state
        .store
        .get_knowledge_record(&id)?
        .map(Json)
        .ok_or_else(|| ApiError(Error::NotFound(format!("knowledge {}", id))))
}

/// GET /api/knowledge/search?q=&mode=keyword|semantic
async fn search_knowledge(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<SearchResults> {
    require_text("q", &query.q)?;
    let results = state.collector.search(&query.q, query.mode).await?;
    Ok(Json(results))
}
