//! LLM collaborator status and provider configuration.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use kmp_chat::providers;
use kmp_chat::{LLMConfigResponse, LLMConfigUpdate, LLMProvider, LlmStatus, TestKeyRequest};
use tracing::{info, warn};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/llm/status", get(get_status))
        .route("/llm/config", get(get_config).put(update_config))
        .route("/llm/config/test", post(test_key))
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<LlmStatus> {
    Json(state.llm_config.read().status())
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<LLMConfigResponse> {
    Json(state.llm_config.read().to_response())
}

/// PUT /api/llm/config. Applies to the next collaborator call without a
/// restart.
async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LLMConfigUpdate>,
) -> impl IntoResponse {
    let mut config = state.llm_config.write();
    config.apply_update(&update);

    if let Err(e) = config.save() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("Failed to save config: {}", e) })),
        );
    }
    info!(
        "LLM config updated, active provider: {}",
        config
            .resolve()
            .map(|r| r.provider.to_string())
            .unwrap_or_else(|| "none".into())
    );

    (
        StatusCode::OK,
        Json(serde_json::to_value(config.to_response()).unwrap_or_default()),
    )
}

async fn test_key(Json(req): Json<TestKeyRequest>) -> impl IntoResponse {
    let Some(provider) = LLMProvider::parse(&req.provider) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": format!("Unknown provider: {}", req.provider),
            })),
        );
    };

    match providers::test_api_key(provider, req.api_key.trim()).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))),
        Err(e) => {
            warn!("API key test for {} failed: {}", provider, e);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}
