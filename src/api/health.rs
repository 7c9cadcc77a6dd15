use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler.
/// Returns JSON with status and config summary.
pub fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "chat-relay is running",
        "config": {
            "model": config.chat.model,
            "rate_limit": {
                "enabled": config.rate_limit.enabled,
                "max_requests": config.rate_limit.max_requests,
                "window_secs": config.rate_limit.window_secs,
            },
            "features": {
                "log_level": config.features.log_level,
            }
        }
    }))
}
