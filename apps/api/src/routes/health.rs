use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service status plus the limits and backends this instance runs with.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "gitscout-api",
        "environment": config.environment,
        "capacity": {
            "max_repos_per_user": config.max_repos_per_user,
            "max_markdown_files": config.max_markdown_files,
            "cache_ttl_seconds": config.cache_ttl_seconds,
            "max_keywords": config.keyword_budget.max_total,
        },
        "backends": {
            "cache": state.cache.backend(),
            "snapshots": state.snapshots.backend(),
        },
        "llm_providers": state.reports.provider_names(),
    }))
}
