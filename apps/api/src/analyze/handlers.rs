//! Axum route handlers for profile analysis.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::analyze::validation::normalize_github_input;
use crate::errors::AppError;
use crate::models::snapshot::AnalyzeResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub github_input: String,
}

/// POST /analyze
///
/// Accepts a username or profile URL. Invalid input is rejected before any
/// GitHub call is made.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let username = normalize_github_input(&request.github_input)?;
    let request_id = Uuid::new_v4().simple().to_string()[..8].to_string();
    info!("[{request_id}] Analyze request for {username}");

    let response = state.analysis.analyze(&username).await?;

    info!(
        "[{request_id}] Done in {}ms (cache: {})",
        response.performance.elapsed_ms, response.performance.from_cache
    );
    Ok(Json(response))
}
