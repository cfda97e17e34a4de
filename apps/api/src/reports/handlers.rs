//! Axum route handlers for candidate reports.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::analyze::validation::validate_username;
use crate::errors::AppError;
use crate::models::report::ReportResponse;
use crate::reports::generator::FULL_REPORT;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateReportRequest {
    pub username: String,
    #[serde(default = "default_report_type")]
    pub report_type: String,
    #[serde(default = "default_use_stored")]
    pub use_stored: bool,
}

fn default_report_type() -> String {
    FULL_REPORT.to_string()
}

fn default_use_stored() -> bool {
    true
}

/// POST /reports/generate
///
/// `use_stored` reads the last snapshot when there is one; otherwise the
/// profile is fetched fresh (and the snapshot rewritten).
pub async fn handle_generate_report(
    State(state): State<AppState>,
    Json(request): Json<GenerateReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    let username = validate_username(&request.username)?;
    if request.report_type != FULL_REPORT {
        return Err(AppError::Validation(format!(
            "unsupported report_type '{}'; only '{FULL_REPORT}' is available",
            request.report_type
        )));
    }

    let request_id = Uuid::new_v4().simple().to_string()[..8].to_string();
    info!("[{request_id}] Report request for {username} (use_stored: {})", request.use_stored);

    let (snapshot, from_snapshot) = state
        .analysis
        .snapshot_for_report(&username, request.use_stored)
        .await?;
    let response = state.reports.generate(&snapshot, from_snapshot).await;

    info!(
        "[{request_id}] Report for {username}: provider={} from_snapshot={from_snapshot}",
        response.provider
    );
    Ok(Json(response))
}
