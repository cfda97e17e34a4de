//! Cache and snapshot administration.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::analyze::validation::validate_username;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    pub cleared: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheInvalidateResponse {
    pub username: String,
    pub invalidated: bool,
}

#[derive(Debug, Serialize)]
pub struct SnapshotDeleteResponse {
    pub username: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct SnapshotListResponse {
    pub count: usize,
    pub usernames: Vec<String>,
}

/// DELETE /cache
pub async fn handle_clear_cache(
    State(state): State<AppState>,
) -> Result<Json<CacheClearResponse>, AppError> {
    let cleared = state.cache.clear().await?;
    info!("Cleared {cleared} cache entries");
    Ok(Json(CacheClearResponse { cleared }))
}

/// DELETE /cache/:username
pub async fn handle_invalidate_cache(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<CacheInvalidateResponse>, AppError> {
    let username = validate_username(&username)?;
    let invalidated = state.cache.invalidate(&username).await?;
    Ok(Json(CacheInvalidateResponse {
        username,
        invalidated,
    }))
}

/// GET /snapshots
pub async fn handle_list_snapshots(
    State(state): State<AppState>,
) -> Result<Json<SnapshotListResponse>, AppError> {
    let usernames = state.snapshots.list().await?;
    Ok(Json(SnapshotListResponse {
        count: usernames.len(),
        usernames,
    }))
}

/// DELETE /snapshots/:username
///
/// Drops the stored snapshot and the cached analysis, so the next request
/// fetches fresh data.
pub async fn handle_delete_snapshot(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<SnapshotDeleteResponse>, AppError> {
    let username = validate_username(&username)?;
    let deleted = state.snapshots.delete(&username).await?;
    state.cache.invalidate(&username).await?;
    info!("Deleted snapshot for {username}: {deleted}");
    Ok(Json(SnapshotDeleteResponse { username, deleted }))
}
