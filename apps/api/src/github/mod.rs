//! GitHub REST API access.
//!
//! `ProfileSource` is the seam the analysis service depends on; `GitHubClient`
//! is the production implementation, tests substitute fixed snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::snapshot::AnalysisSnapshot;

pub mod auth;
pub mod client;
pub mod tree;

pub use client::GitHubClient;

pub const USER_AGENT: &str = concat!("gitscout-api/", env!("CARGO_PKG_VERSION"));
pub const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("rate limit exceeded")]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Fetches everything the analyzer needs about one user.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch(&self, username: &str) -> Result<AnalysisSnapshot, GitHubError>;
}
