use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::{Profile, Repository};

/// Everything fetched for one user in one analysis run.
/// Persisted as one JSON document per username and overwritten on re-analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub username: String,
    pub analyzed_at: DateTime<Utc>,
    pub profile: Profile,
    pub repositories: Vec<Repository>,
}

impl AnalysisSnapshot {
    pub fn partial_repositories(&self) -> usize {
        self.repositories
            .iter()
            .filter(|r| !r.partial_sections.is_empty())
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub elapsed_ms: u64,
    pub from_cache: bool,
    pub repositories_analyzed: usize,
    pub partial_repositories: usize,
}

/// Body of `POST /analyze`; also the shape held in the response cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub username: String,
    pub analyzed_at: DateTime<Utc>,
    pub profile: Profile,
    pub repositories: Vec<Repository>,
    pub performance: Performance,
}

impl AnalyzeResponse {
    pub fn from_snapshot(snapshot: AnalysisSnapshot, elapsed_ms: u64, from_cache: bool) -> Self {
        let partial_repositories = snapshot.partial_repositories();
        Self {
            performance: Performance {
                elapsed_ms,
                from_cache,
                repositories_analyzed: snapshot.repositories.len(),
                partial_repositories,
            },
            username: snapshot.username,
            analyzed_at: snapshot.analyzed_at,
            profile: snapshot.profile,
            repositories: snapshot.repositories,
        }
    }
}
