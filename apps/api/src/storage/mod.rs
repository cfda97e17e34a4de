//! Durable per-user snapshots, written behind every fresh analysis.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::snapshot::AnalysisSnapshot;

pub mod file;
pub mod s3;

pub use file::FileSnapshotStore;
pub use s3::S3SnapshotStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("object store error: {0}")]
    ObjectStore(String),
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Overwrites any previous snapshot for the same username.
    async fn save(&self, snapshot: &AnalysisSnapshot) -> Result<(), StorageError>;

    async fn load(&self, username: &str) -> Result<Option<AnalysisSnapshot>, StorageError>;

    /// Stored usernames, sorted.
    async fn list(&self) -> Result<Vec<String>, StorageError>;

    async fn delete(&self, username: &str) -> Result<bool, StorageError>;

    fn backend(&self) -> &'static str;
}

/// Usernames are validated before they get here; this only keeps keys path-safe.
pub(crate) fn snapshot_key(username: &str) -> String {
    let safe: String = username
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    format!("{safe}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_key() {
        assert_eq!(snapshot_key("Octo-Cat"), "octo-cat.json");
        assert_eq!(snapshot_key("../x"), "x.json");
    }
}
