use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use super::{snapshot_key, SnapshotStore, StorageError};
use crate::models::snapshot::AnalysisSnapshot;

/// `{dir}/{username}.json`, pretty-printed.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path(&self, username: &str) -> PathBuf {
        self.dir.join(snapshot_key(username))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, snapshot: &AnalysisSnapshot) -> Result<(), StorageError> {
        let path = self.path(&snapshot.username);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?).await?;
        fs::rename(&tmp, &path).await?;
        info!("Saved snapshot {}", path.display());
        Ok(())
    }

    async fn load(&self, username: &str) -> Result<Option<AnalysisSnapshot>, StorageError> {
        match fs::read(self.path(username)).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, username: &str) -> Result<bool, StorageError> {
        match fs::remove_file(self.path(username)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::models::profile::Profile;

    fn snapshot(username: &str) -> AnalysisSnapshot {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        AnalysisSnapshot {
            username: username.to_string(),
            analyzed_at: at,
            profile: Profile {
                login: username.to_string(),
                name: None,
                bio: None,
                location: None,
                company: None,
                blog: None,
                avatar_url: None,
                html_url: None,
                followers: 1,
                following: 2,
                public_repos: 0,
                created_at: at,
                updated_at: at,
            },
            repositories: vec![],
        }
    }

    #[tokio::test]
    async fn test_save_load_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path()).await.unwrap();
        let mut snap = snapshot("octocat");
        store.save(&snap).await.unwrap();
        snap.profile.followers = 99;
        store.save(&snap).await.unwrap();
        let loaded = store.load("octocat").await.unwrap().unwrap();
        assert_eq!(loaded, snap);
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path()).await.unwrap();
        assert!(store.load("nobody").await.unwrap().is_none());
        assert!(!store.delete("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path()).await.unwrap();
        for name in ["zed", "alice", "bob"] {
            store.save(&snapshot(name)).await.unwrap();
        }
        assert_eq!(store.list().await.unwrap(), vec!["alice", "bob", "zed"]);
        assert!(store.delete("bob").await.unwrap());
        assert_eq!(store.list().await.unwrap(), vec!["alice", "zed"]);
    }
}
