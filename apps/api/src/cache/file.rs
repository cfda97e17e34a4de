use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use super::{sanitize_key, CacheError, Envelope, ResponseCache};

/// One JSON file per key under `dir`, each carrying its own expiry.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }

    async fn remove(path: &Path) -> Result<bool, CacheError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ResponseCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let path = self.path(key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = match serde_json::from_slice(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Dropping unreadable cache entry {}: {e}", path.display());
                Self::remove(&path).await?;
                return Ok(None);
            }
        };

        if Utc::now().timestamp() >= envelope.expires_at {
            debug!("Cache entry expired for key: {key}");
            Self::remove(&path).await?;
            return Ok(None);
        }
        Ok(Some(envelope.value))
    }

    async fn put(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError> {
        let envelope = Envelope {
            expires_at: Utc::now().timestamp() + ttl.as_secs() as i64,
            value: value.clone(),
        };
        // write-then-rename so readers never see a torn file
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&envelope)?).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool, CacheError> {
        Self::remove(&self.path(key)).await
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") && Self::remove(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
