use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::cache::ResponseCache;
use crate::errors::AppError;
use crate::github::ProfileSource;
use crate::models::snapshot::{AnalysisSnapshot, AnalyzeResponse};
use crate::storage::SnapshotStore;

/// Cache read-through in front of the profile source, with snapshot write-behind.
///
/// Cache and snapshot failures are logged and never fail the request; only the
/// GitHub fetch itself can.
#[derive(Clone)]
pub struct AnalysisService {
    source: Arc<dyn ProfileSource>,
    cache: Arc<dyn ResponseCache>,
    snapshots: Arc<dyn SnapshotStore>,
    cache_ttl: Duration,
}

impl AnalysisService {
    pub fn new(
        source: Arc<dyn ProfileSource>,
        cache: Arc<dyn ResponseCache>,
        snapshots: Arc<dyn SnapshotStore>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            snapshots,
            cache_ttl,
        }
    }

    /// `username` must already be normalized.
    pub async fn analyze(&self, username: &str) -> Result<AnalyzeResponse, AppError> {
        let started = Instant::now();

        if let Some(mut cached) = self.cached(username).await {
            cached.performance.from_cache = true;
            cached.performance.elapsed_ms = elapsed_ms(started);
            info!("Cache hit for {username}");
            return Ok(cached);
        }

        let (_, response) = self.fetch_and_store(username, started).await?;
        Ok(response)
    }

    /// Stored snapshot when `use_stored` and one exists, otherwise a fresh fetch.
    /// The flag in the result says which one was used.
    pub async fn snapshot_for_report(
        &self,
        username: &str,
        use_stored: bool,
    ) -> Result<(AnalysisSnapshot, bool), AppError> {
        if use_stored {
            match self.snapshots.load(username).await {
                Ok(Some(snapshot)) => return Ok((snapshot, true)),
                Ok(None) => info!("No stored snapshot for {username}; fetching"),
                Err(e) => warn!("Snapshot load failed for {username}, fetching instead: {e}"),
            }
        }
        let (snapshot, _) = self.fetch_and_store(username, Instant::now()).await?;
        Ok((snapshot, false))
    }

    async fn cached(&self, username: &str) -> Option<AnalyzeResponse> {
        let value = match self.cache.get(username).await {
            Ok(value) => value?,
            Err(e) => {
                warn!("Cache read failed for {username}: {e}");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("Discarding unreadable cache entry for {username}: {e}");
                None
            }
        }
    }

    async fn fetch_and_store(
        &self,
        username: &str,
        started: Instant,
    ) -> Result<(AnalysisSnapshot, AnalyzeResponse), AppError> {
        let snapshot = self.source.fetch(username).await?;

        if let Err(e) = self.snapshots.save(&snapshot).await {
            warn!("Snapshot save failed for {username}: {e}");
        }

        let response = AnalyzeResponse::from_snapshot(snapshot.clone(), elapsed_ms(started), false);
        match serde_json::to_value(&response) {
            Ok(value) => {
                if let Err(e) = self.cache.put(username, &value, self.cache_ttl).await {
                    warn!("Cache write failed for {username}: {e}");
                }
            }
            Err(e) => warn!("Could not serialize response for cache: {e}"),
        }

        info!(
            "Analyzed {username}: {} repositories, {} partial, {}ms",
            response.performance.repositories_analyzed,
            response.performance.partial_repositories,
            response.performance.elapsed_ms
        );
        Ok((snapshot, response))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::analysis::report::tests::snapshot;
    use crate::cache::MemoryCache;
    use crate::github::GitHubError;
    use crate::storage::FileSnapshotStore;

    /// Serves the same snapshot for any username and counts fetches.
    pub(crate) struct FixedSource {
        pub calls: AtomicUsize,
    }

    impl FixedSource {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProfileSource for FixedSource {
        async fn fetch(&self, username: &str) -> Result<AnalysisSnapshot, GitHubError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if username == "ghost" {
                return Err(GitHubError::NotFound(format!("user '{username}'")));
            }
            let mut snap = snapshot();
            snap.username = username.to_string();
            Ok(snap)
        }
    }

    async fn service(dir: &std::path::Path) -> (AnalysisService, Arc<FixedSource>) {
        let source = Arc::new(FixedSource::new());
        let service = AnalysisService::new(
            source.clone(),
            Arc::new(MemoryCache::new()),
            Arc::new(FileSnapshotStore::new(dir).await.unwrap()),
            Duration::from_secs(60),
        );
        (service, source)
    }

    #[tokio::test]
    async fn test_second_analyze_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (service, source) = service(dir.path()).await;

        let first = service.analyze("octo").await.unwrap();
        assert!(!first.performance.from_cache);
        assert_eq!(first.performance.repositories_analyzed, 3);

        let second = service.analyze("octo").await.unwrap();
        assert!(second.performance.from_cache);
        assert_eq!(second.repositories, first.repositories);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_analysis_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path()).await;
        service.analyze("octo").await.unwrap();

        let (stored, from_snapshot) = service.snapshot_for_report("octo", true).await.unwrap();
        assert!(from_snapshot);
        assert_eq!(stored.repositories.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_snapshot_falls_back_to_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let (service, source) = service(dir.path()).await;

        let (_, from_snapshot) = service.snapshot_for_report("octo", true).await.unwrap();
        assert!(!from_snapshot);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path()).await;
        assert!(matches!(service.analyze("ghost").await, Err(AppError::NotFound(_))));
    }
}
