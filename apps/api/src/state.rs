use std::sync::Arc;

use crate::analyze::service::AnalysisService;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::reports::generator::ReportGenerator;
use crate::storage::SnapshotStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub analysis: AnalysisService,
    pub reports: ReportGenerator,
    /// Also held by `analysis`; kept here for the admin routes and /health.
    pub cache: Arc<dyn ResponseCache>,
    pub snapshots: Arc<dyn SnapshotStore>,
}
