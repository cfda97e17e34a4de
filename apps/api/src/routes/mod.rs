pub mod admin;
pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::analyze::handlers as analyze;
use crate::reports::handlers as reports;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/analyze", post(analyze::handle_analyze))
        .route("/reports/generate", post(reports::handle_generate_report))
        // Administration
        .route("/cache", delete(admin::handle_clear_cache))
        .route("/cache/:username", delete(admin::handle_invalidate_cache))
        .route("/snapshots", get(admin::handle_list_snapshots))
        .route("/snapshots/:username", delete(admin::handle_delete_snapshot))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::analysis::keywords::KeywordBudget;
    use crate::analysis::rules::RuleBook;
    use crate::analyze::service::tests::FixedSource;
    use crate::analyze::service::AnalysisService;
    use crate::cache::{MemoryCache, ResponseCache};
    use crate::config::Config;
    use crate::llm_client::ProviderChain;
    use crate::reports::generator::ReportGenerator;
    use crate::storage::{FileSnapshotStore, SnapshotStore};

    async fn app(dir: &std::path::Path) -> Router {
        let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::new());
        let snapshots: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(dir).await.unwrap());
        let state = AppState {
            config: Config::for_tests(),
            analysis: AnalysisService::new(
                Arc::new(FixedSource::new()),
                cache.clone(),
                snapshots.clone(),
                Duration::from_secs(60),
            ),
            reports: ReportGenerator::new(
                Arc::new(RuleBook::builtin().unwrap()),
                KeywordBudget::default(),
                ProviderChain::default(),
            ),
            cache,
            snapshots,
        };
        build_router(state)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_reports_capacity_and_backends() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(&app(dir.path()).await, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["environment"], "test");
        assert_eq!(body["capacity"]["max_repos_per_user"], 15);
        assert_eq!(body["backends"]["cache"], "memory");
        assert_eq!(body["llm_providers"], json!([]));
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let (status, body) = call(&app, "POST", "/analyze", Some(json!({"github_input": "not a user!"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_analyze_then_cached() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let input = json!({"github_input": "https://github.com/Octo"});

        let (status, first) = call(&app, "POST", "/analyze", Some(input.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["username"], "octo");
        assert_eq!(first["performance"]["from_cache"], false);

        let (_, second) = call(&app, "POST", "/analyze", Some(input)).await;
        assert_eq!(second["performance"]["from_cache"], true);

        let (_, snapshots) = call(&app, "GET", "/snapshots", None).await;
        assert_eq!(snapshots["usernames"], json!(["octo"]));
    }

    #[tokio::test]
    async fn test_unknown_user_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let (status, body) = call(&app, "POST", "/analyze", Some(json!({"github_input": "ghost"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_stored_report_matches_fresh_report() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, fresh) = call(
            &app,
            "POST",
            "/reports/generate",
            Some(json!({"username": "octo", "use_stored": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fresh["from_snapshot"], false);
        assert_eq!(fresh["provider"], "template");

        let (_, stored) = call(&app, "POST", "/reports/generate", Some(json!({"username": "octo"}))).await;
        assert_eq!(stored["from_snapshot"], true);
        assert_eq!(stored["report"], fresh["report"]);
        assert!(stored["report"]["hiring_recommendation"]["primary_role"].is_string());
    }

    #[tokio::test]
    async fn test_unsupported_report_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let (status, _) = call(
            &app,
            "POST",
            "/reports/generate",
            Some(json!({"username": "octo", "report_type": "summary"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cache_admin() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        call(&app, "POST", "/analyze", Some(json!({"github_input": "octo"}))).await;

        let (status, body) = call(&app, "DELETE", "/cache/octo", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invalidated"], true);

        call(&app, "POST", "/analyze", Some(json!({"github_input": "octo"}))).await;
        let (_, body) = call(&app, "DELETE", "/cache", None).await;
        assert_eq!(body["cleared"], 1);
    }

    #[tokio::test]
    async fn test_user_named_clear_can_be_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        call(&app, "POST", "/analyze", Some(json!({"github_input": "octo"}))).await;
        call(&app, "POST", "/analyze", Some(json!({"github_input": "clear"}))).await;

        let (status, body) = call(&app, "DELETE", "/cache/clear", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "clear");
        assert_eq!(body["invalidated"], true);

        let (_, again) = call(&app, "POST", "/analyze", Some(json!({"github_input": "octo"}))).await;
        assert_eq!(again["performance"]["from_cache"], true);
    }

    #[tokio::test]
    async fn test_delete_snapshot_forces_fresh_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        call(&app, "POST", "/analyze", Some(json!({"github_input": "octo"}))).await;

        let (status, body) = call(&app, "DELETE", "/snapshots/octo", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], true);

        let (_, snapshots) = call(&app, "GET", "/snapshots", None).await;
        assert_eq!(snapshots["count"], 0);
        let (_, again) = call(&app, "POST", "/analyze", Some(json!({"github_input": "octo"}))).await;
        assert_eq!(again["performance"]["from_cache"], false);

        let (_, missing) = call(&app, "DELETE", "/snapshots/nobody", None).await;
        assert_eq!(missing["deleted"], false);
    }
}
