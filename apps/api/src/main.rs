mod analysis;
mod analyze;
mod cache;
mod config;
mod errors;
mod github;
mod llm_client;
mod models;
mod reports;
mod routes;
mod state;
mod storage;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::rules::RuleBook;
use crate::analyze::service::AnalysisService;
use crate::cache::{FileCache, MemoryCache, RedisCache, ResponseCache};
use crate::config::{CacheBackend, Config, S3Settings, SnapshotBackend};
use crate::github::GitHubClient;
use crate::llm_client::ProviderChain;
use crate::reports::generator::ReportGenerator;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{FileSnapshotStore, S3SnapshotStore, SnapshotStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.log_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting GitScout API v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    // Classification rules (built-in unless RULES_PATH is set)
    let rules = Arc::new(RuleBook::load(config.rules_path.as_deref())?);
    info!("Loaded {} domain rules", rules.domain_names().count());

    let cache = build_cache(&config.cache_backend).await?;
    info!("Response cache: {}", cache.backend());

    let snapshots = build_snapshot_store(&config.snapshot_backend).await?;
    info!("Snapshot store: {}", snapshots.backend());

    let github = Arc::new(GitHubClient::new(&config)?);
    info!("GitHub client initialized ({})", config.github.api_url);

    let providers = ProviderChain::from_configs(
        &config.llm_providers,
        Duration::from_secs(config.llm_timeout_seconds),
    )?;
    if providers.is_empty() {
        info!("No LLM providers configured; reports use template mode");
    } else {
        info!("LLM providers: {}", providers.names().join(" > "));
    }

    let state = AppState {
        analysis: AnalysisService::new(
            github,
            cache.clone(),
            snapshots.clone(),
            Duration::from_secs(config.cache_ttl_seconds),
        ),
        reports: ReportGenerator::new(rules, config.keyword_budget, providers),
        cache,
        snapshots,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_cache(backend: &CacheBackend) -> Result<Arc<dyn ResponseCache>> {
    let cache: Arc<dyn ResponseCache> = match backend {
        CacheBackend::File { dir } => Arc::new(FileCache::new(dir).await?),
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::Redis { url } => Arc::new(RedisCache::connect(url).await?),
    };
    Ok(cache)
}

async fn build_snapshot_store(backend: &SnapshotBackend) -> Result<Arc<dyn SnapshotStore>> {
    let store: Arc<dyn SnapshotStore> = match backend {
        SnapshotBackend::File { dir } => Arc::new(FileSnapshotStore::new(dir).await?),
        SnapshotBackend::S3(settings) => Arc::new(S3SnapshotStore::new(
            build_s3_client(settings).await,
            settings.bucket.clone(),
        )),
    };
    Ok(store)
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(settings: &S3Settings) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &settings.access_key_id,
        &settings.secret_access_key,
        None,
        None,
        "gitscout-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&settings.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
