use anyhow::{bail, Context, Result};

use crate::analysis::keywords::KeywordBudget;
use crate::llm_client::{ProviderConfig, ProviderKind};

/// Where analyze responses are cached.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheBackend {
    File { dir: String },
    Memory,
    Redis { url: String },
}

/// Where per-user snapshots are persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotBackend {
    File { dir: String },
    S3(S3Settings),
}

#[derive(Debug, Clone, PartialEq)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone)]
pub struct GitHubAppConfig {
    pub app_id: String,
    pub installation_id: String,
    pub private_key_pem: String,
    pub api_url: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub github: GitHubAppConfig,
    pub max_repos_per_user: usize,
    pub max_markdown_files: usize,
    pub cache_ttl_seconds: u64,
    pub api_timeout_seconds: u64,
    pub cache_backend: CacheBackend,
    pub snapshot_backend: SnapshotBackend,
    /// Ordered LLM providers; the first one that answers wins.
    pub llm_providers: Vec<ProviderConfig>,
    pub llm_timeout_seconds: u64,
    pub keyword_budget: KeywordBudget,
    pub rules_path: Option<String>,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let private_key_pem = require_env("GITHUB_PRIVATE_KEY")?.replace("\\n", "\n");

        Ok(Config {
            github: GitHubAppConfig {
                app_id: require_env("GITHUB_APP_ID")?,
                installation_id: require_env("GITHUB_INSTALLATION_ID")?,
                private_key_pem,
                api_url: env_or("GITHUB_API_URL", "https://api.github.com")
                    .trim_end_matches('/')
                    .to_string(),
            },
            max_repos_per_user: parse_env("MAX_REPOS_PER_USER", 15)?,
            max_markdown_files: parse_env("MAX_MARKDOWN_FILES", 20)?,
            cache_ttl_seconds: parse_env("CACHE_TTL_SECONDS", 86_400)?,
            api_timeout_seconds: parse_env("API_TIMEOUT_SECONDS", 10)?,
            cache_backend: cache_backend_from_env()?,
            snapshot_backend: snapshot_backend_from_env()?,
            llm_providers: providers_from_env()?,
            llm_timeout_seconds: parse_env("LLM_TIMEOUT_SECONDS", 60)?,
            keyword_budget: KeywordBudget::parse(
                parse_env("KEYWORD_MAX_TOTAL", 15)?,
                &env_or("KEYWORD_SPLIT", "7,4,4"),
            )
            .context("KEYWORD_SPLIT must look like '7,4,4'")?,
            rules_path: optional_env("RULES_PATH"),
            port: parse_env("PORT", 8000)?,
            environment: env_or("ENVIRONMENT", "production"),
            log_level: env_or("LOG_LEVEL", "info").to_lowercase(),
        })
    }
}

fn cache_backend_from_env() -> Result<CacheBackend> {
    match env_or("CACHE_BACKEND", "file").to_lowercase().as_str() {
        "file" => Ok(CacheBackend::File {
            dir: env_or("CACHE_DIR", "cache"),
        }),
        "memory" => Ok(CacheBackend::Memory),
        "redis" => Ok(CacheBackend::Redis {
            url: require_env("REDIS_URL")?,
        }),
        other => bail!("Unknown CACHE_BACKEND '{other}' (expected file, memory or redis)"),
    }
}

fn snapshot_backend_from_env() -> Result<SnapshotBackend> {
    match env_or("SNAPSHOT_BACKEND", "file").to_lowercase().as_str() {
        "file" => Ok(SnapshotBackend::File {
            dir: env_or("SNAPSHOT_DIR", "db"),
        }),
        "s3" => Ok(SnapshotBackend::S3(S3Settings {
            bucket: require_env("S3_BUCKET")?,
            endpoint: require_env("S3_ENDPOINT")?,
            access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
        })),
        other => bail!("Unknown SNAPSHOT_BACKEND '{other}' (expected file or s3)"),
    }
}

/// Provider priority: Ollama (opt-in) > Groq > OpenAI > Gemini > Anthropic.
fn providers_from_env() -> Result<Vec<ProviderConfig>> {
    let model_override = optional_env("LLM_MODEL");
    let mut providers = Vec::new();

    if parse_env("USE_OLLAMA", false)? {
        providers.push(ProviderConfig {
            kind: ProviderKind::Ollama,
            base_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            model: env_or("OLLAMA_MODEL", "llama3.1:8b"),
            api_key: None,
        });
    }
    if let Some(key) = optional_env("GROQ_API_KEY") {
        providers.push(ProviderConfig {
            kind: ProviderKind::Groq,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: model_override
                .clone()
                .unwrap_or_else(|| "llama-3.3-70b-versatile".to_string()),
            api_key: Some(key),
        });
    }
    if let Some(key) = optional_env("OPENAI_API_KEY") {
        providers.push(ProviderConfig {
            kind: ProviderKind::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: model_override
                .clone()
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            api_key: Some(key),
        });
    }
    if let Some(key) = optional_env("GOOGLE_API_KEY") {
        providers.push(ProviderConfig {
            kind: ProviderKind::Gemini,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: Some(key),
        });
    }
    if let Some(key) = optional_env("ANTHROPIC_API_KEY") {
        providers.push(ProviderConfig {
            kind: ProviderKind::Anthropic,
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            api_key: Some(key),
        });
    }

    Ok(providers)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// In-memory backends, no LLM providers, no real GitHub credentials.
    pub fn for_tests() -> Self {
        Config {
            github: GitHubAppConfig {
                app_id: "1".to_string(),
                installation_id: "1".to_string(),
                private_key_pem: String::new(),
                api_url: "http://127.0.0.1:9".to_string(),
            },
            max_repos_per_user: 15,
            max_markdown_files: 20,
            cache_ttl_seconds: 60,
            api_timeout_seconds: 1,
            cache_backend: CacheBackend::Memory,
            snapshot_backend: SnapshotBackend::File {
                dir: "db".to_string(),
            },
            llm_providers: Vec::new(),
            llm_timeout_seconds: 1,
            keyword_budget: KeywordBudget::default(),
            rules_path: None,
            port: 0,
            environment: "test".to_string(),
            log_level: "debug".to_string(),
        }
    }
}
