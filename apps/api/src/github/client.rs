use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use reqwest::{header::HeaderMap, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info, warn};

use super::auth::AppAuth;
use super::tree::{manifest_paths, markdown_paths, production_signals, Tree};
use super::{GitHubError, ProfileSource, API_VERSION, USER_AGENT};
use crate::analysis::manifest::parse_all;
use crate::config::Config;
use crate::models::profile::{days_since, LanguageStats, MarkdownFile, Profile, Readme, Repository};
use crate::models::snapshot::AnalysisSnapshot;

const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
    name: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    company: Option<String>,
    blog: Option<String>,
    avatar_url: Option<String>,
    html_url: Option<String>,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    following: u64,
    #[serde(default)]
    public_repos: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GhUser> for Profile {
    fn from(u: GhUser) -> Self {
        Profile {
            login: u.login,
            name: u.name,
            bio: u.bio,
            location: u.location,
            company: u.company,
            blog: u.blog.filter(|b| !b.trim().is_empty()),
            avatar_url: u.avatar_url,
            html_url: u.html_url,
            followers: u.followers,
            following: u.following,
            public_repos: u.public_repos,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GhRepo {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub has_wiki: bool,
    #[serde(default)]
    pub has_projects: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    pub default_branch: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Own, non-archived repositories, most starred first, at most `limit`.
pub(crate) fn select_repositories(mut repos: Vec<GhRepo>, limit: usize) -> Vec<GhRepo> {
    repos.retain(|r| !r.fork && !r.archived);
    repos.sort_by(|a, b| {
        b.stargazers_count
            .cmp(&a.stargazers_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    repos.truncate(limit);
    repos
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && headers
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                == Some("0"))
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

pub struct GitHubClient {
    http: Client,
    auth: AppAuth,
    api_url: String,
    max_repos: usize,
    max_markdown_files: usize,
    timeout: Duration,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self, GitHubError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            auth: AppAuth::new(http.clone(), &config.github)?,
            http,
            api_url: config.github.api_url.clone(),
            max_repos: config.max_repos_per_user,
            max_markdown_files: config.max_markdown_files,
            timeout: Duration::from_secs(config.api_timeout_seconds),
        })
    }

    async fn get(&self, path: &str, accept: &str) -> Result<Response, GitHubError> {
        let token = self.auth.installation_token().await?;
        let response = self
            .http
            .get(format!("{}{path}", self.api_url))
            .bearer_auth(token)
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(GitHubError::NotFound(path.to_string()));
        }
        if is_rate_limited(status, response.headers()) {
            return Err(GitHubError::RateLimited {
                reset_at: rate_limit_reset(response.headers()),
            });
        }
        let message = response.text().await.unwrap_or_default();
        Err(GitHubError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GitHubError> {
        Ok(self.get(path, JSON_MEDIA_TYPE).await?.json().await?)
    }

    async fn get_raw(&self, path: &str) -> Result<String, GitHubError> {
        Ok(self.get(path, RAW_MEDIA_TYPE).await?.text().await?)
    }

    /// Bounds one call by the per-request timeout.
    async fn timed<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, GitHubError>>,
    ) -> Result<T, GitHubError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| GitHubError::Timeout(what.to_string()))?
    }

    async fn fetch_file(&self, full_name: &str, path: &str) -> (String, Result<String, GitHubError>) {
        let result = self
            .timed(path, self.get_raw(&format!("/repos/{full_name}/contents/{path}")))
            .await;
        (path.to_string(), result)
    }

    async fn fetch_repository(&self, repo: GhRepo, analyzed_at: DateTime<Utc>) -> Repository {
        let full = repo.full_name.clone();
        let branch = repo.default_branch.clone().unwrap_or_else(|| "main".to_string());
        let mut partial: Vec<String> = Vec::new();

        let languages_path = format!("/repos/{full}/languages");
        let readme_path = format!("/repos/{full}/readme");
        let tree_path = format!("/repos/{full}/git/trees/{branch}?recursive=1");
        let (languages, readme, tree) = tokio::join!(
            self.timed("languages", self.get_json::<BTreeMap<String, u64>>(&languages_path)),
            self.timed("readme", self.get_raw(&readme_path)),
            self.timed("tree", self.get_json::<Tree>(&tree_path)),
        );

        let languages = match languages {
            Ok(bytes) => LanguageStats::from_bytes(bytes),
            Err(e) => {
                warn!("[{full}] languages unavailable: {e}");
                partial.push("languages".to_string());
                LanguageStats::default()
            }
        };

        let readme = match readme {
            Ok(content) => Some(Readme::new(content)),
            Err(GitHubError::NotFound(_)) => None,
            Err(e) => {
                warn!("[{full}] README unavailable: {e}");
                partial.push("readme".to_string());
                None
            }
        };

        let (markdown_files, dependencies, production) = match tree {
            Ok(tree) => {
                if tree.truncated {
                    debug!("[{full}] file tree truncated by GitHub");
                }
                let md_entries = markdown_paths(&tree, self.max_markdown_files);
                let manifest_entries = manifest_paths(&tree);

                let (md_results, manifest_results) = tokio::join!(
                    join_all(md_entries.iter().map(|e| self.fetch_file(&full, &e.path))),
                    join_all(manifest_entries.iter().map(|e| self.fetch_file(&full, &e.path))),
                );

                let mut markdown = Vec::new();
                for (path, result) in md_results {
                    match result {
                        Ok(content) => markdown.push(MarkdownFile {
                            filename: path.rsplit('/').next().unwrap_or(&path).to_string(),
                            length_chars: content.chars().count(),
                            path,
                            content,
                        }),
                        Err(e) => {
                            warn!("[{full}] markdown {path} unavailable: {e}");
                            partial.push(format!("markdown:{path}"));
                        }
                    }
                }

                let mut manifests = Vec::new();
                for (path, result) in manifest_results {
                    match result {
                        Ok(content) => manifests.push((path, content)),
                        Err(e) => {
                            warn!("[{full}] manifest {path} unavailable: {e}");
                            partial.push(format!("manifest:{path}"));
                        }
                    }
                }

                (markdown, parse_all(&manifests), production_signals(&tree))
            }
            // empty repositories have no tree
            Err(GitHubError::NotFound(_)) => (Vec::new(), Vec::new(), Vec::new()),
            Err(e) => {
                warn!("[{full}] file tree unavailable: {e}");
                partial.push("tree".to_string());
                (Vec::new(), Vec::new(), Vec::new())
            }
        };

        Repository {
            name: repo.name,
            full_name: repo.full_name,
            html_url: repo.html_url,
            description: repo.description,
            language: repo.language,
            languages,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            watchers: repo.watchers_count,
            open_issues: repo.open_issues_count,
            size_kb: repo.size,
            has_wiki: repo.has_wiki,
            has_projects: repo.has_projects,
            is_fork: repo.fork,
            archived: repo.archived,
            default_branch: branch,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            pushed_at: repo.pushed_at,
            days_since_last_commit: repo.pushed_at.map(|p| days_since(p, analyzed_at)),
            topics: repo.topics,
            readme,
            markdown_files,
            dependencies,
            production_signals: production,
            partial_sections: partial,
        }
    }
}

#[async_trait]
impl ProfileSource for GitHubClient {
    async fn fetch(&self, username: &str) -> Result<AnalysisSnapshot, GitHubError> {
        let analyzed_at = Utc::now();

        let user: GhUser = self
            .timed("profile", self.get_json(&format!("/users/{username}")))
            .await
            .map_err(|e| match e {
                GitHubError::NotFound(_) => GitHubError::NotFound(format!("user '{username}'")),
                other => other,
            })?;

        let repos: Vec<GhRepo> = self
            .timed(
                "repositories",
                self.get_json(&format!("/users/{username}/repos?per_page=100&sort=updated")),
            )
            .await?;
        let total = repos.len();
        let selected = select_repositories(repos, self.max_repos);
        info!(
            "Fetching {} of {total} repositories for {username}",
            selected.len()
        );

        let repositories = join_all(
            selected
                .into_iter()
                .map(|r| self.fetch_repository(r, analyzed_at)),
        )
        .await;

        Ok(AnalysisSnapshot {
            username: username.to_string(),
            analyzed_at,
            profile: user.into(),
            repositories,
        })
    }
}
