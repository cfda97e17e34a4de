//! GitHub App authentication: a short-lived RS256 JWT exchanged for an
//! installation token, which is cached until shortly before it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{GitHubError, API_VERSION, USER_AGENT};
use crate::config::GitHubAppConfig;

/// Tokens are refreshed this long before GitHub expires them.
pub const REFRESH_BUFFER_SECONDS: i64 = 300;
/// GitHub caps app JWTs at ten minutes.
const JWT_LIFETIME_SECONDS: i64 = 600;
/// Backdated to tolerate clock drift between us and GitHub.
const JWT_BACKDATE_SECONDS: i64 = 60;

#[derive(Debug, Serialize)]
struct Claims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Deserialize)]
struct InstallationTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_BUFFER_SECONDS) < self.expires_at
    }
}

pub struct AppAuth {
    http: Client,
    app_id: String,
    installation_id: String,
    api_url: String,
    key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl AppAuth {
    pub fn new(http: Client, config: &GitHubAppConfig) -> Result<Self, GitHubError> {
        let key = EncodingKey::from_rsa_pem(config.private_key_pem.as_bytes())
            .map_err(|e| GitHubError::Auth(format!("invalid GitHub App private key: {e}")))?;
        Ok(Self {
            http,
            app_id: config.app_id.clone(),
            installation_id: config.installation_id.clone(),
            api_url: config.api_url.clone(),
            key,
            cached: Mutex::new(None),
        })
    }

    fn app_jwt(&self, now: DateTime<Utc>) -> Result<String, GitHubError> {
        let claims = Claims {
            iat: now.timestamp() - JWT_BACKDATE_SECONDS,
            exp: now.timestamp() + JWT_LIFETIME_SECONDS - JWT_BACKDATE_SECONDS,
            iss: self.app_id.clone(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| GitHubError::Auth(format!("failed to sign app JWT: {e}")))
    }

    /// Returns a valid installation token, minting a new one when the cached
    /// token is missing or inside the refresh buffer.
    pub async fn installation_token(&self) -> Result<String, GitHubError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }

        debug!("Requesting new GitHub installation token");
        let jwt = self.app_jwt(now)?;
        let response = self
            .http
            .post(format!(
                "{}/app/installations/{}/access_tokens",
                self.api_url, self.installation_id
            ))
            .bearer_auth(jwt)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let message = response.text().await.unwrap_or_default();
            return Err(GitHubError::Auth(format!(
                "installation token request failed (status {}): {message}",
                status.as_u16()
            )));
        }

        let body: InstallationTokenResponse = response.json().await?;
        info!("GitHub installation token refreshed, expires at {}", body.expires_at);
        let token = body.token.clone();
        *cached = Some(CachedToken {
            token: body.token,
            expires_at: body.expires_at,
        });
        Ok(token)
    }
}
