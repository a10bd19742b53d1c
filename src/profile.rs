//! Profile store seam — fetch-by-identifier lookup of profile records.

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::UserProfile;

#[derive(Debug, thiserror::Error)]
pub enum ProfileFetchError {
    #[error("no profile for user {0}")]
    NotFound(Uuid),
    #[error("profile request failed: {0}")]
    Transport(String),
}

/// External store holding profile records keyed by principal identifier.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile for `user_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the store has no record for the identifier,
    /// `Transport` for any request-level failure.
    async fn fetch_profile(&self, user_id: Uuid) -> Result<UserProfile, ProfileFetchError>;
}

/// Profile service configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct ProfileStoreConfig {
    pub base_url: String,
}

impl ProfileStoreConfig {
    /// Load from `PROFILE_API_BASE_URL`. Returns `None` if unset.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("PROFILE_API_BASE_URL").ok()?;
        Some(Self::new(&base_url))
    }

    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_owned() }
    }

    #[must_use]
    pub fn profile_url(&self, user_id: Uuid) -> String {
        format!("{}/api/users/{user_id}/profile", self.base_url)
    }
}

/// REST-backed profile store reading `GET {base}/api/users/{id}/profile`.
pub struct HttpProfileStore {
    config: ProfileStoreConfig,
    http: reqwest::Client,
}

impl HttpProfileStore {
    #[must_use]
    pub fn new(config: ProfileStoreConfig) -> Self {
        Self { config, http: reqwest::Client::new() }
    }
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<UserProfile, ProfileFetchError> {
        let resp = self
            .http
            .get(self.config.profile_url(user_id))
            .send()
            .await
            .map_err(|e| ProfileFetchError::Transport(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProfileFetchError::NotFound(user_id));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProfileFetchError::Transport(format!("{status}: {body}")));
        }

        resp.json::<UserProfile>()
            .await
            .map_err(|e| ProfileFetchError::Transport(e.to_string()))
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
