//! Identity provider seam — session-change events and account creation.
//!
//! ARCHITECTURE
//! ============
//! The provider pushes `SessionChange` events onto a bounded channel; the
//! synchronizer is the single consumer. Account creation and sign-out are
//! the local operations that produce those events, so the provider owns the
//! fan-out (`SessionFeed`) and emits on success. Dropping a subscription's
//! receiver deregisters it: the feed prunes closed senders on the next emit.
//!
//! ERROR HANDLING
//! ==============
//! `IdentityError` is propagated to the caller of `create_account`, never
//! swallowed. Event delivery is best-effort `try_send`: a full subscriber
//! queue drops the event with a diagnostic rather than blocking the auth
//! operation.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use crate::types::Session;

const SESSION_EVENT_CAPACITY: usize = 32;

/// A session-change notification. `session: None` means signed out.
#[derive(Debug, Clone)]
pub struct SessionChange {
    pub session: Option<Session>,
}

impl SessionChange {
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self { session: Some(session) }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self { session: None }
    }
}

/// Input to `create_account`. Display name is optional; the provider keeps
/// whatever it is given.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("an account with this email already exists")]
    DuplicateAccount,
    #[error("password does not meet the provider's requirements")]
    WeakCredential,
    #[error("email address is malformed")]
    MalformedEmail,
    #[error("identity request failed: {0}")]
    Transport(String),
    #[error("unexpected identity response: {0}")]
    Api(String),
}

/// External identity provider: session-change subscription plus the
/// account-lifecycle operations that feed it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a subscriber and return its event receiver. Dropping the
    /// receiver is the unsubscribe.
    fn subscribe(&self) -> mpsc::Receiver<SessionChange>;

    /// Create an account with credentials, returning the new session.
    /// A successful call also emits a signed-in `SessionChange`.
    ///
    /// # Errors
    ///
    /// `IdentityError` on duplicate account, weak credential, malformed
    /// email, or transport failure. Always propagated to the caller.
    async fn create_account(&self, account: &NewAccount) -> Result<Session, IdentityError>;

    /// End the current session and emit a signed-out `SessionChange`.
    async fn sign_out(&self);
}

// =============================================================================
// SESSION FEED
// =============================================================================

/// Fan-out of session-change events to subscribers.
///
/// Senders that are closed (receiver dropped) are pruned on emit. Delivery
/// uses `try_send` so emitting never blocks an auth operation; a slow
/// subscriber that fills its queue loses the event.
#[derive(Debug, Default)]
pub struct SessionFeed {
    subscribers: Mutex<Vec<mpsc::Sender<SessionChange>>>,
}

impl SessionFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber and hand back its receiver.
    pub fn subscribe(&self) -> mpsc::Receiver<SessionChange> {
        let (tx, rx) = mpsc::channel(SESSION_EVENT_CAPACITY);
        self.subscribers
            .lock()
            .expect("subscriber registry lock poisoned")
            .push(tx);
        rx
    }

    /// Deliver a change to every live subscriber.
    pub fn emit(&self, change: &SessionChange) {
        let mut subscribers = self
            .subscribers
            .lock()
            .expect("subscriber registry lock poisoned");
        subscribers.retain(|tx| match tx.try_send(change.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("session event queue full; dropping event for subscriber");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Number of live subscribers (closed ones linger until the next emit).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber registry lock poisoned")
            .len()
    }
}

// =============================================================================
// HTTP IMPLEMENTATION
// =============================================================================

/// Identity service configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
}

impl IdentityConfig {
    /// Load from `AUTH_API_BASE_URL`. Returns `None` if unset (identity
    /// operations will be unavailable).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("AUTH_API_BASE_URL").ok()?;
        Some(Self::new(&base_url))
    }

    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_owned() }
    }

    #[must_use]
    pub fn accounts_url(&self) -> String {
        format!("{}/api/auth/accounts", self.base_url)
    }

    #[must_use]
    pub fn logout_url(&self) -> String {
        format!("{}/api/auth/logout", self.base_url)
    }
}

#[derive(Debug, serde::Deserialize)]
struct IdentityErrorBody {
    error: String,
}

/// REST-backed identity provider.
pub struct HttpIdentityProvider {
    config: IdentityConfig,
    http: reqwest::Client,
    feed: SessionFeed,
}

impl HttpIdentityProvider {
    #[must_use]
    pub fn new(config: IdentityConfig) -> Self {
        Self { config, http: reqwest::Client::new(), feed: SessionFeed::new() }
    }

    fn map_failure(status: reqwest::StatusCode, body: &str) -> IdentityError {
        if status == reqwest::StatusCode::CONFLICT {
            return IdentityError::DuplicateAccount;
        }

        let code = serde_json::from_str::<IdentityErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_default();
        match code.as_str() {
            "duplicate_account" => IdentityError::DuplicateAccount,
            "weak_password" => IdentityError::WeakCredential,
            "invalid_email" => IdentityError::MalformedEmail,
            _ => IdentityError::Api(format!("{status}: {body}")),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn subscribe(&self) -> mpsc::Receiver<SessionChange> {
        self.feed.subscribe()
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Session, IdentityError> {
        let resp = self
            .http
            .post(self.config.accounts_url())
            .json(account)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::map_failure(status, &body));
        }

        let session = resp
            .json::<Session>()
            .await
            .map_err(|e| IdentityError::Api(e.to_string()))?;

        self.feed.emit(&SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) {
        // Best-effort server-side logout; local state signs out regardless.
        let _ = self.http.post(self.config.logout_url()).send().await;
        self.feed.emit(&SessionChange::signed_out());
    }
}

#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;
