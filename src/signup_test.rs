use super::*;
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::provider::{SessionChange, SessionFeed};

fn request() -> SignupRequest {
    SignupRequest {
        email: "Alice@Example.com ".into(),
        password: "hunter22".into(),
        confirm_password: "hunter22".into(),
        display_name: Some("Alice".into()),
    }
}

// =========================================================================
// MockProvider
// =========================================================================

struct MockProvider {
    feed: SessionFeed,
    fail_with: Mutex<Option<IdentityError>>,
    created: Mutex<Vec<NewAccount>>,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            feed: SessionFeed::new(),
            fail_with: Mutex::new(None),
            created: Mutex::new(Vec::new()),
        }
    }

    fn failing(err: IdentityError) -> Self {
        let provider = Self::new();
        *provider.fail_with.lock().unwrap() = Some(err);
        provider
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MockProvider {
    fn subscribe(&self) -> mpsc::Receiver<SessionChange> {
        self.feed.subscribe()
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Session, IdentityError> {
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        self.created.lock().unwrap().push(account.clone());
        let session = Session {
            user_id: Uuid::new_v4(),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
        };
        self.feed.emit(&SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) {
        self.feed.emit(&SessionChange::signed_out());
    }
}

// =========================================================================
// normalize_email
// =========================================================================

#[test]
fn normalize_email_lowercases_and_trims() {
    assert_eq!(normalize_email(" Alice@Example.COM "), Some("alice@example.com".into()));
}

#[test]
fn normalize_email_rejects_missing_at() {
    assert!(normalize_email("alice.example.com").is_none());
}

#[test]
fn normalize_email_rejects_empty_local_part() {
    assert!(normalize_email("@example.com").is_none());
}

#[test]
fn normalize_email_rejects_empty_domain() {
    assert!(normalize_email("alice@").is_none());
}

#[test]
fn normalize_email_rejects_double_at() {
    assert!(normalize_email("alice@foo@bar.com").is_none());
}

// =========================================================================
// validate
// =========================================================================

#[test]
fn validate_accepts_well_formed_request() {
    let valid = validate(&request()).unwrap();
    assert_eq!(valid.email, "alice@example.com");
    assert_eq!(valid.display_name.as_deref(), Some("Alice"));
}

#[test]
fn validate_rejects_malformed_email() {
    let req = SignupRequest { email: "not-an-email".into(), ..request() };
    assert!(matches!(validate(&req), Err(SignupError::InvalidEmail)));
}

#[test]
fn validate_rejects_short_password() {
    let req = SignupRequest {
        password: "abc".into(),
        confirm_password: "abc".into(),
        ..request()
    };
    assert!(matches!(validate(&req), Err(SignupError::PasswordTooShort)));
}

#[test]
fn validate_accepts_password_at_minimum_length() {
    let req = SignupRequest {
        password: "abcdef".into(),
        confirm_password: "abcdef".into(),
        ..request()
    };
    assert!(validate(&req).is_ok());
}

#[test]
fn validate_requires_confirm_password() {
    let req = SignupRequest { confirm_password: String::new(), ..request() };
    assert!(matches!(validate(&req), Err(SignupError::ConfirmPasswordMissing)));
}

#[test]
fn validate_rejects_mismatched_confirm_password() {
    let req = SignupRequest { confirm_password: "hunter23".into(), ..request() };
    assert!(matches!(validate(&req), Err(SignupError::PasswordMismatch)));
}

#[test]
fn validate_blank_display_name_becomes_none() {
    let req = SignupRequest { display_name: Some("   ".into()), ..request() };
    let valid = validate(&req).unwrap();
    assert!(valid.display_name.is_none());
}

#[test]
fn validate_missing_display_name_is_allowed() {
    let req = SignupRequest { display_name: None, ..request() };
    assert!(validate(&req).is_ok());
}

// =========================================================================
// sign_up
// =========================================================================

#[tokio::test]
async fn sign_up_creates_account_with_normalized_email() {
    let provider = MockProvider::new();

    let session = sign_up(&provider, &request()).await.unwrap();

    assert_eq!(session.email, "alice@example.com");
    let created = provider.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].email, "alice@example.com");
    assert_eq!(created[0].display_name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn sign_up_emits_session_change_to_subscribers() {
    let provider = MockProvider::new();
    let mut events = provider.subscribe();

    let session = sign_up(&provider, &request()).await.unwrap();

    let change = events.recv().await.unwrap();
    assert_eq!(change.session.unwrap().user_id, session.user_id);
}

#[tokio::test]
async fn sign_up_validation_failure_skips_provider() {
    let provider = MockProvider::new();
    let req = SignupRequest { confirm_password: "different".into(), ..request() };

    let err = sign_up(&provider, &req).await.unwrap_err();

    assert!(matches!(err, SignupError::PasswordMismatch));
    assert!(provider.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn sign_up_propagates_identity_error() {
    let provider = MockProvider::failing(IdentityError::DuplicateAccount);

    let err = sign_up(&provider, &request()).await.unwrap_err();

    assert!(matches!(err, SignupError::Identity(IdentityError::DuplicateAccount)));
}

#[test]
fn password_too_short_message_names_minimum() {
    let msg = SignupError::PasswordTooShort.to_string();
    assert!(msg.contains('6'));
}
