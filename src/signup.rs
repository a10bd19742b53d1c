//! Signup flow — request validation and account creation.
//!
//! Confirm-password is required at the schema level and checked with a
//! single cross-field equality rule; there is no ad-hoc revalidation
//! elsewhere. Identity errors from the provider propagate to the caller,
//! whose notification surface turns their `Display` output into user-facing
//! messages.

use serde::Deserialize;

use crate::provider::{IdentityError, IdentityProvider, NewAccount};
use crate::types::Session;

/// Minimum password length accepted at the schema level.
pub const PASSWORD_MIN_LEN: usize = 6;

/// Raw signup form input.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error("enter a valid email address")]
    InvalidEmail,
    #[error("password must be at least {PASSWORD_MIN_LEN} characters")]
    PasswordTooShort,
    #[error("confirm your password")]
    ConfirmPasswordMissing,
    #[error("passwords don't match")]
    PasswordMismatch,
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Validated signup input ready to hand to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSignup {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Normalize an email for validation: trim and lowercase. Returns `None`
/// unless the shape is `local@domain` with both parts non-empty.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Validate a signup request.
///
/// # Errors
///
/// Returns the first failed rule in field order: email shape, password
/// length, confirm-password presence, cross-field equality.
pub fn validate(req: &SignupRequest) -> Result<ValidatedSignup, SignupError> {
    let email = normalize_email(&req.email).ok_or(SignupError::InvalidEmail)?;

    if req.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(SignupError::PasswordTooShort);
    }
    if req.confirm_password.is_empty() {
        return Err(SignupError::ConfirmPasswordMissing);
    }
    if req.confirm_password != req.password {
        return Err(SignupError::PasswordMismatch);
    }

    let display_name = req
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned);

    Ok(ValidatedSignup { email, password: req.password.clone(), display_name })
}

/// Validate the request and create the account.
///
/// On success the provider emits the signed-in session change that drives
/// the synchronizer; the returned session is for the caller's immediate use.
///
/// # Errors
///
/// Validation failures and `IdentityError` (duplicate account, weak
/// credential, malformed email, transport). Both propagate, never
/// swallowed.
pub async fn sign_up(provider: &dyn IdentityProvider, req: &SignupRequest) -> Result<Session, SignupError> {
    let valid = validate(req)?;
    let account = NewAccount {
        email: valid.email,
        password: valid.password,
        display_name: valid.display_name,
    };
    let session = provider.create_account(&account).await?;
    Ok(session)
}

#[cfg(test)]
#[path = "signup_test.rs"]
mod tests;
