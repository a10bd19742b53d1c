//! Core data types shared across the crate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider-issued authenticated principal.
///
/// Everything beyond `user_id` is opaque payload carried through from the
/// identity provider; `user_id` keys all profile lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique principal identifier.
    pub user_id: Uuid,
    /// Email the account was created with.
    pub email: String,
    /// Display name, if the provider has one.
    pub display_name: Option<String>,
}

/// Application-defined profile record, stored externally and keyed by the
/// principal's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// Account creation date as `YYYY-MM-DD`, if the store reports it.
    pub member_since: Option<String>,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
