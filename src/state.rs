//! Observable auth state.
//!
//! DESIGN
//! ======
//! The synchronizer task is the only writer; consumers read snapshots
//! through `watch::Receiver` clones handed out by `AuthHandle`. Keeping the
//! record a plain value type means a multi-threaded host gets serialized
//! writes for free from the watch channel.

use serde::Serialize;

use crate::types::{Session, UserProfile};

/// The tri-state record mirrored from the identity provider: current
/// session, its profile, and whether the first session check has completed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuthSnapshot {
    pub session: Option<Session>,
    pub profile: Option<UserProfile>,
    /// True once the first session-change notification (including its
    /// profile-fetch branch) has completed. Monotonic: never reverts.
    pub ready: bool,
}

impl AuthSnapshot {
    /// Whether a principal is currently signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
