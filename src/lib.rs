//! # authsync
//!
//! Client-side auth-state synchronization for an identity-provider-backed
//! application. A single background task subscribes to session-change
//! events, mirrors the current session and its profile record into an
//! observable snapshot, and exposes a manual refresh operation. The signup
//! flow (validation + account creation) lives alongside it since a
//! successful signup is what produces the first session-change event.
//!
//! Consumers obtain an [`sync::AuthHandle`] from [`sync::spawn_synchronizer`]
//! and must not act on session or profile data until the snapshot reports
//! ready.

pub mod profile;
pub mod provider;
pub mod signup;
pub mod state;
pub mod sync;
pub mod types;
