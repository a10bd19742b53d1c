//! Session synchronizer — the single consumer of session-change events.
//!
//! ARCHITECTURE
//! ============
//! One task owns the event receiver, the command receiver, and the watch
//! sender; every snapshot write happens on that task. The handle returned
//! by [`spawn_synchronizer`] is the component's lifetime: dropping it (or
//! calling `shutdown`) closes the command channel, the task exits, and the
//! event receiver is dropped, which deregisters the subscription.
//!
//! ERROR HANDLING
//! ==============
//! Profile-fetch failure is fail-soft: the profile becomes absent and one
//! diagnostic is logged. Nothing escapes the task as an error state.
//!
//! TRADE-OFFS
//! ==========
//! A profile fetch in flight is raced against the event stream; when a
//! newer session change lands first, the stale fetch is cancelled and its
//! result never reaches the snapshot. This favors correctness of the
//! mirrored state over completing every read.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::profile::{ProfileFetchError, ProfileStore};
use crate::provider::{IdentityProvider, SessionChange};
use crate::state::AuthSnapshot;
use crate::types::UserProfile;

const COMMAND_CAPACITY: usize = 8;

#[derive(Debug)]
enum Command {
    Refresh,
}

/// Consumer handle for the synchronizer: snapshot access, manual refresh,
/// and teardown. Dropping the handle tears the synchronizer down.
#[must_use = "dropping the handle shuts the synchronizer down"]
pub struct AuthHandle {
    state: watch::Receiver<AuthSnapshot>,
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl AuthHandle {
    /// Current snapshot. Not meaningful until `ready` is true.
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// A receiver for observing snapshot changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.clone()
    }

    /// Block until the first session-change cycle has completed, returning
    /// the snapshot at that point.
    pub async fn wait_ready(&self) -> AuthSnapshot {
        let mut rx = self.state.clone();
        match rx.wait_for(|s| s.ready).await {
            Ok(snapshot) => snapshot.clone(),
            // Synchronizer gone; report the last published state.
            Err(_) => self.snapshot(),
        }
    }

    /// Re-run the profile fetch for the current session. A no-op (not an
    /// error) when no session is present. Returns `false` if the
    /// synchronizer has already shut down.
    pub async fn refresh(&self) -> bool {
        self.commands.send(Command::Refresh).await.is_ok()
    }

    /// Graceful teardown: queued commands are drained, then the task exits
    /// and the subscription is released.
    pub async fn shutdown(self) {
        let Self { state, commands, task } = self;
        drop(state);
        drop(commands);
        let _ = task.await;
    }
}

/// Register with the identity provider and spawn the synchronizer task.
///
/// Exactly one subscription is established for the handle's lifetime.
pub fn spawn_synchronizer(provider: &dyn IdentityProvider, store: Arc<dyn ProfileStore>) -> AuthHandle {
    let events = provider.subscribe();
    let (state_tx, state_rx) = watch::channel(AuthSnapshot::default());
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);

    let task = tokio::spawn(run(events, cmd_rx, state_tx, store));

    AuthHandle { state: state_rx, commands: cmd_tx, task }
}

enum Step {
    Notified(SessionChange),
    Refresh,
}

async fn run(
    mut events: mpsc::Receiver<SessionChange>,
    mut commands: mpsc::Receiver<Command>,
    state: watch::Sender<AuthSnapshot>,
    store: Arc<dyn ProfileStore>,
) {
    // A change that superseded an in-flight fetch is processed before
    // polling the channels again.
    let mut pending: Option<SessionChange> = None;

    loop {
        let step = if let Some(change) = pending.take() {
            Step::Notified(change)
        } else {
            tokio::select! {
                change = events.recv() => match change {
                    Some(change) => Step::Notified(change),
                    // Provider closed the feed; nothing left to mirror.
                    None => break,
                },
                command = commands.recv() => match command {
                    Some(Command::Refresh) => Step::Refresh,
                    // Every handle dropped: tear down the subscription.
                    None => break,
                },
            }
        };

        pending = match step {
            Step::Notified(change) => apply_change(change, &mut events, &state, store.as_ref()).await,
            Step::Refresh => refresh_profile(&mut events, &state, store.as_ref()).await,
        };
    }

    debug!("session synchronizer stopped");
}

/// Outcome of a profile fetch raced against the event stream.
enum FetchOutcome {
    Resolved(Result<UserProfile, ProfileFetchError>),
    Superseded(SessionChange),
}

async fn fetch_racing(
    events: &mut mpsc::Receiver<SessionChange>,
    store: &dyn ProfileStore,
    user_id: Uuid,
) -> FetchOutcome {
    let fetch = store.fetch_profile(user_id);
    tokio::pin!(fetch);

    tokio::select! {
        change = events.recv() => match change {
            Some(change) => FetchOutcome::Superseded(change),
            // Feed closed: nothing newer can arrive, let the fetch finish.
            None => FetchOutcome::Resolved(fetch.await),
        },
        result = &mut fetch => FetchOutcome::Resolved(result),
    }
}

/// Handle one notification cycle. Returns the superseding change if a
/// newer one arrived while this cycle's fetch was in flight.
async fn apply_change(
    change: SessionChange,
    events: &mut mpsc::Receiver<SessionChange>,
    state: &watch::Sender<AuthSnapshot>,
    store: &dyn ProfileStore,
) -> Option<SessionChange> {
    state.send_modify(|s| s.session = change.session.clone());

    let Some(session) = change.session else {
        // No session: no fetch attempt, cycle completes immediately.
        state.send_modify(|s| {
            s.profile = None;
            s.ready = true;
        });
        return None;
    };

    match fetch_racing(events, store, session.user_id).await {
        FetchOutcome::Superseded(newer) => Some(newer),
        FetchOutcome::Resolved(result) => {
            apply_fetch_result(state, session.user_id, result);
            None
        }
    }
}

/// Re-run the fetch for the current session; a no-op without one.
async fn refresh_profile(
    events: &mut mpsc::Receiver<SessionChange>,
    state: &watch::Sender<AuthSnapshot>,
    store: &dyn ProfileStore,
) -> Option<SessionChange> {
    let current = state.borrow().session.clone();
    let Some(session) = current else {
        return None;
    };

    match fetch_racing(events, store, session.user_id).await {
        FetchOutcome::Superseded(newer) => Some(newer),
        FetchOutcome::Resolved(result) => {
            apply_fetch_result(state, session.user_id, result);
            None
        }
    }
}

fn apply_fetch_result(
    state: &watch::Sender<AuthSnapshot>,
    user_id: Uuid,
    result: Result<UserProfile, ProfileFetchError>,
) {
    match result {
        Ok(profile) => state.send_modify(|s| {
            s.profile = Some(profile);
            s.ready = true;
        }),
        Err(e) => {
            // Fail-soft: absent profile plus one diagnostic, never an error
            // surfaced to consumers.
            warn!(error = %e, user_id = %user_id, "profile fetch failed");
            state.send_modify(|s| {
                s.profile = None;
                s.ready = true;
            });
        }
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
