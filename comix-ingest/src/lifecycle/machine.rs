//! Lifecycle interpreter
//!
//! Evaluates one event at a time per comic. Guard and action run against
//! a working copy; the comic is saved in its new state only once both have
//! succeeded, so a failed event leaves the stored comic untouched and the
//! event can be retried. An archive rewritten by the action is published
//! over the comic's file only after the new state is stored.

use super::actions::{ActionOutcome, ActionRunner, EventPayload};
use super::guards::{self, GuardOutcome};
use super::table::TransitionTable;
use super::LifecycleError;
use crate::archive::ArchiveLoader;
use crate::models::Comic;
use crate::store::ComicStore;
use chrono::Utc;
use comix_common::events::{ComicState, ComixEvent, EventBus, LifecycleEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Result of a successfully handled event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    Transitioned { from: ComicState, to: ComicState },
    /// Guard reported nothing to do; the comic was not touched
    Skipped { state: ComicState, reason: String },
}

impl FireOutcome {
    /// State of the comic after the event
    pub fn state(&self) -> ComicState {
        match self {
            FireOutcome::Transitioned { to, .. } => *to,
            FireOutcome::Skipped { state, .. } => *state,
        }
    }
}

type ComicLocks = Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive hold on one comic
///
/// Releasing it drops the comic's map entry once nobody else holds or
/// waits for the lock.
struct ComicLease<'a> {
    locks: &'a ComicLocks,
    comic_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ComicLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.comic_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.comic_id);
        }
    }
}

pub struct LifecycleMachine {
    store: Arc<dyn ComicStore>,
    table: TransitionTable,
    actions: ActionRunner,
    events: EventBus,
    locks: ComicLocks,
}

impl LifecycleMachine {
    pub fn new(
        store: Arc<dyn ComicStore>,
        loader: ArchiveLoader,
        events: EventBus,
        renumber: bool,
    ) -> Self {
        let actions = ActionRunner::new(store.clone(), loader, renumber);
        Self::with_table(store, TransitionTable::standard(), actions, events)
    }

    pub fn with_table(
        store: Arc<dyn ComicStore>,
        table: TransitionTable,
        actions: ActionRunner,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            table,
            actions,
            events,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    async fn acquire(&self, comic_id: Uuid) -> ComicLease<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(comic_id).or_default().clone()
        };
        ComicLease {
            locks: &self.locks,
            comic_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn load(&self, comic_id: Uuid) -> Result<Comic, LifecycleError> {
        self.store
            .get_comic(comic_id)
            .await?
            .ok_or(LifecycleError::ComicNotFound(comic_id))
    }

    /// Fire an event that carries no data
    pub async fn fire(&self, comic_id: Uuid, event: LifecycleEvent) -> Result<FireOutcome, LifecycleError> {
        self.fire_with(comic_id, event, EventPayload::None).await
    }

    pub async fn fire_with(
        &self,
        comic_id: Uuid,
        event: LifecycleEvent,
        payload: EventPayload,
    ) -> Result<FireOutcome, LifecycleError> {
        let _lease = self.acquire(comic_id).await;

        let comic = self.load(comic_id).await?;
        let state = comic.state;

        if state.is_terminal() {
            return Err(LifecycleError::Terminal { comic_id });
        }

        let transition = *self
            .table
            .find(state, event)
            .ok_or(LifecycleError::TransitionNotAllowed { state, event })?;

        if let Some(guard) = transition.guard {
            match guards::evaluate(guard, &comic) {
                GuardOutcome::Allow => {}
                GuardOutcome::Skip(reason) => {
                    debug!(comic_id = %comic_id, event = %event, reason = %reason, "Event skipped");
                    return Ok(FireOutcome::Skipped { state, reason });
                }
                GuardOutcome::Deny(reason) => {
                    warn!(comic_id = %comic_id, event = %event, reason = %reason, "Guard refused transition");
                    return Err(LifecycleError::GuardViolation { state, event, reason });
                }
            }
        }

        let ActionOutcome {
            comic: mut working,
            staged,
        } = match transition.action {
            Some(action) => self
                .actions
                .run(action, comic.clone(), &payload)
                .await
                .map_err(|source| LifecycleError::ActionFailed { state, event, source })?,
            None => ActionOutcome::from(comic.clone()),
        };

        working.state = transition.target;
        working.touch();
        // A staged archive dropped here is discarded with the failed save
        self.store.save_comic(&working).await?;

        if let Some(staged) = staged {
            if let Err(e) = staged.publish() {
                warn!(comic_id = %comic_id, event = %event, error = %e, "Archive publish failed, restoring comic record");
                if let Err(restore) = self.store.save_comic(&comic).await {
                    error!(comic_id = %comic_id, error = %restore, "Comic record could not be restored");
                }
                return Err(LifecycleError::ActionFailed {
                    state,
                    event,
                    source: e.into(),
                });
            }
        }

        info!(
            comic_id = %comic_id,
            event = %event,
            from = %state,
            to = %transition.target,
            "Comic transitioned"
        );
        self.events.emit_lossy(ComixEvent::ComicStateChanged {
            comic_id,
            old_state: state,
            new_state: transition.target,
            event: Some(event),
            timestamp: Utc::now(),
        });

        Ok(FireOutcome::Transitioned {
            from: state,
            to: transition.target,
        })
    }

    /// Move a deleted comic to its terminal state
    ///
    /// Not an event: only the external purge reaches `REMOVED`.
    pub async fn purge(&self, comic_id: Uuid) -> Result<(), LifecycleError> {
        let _lease = self.acquire(comic_id).await;

        let mut comic = self.load(comic_id).await?;
        if comic.state != ComicState::Deleted {
            return Err(LifecycleError::PurgeNotAllowed { state: comic.state });
        }

        comic.state = ComicState::Removed;
        comic.touch();
        self.store.save_comic(&comic).await?;

        info!(comic_id = %comic_id, "Comic purged");
        self.events.emit_lossy(ComixEvent::ComicStateChanged {
            comic_id,
            old_state: ComicState::Deleted,
            new_state: ComicState::Removed,
            event: None,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
