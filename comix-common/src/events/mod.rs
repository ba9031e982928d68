//! Event types for the comix event system
//!
//! Provides shared event definitions and the EventBus used to report
//! progress to observers.

mod job_types;
mod lifecycle_types;

pub use job_types::{JobRunStatus, ProgressStatus};
pub use lifecycle_types::{ComicState, LifecycleEvent};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Comix event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ComixEvent {
    /// Batch job progress, emitted before and after every chunk
    JobProgress(ProgressStatus),

    /// Batch job run finished
    JobCompleted {
        /// Job name
        job: String,
        /// How the run ended
        status: JobRunStatus,
        /// Items written back to the store
        written: u64,
        /// Items whose processing failed
        failures: u64,
        /// When the run ended
        timestamp: DateTime<Utc>,
    },

    /// Comic moved to a new lifecycle state
    ComicStateChanged {
        /// Comic identifier
        comic_id: Uuid,
        /// State before the transition
        old_state: ComicState,
        /// State after the transition
        new_state: ComicState,
        /// Event that triggered the transition, None for an external purge
        event: Option<LifecycleEvent>,
        /// When the transition committed
        timestamp: DateTime<Utc>,
    },

    /// Comic registered from a file in the library
    ComicAdded {
        /// Comic identifier
        comic_id: Uuid,
        /// Archive path
        filename: String,
        /// When the comic was registered
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus
///
/// Wraps a tokio broadcast channel. Slow subscribers lose the oldest events
/// once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ComixEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use comix_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ComixEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ComixEvent,
    ) -> Result<usize, broadcast::error::SendError<ComixEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ComixEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
