//! Comic lifecycle state machine
//!
//! A declarative transition table ([`table`]) evaluated by a small
//! interpreter ([`machine`]) which calls out to guards and actions.

pub mod actions;
pub mod guards;
pub mod machine;
pub mod table;

pub use actions::{ActionError, ActionOutcome, ActionRunner, EventPayload};
pub use guards::GuardOutcome;
pub use machine::{FireOutcome, LifecycleMachine};
pub use table::{ActionKind, GuardKind, Transition, TransitionTable};

use comix_common::events::{ComicState, LifecycleEvent};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Event {event} not accepted in state {state}")]
    TransitionNotAllowed {
        state: ComicState,
        event: LifecycleEvent,
    },

    #[error("Event {event} refused in state {state}: {reason}")]
    GuardViolation {
        state: ComicState,
        event: LifecycleEvent,
        reason: String,
    },

    #[error("Action for {event} failed in state {state}: {source}")]
    ActionFailed {
        state: ComicState,
        event: LifecycleEvent,
        #[source]
        source: ActionError,
    },

    #[error("Comic {comic_id} is removed")]
    Terminal { comic_id: Uuid },

    #[error("Only deleted comics can be purged (state {state})")]
    PurgeNotAllowed { state: ComicState },

    #[error("Comic not found: {0}")]
    ComicNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] comix_common::Error),
}
