//! Transition table
//!
//! (source, event) → (target, guard, action) as plain data, interpreted
//! by [`super::LifecycleMachine`].

use comix_common::events::{ComicState, LifecycleEvent};

/// Precondition checked before a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Skip (successfully) when file details already exist
    FileDetailsAbsent,
    /// Every page hashed and the metadata document read
    ContentsProcessed,
}

/// Work done before a transition commits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    PrepareForProcessing,
    LoadFileContents,
    MarkBlockedPages,
    CreateFileDetails,
    RecreateArchive,
    Relocate,
    UpdateDetails,
    ClearMetadata,
    RestoreToPipeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub source: ComicState,
    pub event: LifecycleEvent,
    pub target: ComicState,
    pub guard: Option<GuardKind>,
    pub action: Option<ActionKind>,
}

impl Transition {
    const fn new(source: ComicState, event: LifecycleEvent, target: ComicState) -> Self {
        Self {
            source,
            event,
            target,
            guard: None,
            action: None,
        }
    }

    const fn guarded(mut self, guard: GuardKind) -> Self {
        self.guard = Some(guard);
        self
    }

    const fn with_action(mut self, action: ActionKind) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransitionTable {
    transitions: Vec<Transition>,
}

impl TransitionTable {
    pub fn new(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }

    /// The comic lifecycle
    pub fn standard() -> Self {
        use ActionKind::*;
        use ComicState::*;
        use LifecycleEvent::*;

        let mut transitions = vec![
            Transition::new(Added, Imported, Unprocessed).with_action(PrepareForProcessing),
            Transition::new(Unprocessed, FileContentsLoaded, Unprocessed).with_action(LoadFileContents),
            Transition::new(Unprocessed, BlockedPagesMarked, Unprocessed).with_action(MarkBlockedPages),
            Transition::new(Unprocessed, FileDetailsCreated, Unprocessed)
                .guarded(GuardKind::FileDetailsAbsent)
                .with_action(CreateFileDetails),
            Transition::new(Unprocessed, ContentsProcessed, Stable).guarded(GuardKind::ContentsProcessed),
            Transition::new(Stable, ArchiveRecreated, Stable).with_action(RecreateArchive),
            Transition::new(Stable, ComicMoved, Stable).with_action(Relocate),
            Transition::new(Changed, ComicInfoUpdated, Stable).with_action(RecreateArchive),
            Transition::new(Changed, ArchiveRecreated, Stable).with_action(RecreateArchive),
            Transition::new(Changed, ContentsProcessed, Stable).guarded(GuardKind::ContentsProcessed),
            // The deleted state is the mark itself
            Transition::new(Added, MarkedForRemoval, Deleted),
            Transition::new(Stable, MarkedForRemoval, Deleted),
            Transition::new(Changed, MarkedForRemoval, Deleted),
            Transition::new(Deleted, UnmarkedForRemoval, Added).with_action(RestoreToPipeline),
        ];

        for source in [Stable, Changed] {
            transitions.push(Transition::new(source, DetailsUpdated, Changed).with_action(UpdateDetails));
            transitions.push(Transition::new(source, Scraped, Changed).with_action(UpdateDetails));
            transitions.push(Transition::new(source, MetadataCleared, Changed).with_action(ClearMetadata));
        }

        Self::new(transitions)
    }

    pub fn find(&self, source: ComicState, event: LifecycleEvent) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.source == source && t.event == event)
    }

    /// Events accepted in a state
    pub fn events_from(&self, source: ComicState) -> Vec<LifecycleEvent> {
        self.transitions
            .iter()
            .filter(|t| t.source == source)
            .map(|t| t.event)
            .collect()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}
