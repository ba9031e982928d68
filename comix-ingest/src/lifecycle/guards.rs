//! Transition guards

use super::table::GuardKind;
use crate::models::Comic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    /// Nothing to do: the event succeeds without running the action
    Skip(String),
    Deny(String),
}

pub fn evaluate(guard: GuardKind, comic: &Comic) -> GuardOutcome {
    match guard {
        GuardKind::FileDetailsAbsent => match &comic.file_details {
            Some(details) => GuardOutcome::Skip(format!("file details already recorded ({})", details.hash)),
            None => GuardOutcome::Allow,
        },
        GuardKind::ContentsProcessed => {
            let unhashed = comic.unhashed_page_count();
            if unhashed > 0 {
                GuardOutcome::Deny(format!("{} page(s) without a hash", unhashed))
            } else if !comic.metadata_read {
                GuardOutcome::Deny("metadata document not read".to_string())
            } else {
                GuardOutcome::Allow
            }
        }
    }
}
