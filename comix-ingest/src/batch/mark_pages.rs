//! Deletion-mark processors
//!
//! Used by the blocked-page job and the mark/unmark-by-hash jobs. Pages
//! already in the requested state produce no write.

use super::job::ItemProcessor;
use super::ProcessError;
use crate::models::Page;
use async_trait::async_trait;

pub struct MarkForDeletionProcessor;

#[async_trait]
impl ItemProcessor for MarkForDeletionProcessor {
    async fn process(&self, mut page: Page) -> Result<Option<Page>, ProcessError> {
        if page.mark_for_deletion()? {
            Ok(Some(page))
        } else {
            Ok(None)
        }
    }
}

pub struct UnmarkForDeletionProcessor;

#[async_trait]
impl ItemProcessor for UnmarkForDeletionProcessor {
    async fn process(&self, mut page: Page) -> Result<Option<Page>, ProcessError> {
        if page.unmark_for_deletion()? {
            Ok(Some(page))
        } else {
            Ok(None)
        }
    }
}
