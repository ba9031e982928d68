//! Transition actions
//!
//! Each action works on a copy of the comic and hands back the updated
//! copy; nothing is stored until the machine commits the transition.

use super::table::ActionKind;
use crate::archive::{ArchiveLoader, StagedArchive};
use crate::error::{ArchiveError, ExportError};
use crate::models::{Comic, ComicInfo, MetadataDocument, PageStateError, COMIC_INFO_ENTRY};
use crate::services::exporter::ArchiveExporter;
use crate::services::hashing::file_details_async;
use crate::store::ComicStore;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Data carried by an event
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EventPayload {
    #[default]
    None,
    /// New archive location for `comicMoved`
    MovedTo(PathBuf),
    /// Edited fields for `detailsUpdated` and `scraped`
    Details(ComicInfo),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    PageState(#[from] PageStateError),

    #[error(transparent)]
    Store(#[from] comix_common::Error),

    #[error("Event needs a payload: {0}")]
    MissingPayload(&'static str),

    #[error("Archive not found at {}", .0.display())]
    MissingArchive(PathBuf),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Updated comic, plus an archive to publish once it is stored
#[derive(Debug)]
pub struct ActionOutcome {
    pub comic: Comic,
    pub staged: Option<StagedArchive>,
}

impl From<Comic> for ActionOutcome {
    fn from(comic: Comic) -> Self {
        Self { comic, staged: None }
    }
}

/// Runs actions against the collaborators they need
#[derive(Clone)]
pub struct ActionRunner {
    store: Arc<dyn ComicStore>,
    loader: ArchiveLoader,
    exporter: ArchiveExporter,
}

impl ActionRunner {
    pub fn new(store: Arc<dyn ComicStore>, loader: ArchiveLoader, renumber: bool) -> Self {
        let exporter = ArchiveExporter::new(loader.clone(), renumber);
        Self {
            store,
            loader,
            exporter,
        }
    }

    pub async fn run(
        &self,
        action: ActionKind,
        mut comic: Comic,
        payload: &EventPayload,
    ) -> Result<ActionOutcome, ActionError> {
        debug!(comic_id = %comic.id, action = ?action, "Running action");

        let comic = match action {
            ActionKind::PrepareForProcessing | ActionKind::RestoreToPipeline => {
                comic.metadata_read = false;
                comic.file_details = None;
                comic
            }
            ActionKind::LoadFileContents => {
                let loader = self.loader.clone();
                tokio::task::spawn_blocking(move || {
                    loader.load_all(&mut comic)?;
                    Ok::<_, ActionError>(comic)
                })
                .await
                .map_err(|e| ActionError::Task(e.to_string()))??
            }
            ActionKind::MarkBlockedPages => {
                let blocked = self.store.find_blocked_hashes().await?;
                let mut marked = 0;
                for page in &mut comic.pages {
                    page.blocked = page.hash.as_ref().is_some_and(|h| blocked.contains(h));
                    if page.blocked && page.mark_for_deletion()? {
                        marked += 1;
                    }
                }
                info!(comic_id = %comic.id, marked, "Blocked pages marked");
                comic
            }
            ActionKind::CreateFileDetails => {
                comic.file_details = Some(file_details_async(comic.filename.clone()).await?);
                comic
            }
            ActionKind::RecreateArchive => {
                let exporter = self.exporter.clone();
                let (comic, recreated) = tokio::task::spawn_blocking(move || {
                    let recreated = exporter.recreate(&mut comic)?;
                    Ok::<_, ActionError>((comic, recreated))
                })
                .await
                .map_err(|e| ActionError::Task(e.to_string()))??;
                return Ok(ActionOutcome {
                    comic,
                    staged: Some(recreated.staged),
                });
            }
            ActionKind::Relocate => {
                let EventPayload::MovedTo(target) = payload else {
                    return Err(ActionError::MissingPayload("comicMoved needs the new path"));
                };
                if !tokio::fs::metadata(target).await.is_ok_and(|m| m.is_file()) {
                    return Err(ActionError::MissingArchive(target.clone()));
                }
                info!(
                    comic_id = %comic.id,
                    from = %comic.filename.display(),
                    to = %target.display(),
                    "Comic relocated"
                );
                comic.filename = target.clone();
                comic
            }
            ActionKind::UpdateDetails => {
                if let EventPayload::Details(info) = payload {
                    match comic.metadata.as_mut() {
                        Some(document) => {
                            document.info = info.clone();
                            document.raw.clear();
                        }
                        None => {
                            comic.metadata = Some(MetadataDocument {
                                entry_name: COMIC_INFO_ENTRY.to_string(),
                                raw: Vec::new(),
                                info: info.clone(),
                            });
                        }
                    }
                }
                comic
            }
            ActionKind::ClearMetadata => {
                comic.metadata = None;
                comic
            }
        };
        Ok(comic.into())
    }
}
