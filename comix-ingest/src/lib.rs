//! comix-ingest library interface
//!
//! Comic archive ingestion: content classification, archive adaptors,
//! chunked page jobs and the comic lifecycle state machine.

pub mod archive;
pub mod batch;
pub mod config;
pub mod content;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use crate::error::{ArchiveError, LoadError};

use archive::{ArchiveAdaptors, ArchiveLoader};
use batch::{JobFactory, JobScheduler};
use comix_common::events::EventBus;
use config::IngestSettings;
use content::EntryLoaderRegistry;
use lifecycle::LifecycleMachine;
use services::{ArchiveExporter, LibraryImporter};
use std::sync::Arc;
use store::ComicStore;

/// Shared services, wired once at startup
#[derive(Clone)]
pub struct IngestContext {
    pub store: Arc<dyn ComicStore>,
    pub events: EventBus,
    pub loader: ArchiveLoader,
    pub machine: Arc<LifecycleMachine>,
    pub scheduler: Arc<JobScheduler>,
    pub importer: Arc<LibraryImporter>,
    pub exporter: ArchiveExporter,
    pub settings: IngestSettings,
}

impl IngestContext {
    pub fn new(store: Arc<dyn ComicStore>, settings: IngestSettings) -> Self {
        let events = EventBus::new(settings.event_capacity);
        let loader = ArchiveLoader::new(
            Arc::new(ArchiveAdaptors::with_default_formats()),
            Arc::new(EntryLoaderRegistry::with_default_loaders()),
        );

        let machine = Arc::new(LifecycleMachine::new(
            store.clone(),
            loader.clone(),
            events.clone(),
            settings.renumber_pages,
        ));
        let scheduler = Arc::new(JobScheduler::new(JobFactory::new(
            store.clone(),
            loader.clone(),
            events.clone(),
            settings.chunk_size,
        )));
        let importer = Arc::new(LibraryImporter::new(
            store.clone(),
            machine.clone(),
            scheduler.clone(),
            events.clone(),
        ));
        let exporter = ArchiveExporter::new(loader.clone(), settings.renumber_pages);

        Self {
            store,
            events,
            loader,
            machine,
            scheduler,
            importer,
            exporter,
            settings,
        }
    }
}
