//! Entry loader registry
//!
//! Maps a classified content type to the loader that turns the entry's
//! bytes into comic state. Built once at startup and passed by reference.

use super::classifier::{ContentClassifier, ContentType};
use super::loaders::{ComicInfoLoader, PageImageLoader};
use crate::error::LoadError;
use crate::models::Comic;
use std::collections::HashMap;
use std::sync::Arc;

/// Loader capability for one kind of entry content
pub trait EntryLoader: Send + Sync {
    /// Loader name for logs
    fn name(&self) -> &'static str;

    /// Apply the entry to the comic being loaded
    fn load(
        &self,
        comic: &mut Comic,
        entry_name: &str,
        content_type: &ContentType,
        content: &[u8],
    ) -> Result<(), LoadError>;
}

/// Result of dispatching one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A loader accepted the entry
    Loaded {
        loader: &'static str,
        content_type: ContentType,
    },
    /// No loader registered for the content type
    Skipped { content_type: ContentType },
}

/// Registry of loaders keyed by content type
///
/// Lookup tries the exact "type/subtype" first, then a "type/*" wildcard.
pub struct EntryLoaderRegistry {
    classifier: ContentClassifier,
    exact: HashMap<String, Arc<dyn EntryLoader>>,
    wildcard: HashMap<String, Arc<dyn EntryLoader>>,
}

impl EntryLoaderRegistry {
    /// Empty registry
    pub fn new(classifier: ContentClassifier) -> Self {
        Self {
            classifier,
            exact: HashMap::new(),
            wildcard: HashMap::new(),
        }
    }

    /// Registry with the page image and ComicInfo loaders
    pub fn with_default_loaders() -> Self {
        let page_loader: Arc<dyn EntryLoader> = Arc::new(PageImageLoader);
        let comic_info_loader: Arc<dyn EntryLoader> = Arc::new(ComicInfoLoader);

        let mut registry = Self::new(ContentClassifier::new());
        registry.register("image/*", page_loader);
        registry.register("text/xml", Arc::clone(&comic_info_loader));
        registry.register("application/xml", comic_info_loader);
        registry
    }

    /// Register a loader for "type/subtype" or "type/*"
    pub fn register(&mut self, mime: &str, loader: Arc<dyn EntryLoader>) {
        let mime = mime.to_ascii_lowercase();
        match mime.strip_suffix("/*") {
            Some(media_type) => {
                self.wildcard.insert(media_type.to_string(), loader);
            }
            None => {
                self.exact.insert(mime, loader);
            }
        }
    }

    pub fn classifier(&self) -> &ContentClassifier {
        &self.classifier
    }

    pub fn lookup(&self, content_type: &ContentType) -> Option<&Arc<dyn EntryLoader>> {
        if content_type.is_unknown() {
            return None;
        }
        self.exact
            .get(&content_type.to_string())
            .or_else(|| self.wildcard.get(&content_type.media_type))
    }

    /// Classify an entry and hand it to the matching loader
    pub fn dispatch(
        &self,
        comic: &mut Comic,
        entry_name: &str,
        content: &[u8],
    ) -> Result<DispatchOutcome, LoadError> {
        let content_type = self.classifier.classify(content);

        match self.lookup(&content_type) {
            Some(loader) => {
                loader.load(comic, entry_name, &content_type, content)?;
                Ok(DispatchOutcome::Loaded {
                    loader: loader.name(),
                    content_type,
                })
            }
            None => Ok(DispatchOutcome::Skipped { content_type }),
        }
    }
}

impl Default for EntryLoaderRegistry {
    fn default() -> Self {
        Self::with_default_loaders()
    }
}
