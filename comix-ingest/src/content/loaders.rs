//! Built-in entry loaders

use super::classifier::ContentType;
use super::dimensions::image_dimensions;
use super::registry::EntryLoader;
use crate::error::LoadError;
use crate::models::{Comic, ComicInfo, ComicInfoError, MetadataDocument};
use tracing::{debug, warn};

/// Creates one page per image entry
///
/// Pages are appended, so callers feed entries in page order.
pub struct PageImageLoader;

impl EntryLoader for PageImageLoader {
    fn name(&self) -> &'static str {
        "page-image"
    }

    fn load(
        &self,
        comic: &mut Comic,
        entry_name: &str,
        content_type: &ContentType,
        content: &[u8],
    ) -> Result<(), LoadError> {
        let dimensions = image_dimensions(content);
        let page = comic.push_page(entry_name);

        if let Some((width, height)) = dimensions {
            page.width = width;
            page.height = height;
        }

        debug!(
            entry = %entry_name,
            content_type = %content_type,
            page_number = page.page_number,
            width = page.width,
            height = page.height,
            "Page created"
        );
        Ok(())
    }
}

/// Reads the ComicInfo metadata document
///
/// Only the first document found is kept. XML entries with another root
/// element are rejected and the load carries on without them.
pub struct ComicInfoLoader;

impl EntryLoader for ComicInfoLoader {
    fn name(&self) -> &'static str {
        "comic-info"
    }

    fn load(
        &self,
        comic: &mut Comic,
        entry_name: &str,
        _content_type: &ContentType,
        content: &[u8],
    ) -> Result<(), LoadError> {
        if let Some(existing) = &comic.metadata {
            warn!(
                entry = %entry_name,
                kept = %existing.entry_name,
                "Second metadata document ignored"
            );
            return Ok(());
        }

        let info = match ComicInfo::parse(content) {
            Ok(info) => info,
            Err(source @ ComicInfoError::WrongRoot(_)) => {
                return Err(LoadError::Metadata {
                    entry: entry_name.to_string(),
                    source,
                });
            }
            Err(e) => {
                warn!(entry = %entry_name, error = %e, "ComicInfo has unreadable fields, keeping the readable ones");
                ComicInfo::parse_fields(content)
            }
        };

        debug!(entry = %entry_name, series = ?info.series, "Metadata document read");
        comic.metadata = Some(MetadataDocument {
            entry_name: entry_name.to_string(),
            raw: content.to_vec(),
            info,
        });
        Ok(())
    }
}
