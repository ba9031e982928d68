//! Data models for the ingest service

pub mod blocked_hash;
pub mod comic;
pub mod comic_info;
pub mod page;

pub use blocked_hash::{
    deleted_pages, duplicate_pages, BlockedHash, DeletedPageAndComic, DuplicatePage,
};
pub use comic::{Comic, FileDetails};
pub use comic_info::{ComicInfo, ComicInfoError, MetadataDocument, COMIC_INFO_ENTRY};
pub use page::{Page, PageId, PageState, PageStateError};
