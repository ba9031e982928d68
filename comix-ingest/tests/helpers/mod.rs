//! Test Helper Utilities
//!
//! Shared utilities for testing comix-ingest

#![allow(dead_code)]

pub mod archives;
pub mod db_utils;
pub mod fixtures;
pub mod stores;

pub use archives::{entry_names, read_entry, write_test_archive};
pub use db_utils::{create_test_context, create_test_store};
pub use fixtures::{comic_info_xml, gif_image, jpeg_image, png_image};
pub use stores::FailingSaveStore;
