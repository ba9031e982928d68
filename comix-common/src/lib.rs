//! # Comix Common Library
//!
//! Shared code for the comix services including:
//! - Error type used at the storage seam
//! - Bootstrap configuration loading and root folder resolution
//! - Event types (ComixEvent enum) and the EventBus
//! - Database initialization

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
