//! Configuration resolution for comix-ingest
//!
//! Ingest knobs resolve with ENV → TOML → built-in default priority.
//! Invalid values are reported and replaced by the default.

use comix_common::config::TomlConfig;
use std::time::Duration;
use tracing::{info, warn};

pub const CHUNK_SIZE_ENV: &str = "COMIX_CHUNK_SIZE";
pub const RENUMBER_PAGES_ENV: &str = "COMIX_RENUMBER_PAGES";

pub const DEFAULT_CHUNK_SIZE: usize = 10;
pub const DEFAULT_JOB_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Resolved ingest settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    /// Pages fetched per batch chunk
    pub chunk_size: usize,
    /// Rename pages sequentially when an archive is recreated
    pub renumber_pages: bool,
    /// Pause between scheduled ingestion passes
    pub job_interval: Duration,
    pub event_capacity: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            renumber_pages: false,
            job_interval: Duration::from_secs(DEFAULT_JOB_INTERVAL_SECONDS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl IngestSettings {
    pub fn resolve(toml_config: &TomlConfig) -> Self {
        let ingest = &toml_config.ingest;
        let defaults = Self::default();

        let chunk_size = positive_or_default(
            "chunk_size",
            env_value::<usize>(CHUNK_SIZE_ENV).or(ingest.chunk_size),
            defaults.chunk_size,
        );

        let renumber_pages = env_value::<bool>(RENUMBER_PAGES_ENV)
            .or(ingest.renumber_pages)
            .unwrap_or(defaults.renumber_pages);

        let interval = positive_or_default(
            "job_interval_seconds",
            ingest.job_interval_seconds.map(|s| s as usize),
            DEFAULT_JOB_INTERVAL_SECONDS as usize,
        );

        let event_capacity =
            positive_or_default("event_capacity", ingest.event_capacity, defaults.event_capacity);

        let settings = Self {
            chunk_size,
            renumber_pages,
            job_interval: Duration::from_secs(interval as u64),
            event_capacity,
        };
        info!(
            chunk_size = settings.chunk_size,
            renumber_pages = settings.renumber_pages,
            interval_secs = settings.job_interval.as_secs(),
            event_capacity = settings.event_capacity,
            "Ingest settings resolved"
        );
        settings
    }
}

/// Parsed environment variable; unparseable values are warned about and ignored
fn env_value<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring invalid environment value");
            None
        }
    }
}

fn positive_or_default(name: &str, value: Option<usize>, default: usize) -> usize {
    match value {
        Some(0) => {
            warn!(setting = name, default, "Setting must be positive, using default");
            default
        }
        Some(v) => v,
        None => default,
    }
}
