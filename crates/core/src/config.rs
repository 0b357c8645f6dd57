//! Store runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the
//! store. Nothing here is read from the environment during operation, which
//! keeps behaviour consistent across threads and test harnesses.

use crate::encounter::EncounterRecord;
use std::path::{Path, PathBuf};

/// Configuration for an [`EncounterStore`](crate::EncounterStore), resolved
/// at startup.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    cache_path: PathBuf,
    seed: Vec<EncounterRecord>,
}

impl StoreConfig {
    /// Creates a configuration with the given cache file path and no seeded
    /// census.
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            seed: Vec::new(),
        }
    }

    /// Sets the default census the store starts from.
    ///
    /// Cached state takes precedence: on hydration, a cached entry for the
    /// same patient id is merged over its seeded record field by field.
    pub fn with_seed(mut self, seed: Vec<EncounterRecord>) -> Self {
        self.seed = seed;
        self
    }

    /// Path of the best-effort snapshot cache file.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// The seeded default census.
    pub fn seed(&self) -> &[EncounterRecord] {
        &self.seed
    }
}
