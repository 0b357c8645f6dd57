//! Ward Snapshot Cache
//!
//! This crate provides the best-effort local cache used by the encounter
//! workflow store to survive process restarts.
//!
//! ## Design Principles
//!
//! - The cache holds exactly one JSON document per cache instance
//! - The in-memory store is the source of truth; the cache is a restart
//!   convenience, never a synchronisation point
//! - A missing cache file is a normal condition, not an error
//! - Read and write failures are reported as typed errors; the *policy* of
//!   swallowing them belongs to the caller, which keeps this crate honest
//!   about what actually happened on disk
//!
//! ## Example Usage
//!
//! ```no_run
//! use ward_cache::SnapshotCache;
//! use std::collections::BTreeMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = SnapshotCache::new("/var/cache/ward/encounters.json");
//!
//! let census: BTreeMap<String, u32> = BTreeMap::new();
//! cache.store(&census)?;
//!
//! let restored: Option<BTreeMap<String, u32>> = cache.load()?;
//! # Ok(())
//! # }
//! ```

mod cache;

pub use cache::SnapshotCache;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Cached document could not be parsed or the value could not be
    /// serialized
    #[error("Invalid cache document: {0}")]
    Document(#[from] serde_json::Error),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
