//! Single-document JSON cache implementation
//!
//! [`SnapshotCache`] manages one JSON file at a fixed path. The file is the
//! serialized form of whatever document the caller hands in; this crate does
//! not interpret its contents beyond JSON framing.
//!
//! # Storage Layout
//!
//! ```text
//! <cache_path>          # one pretty-printed JSON document
//! ```
//!
//! Parent directories are created on first write, so a freshly provisioned
//! terminal needs no setup step before the store can persist.
//!
//! # Failure Model
//!
//! - [`load`](SnapshotCache::load) returns `Ok(None)` when the file does not
//!   exist, `Err(CacheError::Io)` when it exists but cannot be read, and
//!   `Err(CacheError::Document)` when its contents are not valid JSON for
//!   the requested type
//! - [`store`](SnapshotCache::store) reports directory-creation, encoding,
//!   and write failures; it never partially applies a document on top of an
//!   old one (the whole file is rewritten)

use crate::CacheError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Best-effort single-document JSON cache at a fixed filesystem path.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    /// Creates a cache handle for the given path.
    ///
    /// No I/O is performed; the file may or may not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and decodes the cached document, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the file exists but cannot be read, or
    /// `CacheError::Document` if its contents do not decode as `T`. A
    /// missing file is `Ok(None)`.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, CacheError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(CacheError::Io(error)),
        };

        let document = serde_json::from_str(&text)?;
        Ok(Some(document))
    }

    /// Serializes and writes the document, replacing any previous content.
    ///
    /// Creates parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Document` if the value cannot be serialized, or
    /// `CacheError::Io` if directories cannot be created or the file cannot
    /// be written.
    pub fn store<T: Serialize>(&self, document: &T) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Removes the cached document. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(CacheError::Io(error)),
        }
    }
}
