//! Cache storage module
//!
//! This module provides persistent caching functionality using the system's
//! standard cache directory. Data is serialized to JSON format for storage,
//! wrapped in an envelope carrying the storage timestamp so entries can
//! expire after a configurable time-to-live.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to determine cache directory location
    #[error("Failed to determine cache directory location")]
    CacheDirectoryNotFound,

    /// Failed to create or access cache directory
    #[error("Failed to create cache directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read cached data
    #[error("Failed to read cache file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write cached data
    #[error("Failed to write cache file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize cached data
    #[error("Failed to deserialize cache file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize data for caching
    #[error("Failed to serialize data: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// On-disk envelope around a cached value
#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    /// Seconds since the Unix epoch when the entry was stored
    stored_at: u64,
    value: T,
}

/// A generic cache storage for serializable data
///
/// This structure provides persistent caching of data that implements
/// `Serialize` and `Deserialize`. Data is stored as JSON files in the
/// system's standard cache directory. Entries older than the configured
/// time-to-live are treated as misses on load.
pub(crate) struct CacheStorage<T> {
    /// The directory where cached data is stored
    cache_dir: PathBuf,
    /// Maximum entry age before a load counts as a miss; None keeps forever
    ttl: Option<Duration>,
    /// Phantom data for the generic type
    _phantom: PhantomData<T>,
}

impl<T> CacheStorage<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Opens or creates a cache storage with the given name and TTL
    ///
    /// The cache will be stored in the system's standard cache directory
    /// under a subdirectory named after the application and the provided
    /// name. Entries older than `ttl` are treated as absent.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let cache: CacheStorage<Vec<SubtitleCandidate>> =
    ///     CacheStorage::open("searches", Some(Duration::from_secs(3600)))?;
    /// ```
    pub fn open(name: &str, ttl: Option<Duration>) -> Result<Self, CacheError> {
        let proj_dirs = directories::ProjectDirs::from("io", "sublify", "sublify")
            .ok_or(CacheError::CacheDirectoryNotFound)?;

        let cache_dir = proj_dirs.cache_dir().join(sanitize_name(name));

        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::DirectoryCreationFailed {
            path: cache_dir.clone(),
            source: e,
        })?;

        Ok(Self {
            cache_dir,
            ttl,
            _phantom: PhantomData,
        })
    }

    /// Opens a cache storage rooted at an explicit directory
    ///
    /// Used by tests to avoid touching the real user cache directory.
    #[cfg(test)]
    pub fn open_at(cache_dir: PathBuf, ttl: Option<Duration>) -> Result<Self, CacheError> {
        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::DirectoryCreationFailed {
            path: cache_dir.clone(),
            source: e,
        })?;

        Ok(Self {
            cache_dir,
            ttl,
            _phantom: PhantomData,
        })
    }

    /// Loads cached data for the given identifier
    ///
    /// Returns `None` when no entry exists or the entry is older than the
    /// configured TTL. Returns an error only when an entry exists but cannot
    /// be read or deserialized.
    pub fn load(&self, identifier: &str) -> Result<Option<T>, CacheError> {
        let file_path = self.entry_path(identifier);

        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&file_path).map_err(|e| CacheError::ReadFailed {
            path: file_path.clone(),
            source: e,
        })?;

        let entry: CacheEntry<T> =
            serde_json::from_str(&content).map_err(|e| CacheError::DeserializationFailed {
                path: file_path.clone(),
                source: e,
            })?;

        if let Some(ttl) = self.ttl {
            let age = unix_now().saturating_sub(entry.stored_at);
            if age > ttl.as_secs() {
                // Stale entry: drop the file and report a miss
                let _ = fs::remove_file(&file_path);
                return Ok(None);
            }
        }

        Ok(Some(entry.value))
    }

    /// Stores data in the cache with the given identifier
    pub fn store(&self, identifier: &str, data: &T) -> Result<(), CacheError> {
        let file_path = self.entry_path(identifier);

        let entry = CacheEntry {
            stored_at: unix_now(),
            value: data,
        };
        let content = serde_json::to_string_pretty(&entry)?;

        fs::write(&file_path, content).map_err(|e| CacheError::WriteFailed {
            path: file_path,
            source: e,
        })?;

        Ok(())
    }

    /// Maps an arbitrary identifier to a file inside the cache directory
    ///
    /// Identifiers are hashed so that query strings of any length or content
    /// are safe to use as file names.
    fn entry_path(&self, identifier: &str) -> PathBuf {
        let digest = blake3::hash(identifier.as_bytes());
        self.cache_dir.join(format!("{}.json", digest.to_hex()))
    }
}

/// Seconds since the Unix epoch; zero if the clock is before the epoch
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Sanitizes a name for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
