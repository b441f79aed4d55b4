//! Local fingerprint cache for incremental builds
//!
//! Decides, for a `(node, target)` pair, whether the target has to be rebuilt.
//! An entry records the content hash of every declared input observed at the
//! last successful build together with the identity of the tech
//! configuration that produced it. The entry is only trusted while all of
//! the following hold:
//!
//! - every input still hashes to the recorded value,
//! - the tech configuration identity is unchanged,
//! - the target file is still present on disk.
//!
//! Entries are keyed by project-root-relative paths so the persisted cache
//! stays valid when a checkout moves to another absolute location.
//!
//! # Example
//!
//! ```no_run
//! use convenient_cache::{Cache, CacheKey, FileCache};
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = Path::new("/srv/project");
//! let cache = FileCache::open(root, root.join(".treemake/cache.json"))?;
//!
//! let key = CacheKey::new("blocks/button", "button.js");
//! let target = root.join("blocks/button/button.js");
//! let inputs = vec![root.join("blocks/button/button.src.js")];
//!
//! if !cache.is_up_to_date(&key, &target, &inputs, "concat:v1") {
//!     // ... rebuild target ...
//!     cache.store(&key, &inputs, "concat:v1")?;
//! }
//! cache.save()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

mod locks;
mod store;

pub use locks::KeyLocks;
pub use store::{CacheStats, FileCache};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Error types for cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading an input or writing the cache file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The cache could not be serialized
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CacheError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Content hash (SHA256, lowercase hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Calculate SHA256 hash of content
    #[must_use]
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hex::encode(hasher.finalize()))
    }

    /// Calculate SHA256 hash of a file's content, streaming it through the
    /// hasher.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the file cannot be read
    pub fn of_file(path: &Path) -> CacheResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| CacheError::io(path, e))?;
        let mut hasher = Sha256::new();
        let _ = std::io::copy(&mut std::io::BufReader::new(file), &mut hasher)
            .map_err(|e| CacheError::io(path, e))?;
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Get the hash as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one target of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    node: String,
    target: String,
}

impl CacheKey {
    /// Create a key from a node path (relative to the project root) and a
    /// target name. Backslashes in the node path are normalized.
    pub fn new(node: impl AsRef<str>, target: impl Into<String>) -> Self {
        Self {
            node: node.as_ref().replace('\\', "/"),
            target: target.into(),
        }
    }

    /// Node path relative to the project root
    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Target name
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.target)
    }
}

/// Fingerprint of one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFingerprint {
    /// Input path, project-root-relative when possible
    pub path: String,
    /// Content hash at build time
    pub hash: ContentHash,
}

/// What the cache remembers about one successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Inputs in the order the tech received them; reordering or repeating
    /// an input changes the entry
    pub inputs: Vec<InputFingerprint>,
    /// Identity of the tech configuration that built the target
    pub tech: String,
}

/// Staleness oracle consulted by the scheduler.
///
/// Implementations must be safe to share between workers; callers serialize
/// the check-build-store sequence for a key with [`KeyLocks`].
pub trait Cache: Send + Sync {
    /// Whether `target` can be reused without running its tech.
    ///
    /// Any missing entry, unreadable entry, changed input, changed tech
    /// identity or missing target file is a miss.
    fn is_up_to_date(&self, key: &CacheKey, target: &Path, inputs: &[PathBuf], tech: &str) -> bool;

    /// Record the current fingerprints of `inputs` for `key`, replacing any
    /// previous entry.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if an input cannot be read.
    fn store(&self, key: &CacheKey, inputs: &[PathBuf], tech: &str) -> CacheResult<()>;

    /// Drop the entry for `key`, if any.
    fn invalidate(&self, key: &CacheKey);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        let hash = ContentHash::from_content(b"module.exports = 1;");
        assert_eq!(hash.as_str().len(), 64);
        assert_eq!(hash, ContentHash::from_content(b"module.exports = 1;"));
        assert_ne!(hash, ContentHash::from_content(b"module.exports = 2;"));
    }

    #[test]
    fn test_cache_key_normalizes_separators() {
        let key = CacheKey::new("blocks\\button", "button.js");
        assert_eq!(key.node(), "blocks/button");
        assert_eq!(key.to_string(), "blocks/button:button.js");
    }
}
