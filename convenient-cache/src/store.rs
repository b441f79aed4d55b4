//! Durable JSON-backed cache store

use crate::{Cache, CacheEntry, CacheError, CacheKey, CacheResult, ContentHash, InputFingerprint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

const FORMAT_VERSION: u32 = 2;

/// Entries are kept as raw JSON so one damaged entry only costs a miss for
/// its own key.
type RawEntries = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    nodes: RawEntries,
}

/// Hit/miss counters for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered "up to date"
    pub hits: usize,
    /// Lookups answered "stale"
    pub misses: usize,
    /// Entries currently held
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate as a percentage of all lookups
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Fingerprint cache persisted to a single JSON file.
pub struct FileCache {
    root: PathBuf,
    path: PathBuf,
    entries: Mutex<RawEntries>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl FileCache {
    /// Open the cache stored at `path` for the project rooted at `root`.
    ///
    /// A missing file yields an empty cache. A file that cannot be parsed,
    /// or was written by an incompatible version, is discarded with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the file exists but cannot be read.
    pub fn open(root: impl Into<PathBuf>, path: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        let path = path.into();

        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<CacheFile>(&bytes) {
                Ok(file) if file.version == FORMAT_VERSION => file.nodes,
                Ok(file) => {
                    warn!(
                        "Ignoring cache {} with format version {}",
                        path.display(),
                        file.version
                    );
                    RawEntries::new()
                }
                Err(e) => {
                    warn!("Ignoring unreadable cache {}: {}", path.display(), e);
                    RawEntries::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RawEntries::new(),
            Err(e) => return Err(CacheError::io(&path, e)),
        };

        debug!("Opened cache {} ({} nodes)", path.display(), entries.len());

        Ok(Self {
            root,
            path,
            entries: Mutex::new(entries),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        })
    }

    /// Location of the cache file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the cache using write-then-rename so a crash never leaves a
    /// truncated cache file behind.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the file cannot be written.
    pub fn save(&self) -> CacheResult<()> {
        let data = {
            let entries = self.entries();
            serde_json::to_vec_pretty(&CacheFile {
                version: FORMAT_VERSION,
                nodes: entries.clone(),
            })?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| CacheError::io(&temp_path, e))?;
        file.write_all(&data)
            .map_err(|e| CacheError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| CacheError::io(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| CacheError::io(&self.path, e))?;

        if let Some(parent) = self.path.parent()
            && let Ok(dir) = File::open(parent)
        {
            let _ = dir.sync_all();
        }

        debug!("Saved cache {}", self.path.display());
        Ok(())
    }

    /// Remove every entry. The file is rewritten on the next [`FileCache::save`].
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().values().map(BTreeMap::len).sum()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counters accumulated since the cache was opened
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn entries(&self) -> MutexGuard<'_, RawEntries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        let raw = self
            .entries()
            .get(key.node())
            .and_then(|targets| targets.get(key.target()))
            .cloned()?;

        match serde_json::from_value(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Discarding corrupt cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Key under which an input path is recorded: relative to the project
    /// root with forward slashes, or the path as given when it lies outside.
    fn input_id(&self, input: &Path) -> String {
        match input.strip_prefix(&self.root) {
            Ok(relative)
                if relative
                    .components()
                    .all(|c| matches!(c, Component::Normal(_))) =>
            {
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            }
            _ => input.to_string_lossy().replace('\\', "/"),
        }
    }

    fn fingerprints(&self, inputs: &[PathBuf]) -> CacheResult<Vec<InputFingerprint>> {
        inputs
            .iter()
            .map(|input| {
                Ok(InputFingerprint {
                    path: self.input_id(input),
                    hash: ContentHash::of_file(input)?,
                })
            })
            .collect()
    }

    fn check(&self, key: &CacheKey, target: &Path, inputs: &[PathBuf], tech: &str) -> bool {
        let Some(entry) = self.lookup(key) else {
            debug!("{}: no cache entry", key);
            return false;
        };

        if entry.tech != tech {
            debug!("{}: tech configuration changed", key);
            return false;
        }

        if !target.exists() {
            debug!("{}: target file missing", key);
            return false;
        }

        match self.fingerprints(inputs) {
            Ok(current) if current == entry.inputs => true,
            Ok(_) => {
                debug!("{}: inputs changed", key);
                false
            }
            Err(e) => {
                debug!("{}: cannot fingerprint inputs: {}", key, e);
                false
            }
        }
    }
}

impl Cache for FileCache {
    fn is_up_to_date(&self, key: &CacheKey, target: &Path, inputs: &[PathBuf], tech: &str) -> bool {
        let fresh = self.check(key, target, inputs, tech);
        let counter = if fresh { &self.hits } else { &self.misses };
        let _ = counter.fetch_add(1, Ordering::Relaxed);
        fresh
    }

    fn store(&self, key: &CacheKey, inputs: &[PathBuf], tech: &str) -> CacheResult<()> {
        let entry = CacheEntry {
            inputs: self.fingerprints(inputs)?,
            tech: tech.to_string(),
        };
        let value = serde_json::to_value(entry)?;

        let _ = self
            .entries()
            .entry(key.node().to_string())
            .or_default()
            .insert(key.target().to_string(), value);
        Ok(())
    }

    fn invalidate(&self, key: &CacheKey) {
        let mut entries = self.entries();
        if let Some(targets) = entries.get_mut(key.node()) {
            let _ = targets.remove(key.target());
            if targets.is_empty() {
                let _ = entries.remove(key.node());
            }
        }
    }
}
