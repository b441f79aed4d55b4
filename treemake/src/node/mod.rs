//! Directory-scoped build context.
//!
//! A [`Node`] combines path resolution for its directory, the target-file
//! lifecycle (temp files, publishing, cleanup) and handles to the shared
//! cache and the owning platform.

mod path;
mod target_files;

pub use path::{DEFAULT_WWW_ROOT, MASK_WILDCARD, PathResolver, unmask_node_target_name};
pub use target_files::TMP_FILE_PREFIX;

use crate::logger::{Logger, TracingLogger};
use crate::platform::PlatformRoot;
use convenient_cache::Cache;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One declared build directory.
pub struct Node {
    path: String,
    paths: PathResolver,
    platform: Arc<dyn PlatformRoot>,
    cache: Arc<dyn Cache>,
    logger: Arc<dyn Logger>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path)
            .field("dir", &self.paths.dir())
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Bind the node at `path` (relative to the project root) to its
    /// platform and cache. Events go to a [`TracingLogger`] until
    /// [`Node::set_logger`] is called.
    pub fn new(path: &str, platform: Arc<dyn PlatformRoot>, cache: Arc<dyn Cache>) -> Self {
        let path = path.replace('\\', "/").trim_end_matches('/').to_string();
        let paths = PathResolver::new(platform.dir(), &path);
        Self {
            logger: Arc::new(TracingLogger::new(path.clone())),
            path,
            paths,
            platform,
            cache,
        }
    }

    /// Node path relative to the project root
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Node directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.paths.dir()
    }

    /// Project root
    #[must_use]
    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// Owning platform
    #[must_use]
    pub fn platform(&self) -> &Arc<dyn PlatformRoot> {
        &self.platform
    }

    /// Shared fingerprint cache
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Current logger
    #[must_use]
    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Replace the logger
    pub fn set_logger(&mut self, logger: Arc<dyn Logger>) {
        self.logger = logger;
    }

    /// See [`PathResolver::resolve_path`]
    #[must_use]
    pub fn resolve_path(&self, filename: &str) -> PathBuf {
        self.paths.resolve_path(filename)
    }

    /// See [`PathResolver::resolve_node_path`]
    #[must_use]
    pub fn resolve_node_path(&self, node_path: &str, filename: &str) -> PathBuf {
        self.paths.resolve_node_path(node_path, filename)
    }

    /// See [`PathResolver::unmask_node_target_name`]
    #[must_use]
    pub fn unmask_node_target_name(&self, node_path: &str, mask: &str) -> String {
        self.paths.unmask_node_target_name(node_path, mask)
    }

    /// See [`PathResolver::relative_path`]
    #[must_use]
    pub fn relative_path(&self, file_path: &Path) -> String {
        self.paths.relative_path(file_path)
    }

    /// See [`PathResolver::www_root_path`]
    #[must_use]
    pub fn www_root_path(&self, file_path: &Path, www_root: Option<&str>) -> String {
        self.paths.www_root_path(file_path, www_root)
    }
}
