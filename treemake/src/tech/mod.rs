//! Build steps producing target content.
//!
//! A tech receives a [`BuildContext`] describing one target and writes the
//! target through [`BuildContext::write_target`], which goes through a temp
//! file and is refused once the run is cancelled.

mod concat;
mod copy;
mod manifest;

pub use concat::ConcatTech;
pub use copy::CopyTech;
pub use manifest::ManifestTech;

use crate::cancel::CancelToken;
use crate::config::OptionMap;
use crate::error::{ConfigError, TechError};
use crate::node::Node;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A build step.
#[async_trait]
pub trait Tech: Send + Sync {
    /// Tech name as used in configuration
    fn name(&self) -> &str;

    /// Identity of this tech's configuration. A change invalidates every
    /// cache entry the tech produced.
    fn identity(&self) -> &str;

    /// Identity of everything that shapes the output for a run with the
    /// given `www_root`. Techs whose output embeds platform options must
    /// fold them in here.
    fn output_identity(&self, www_root: &str) -> String {
        let _ = www_root;
        self.identity().to_string()
    }

    /// Produce the target described by `ctx`.
    async fn build(&self, ctx: &BuildContext<'_>) -> Result<(), TechError>;
}

/// Everything a tech may use while building one target.
pub struct BuildContext<'a> {
    node: &'a Node,
    target: &'a str,
    sources: &'a [PathBuf],
    dependencies: &'a [PathBuf],
    www_root: &'a str,
    cancel: &'a CancelToken,
}

impl<'a> BuildContext<'a> {
    /// Context for building `target` in `node`.
    #[must_use]
    pub fn new(
        node: &'a Node,
        target: &'a str,
        sources: &'a [PathBuf],
        dependencies: &'a [PathBuf],
        www_root: &'a str,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            node,
            target,
            sources,
            dependencies,
            www_root,
            cancel,
        }
    }

    /// Node owning the target
    #[must_use]
    pub fn node(&self) -> &Node {
        self.node
    }

    /// Target name (already unmasked)
    #[must_use]
    pub fn target(&self) -> &str {
        self.target
    }

    /// Final path of the target
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.node.resolve_path(self.target)
    }

    /// Declared source files, resolved
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        self.sources
    }

    /// Final paths of the targets this target depends on
    #[must_use]
    pub fn dependencies(&self) -> &[PathBuf] {
        self.dependencies
    }

    /// Sources followed by dependency targets
    pub fn inputs(&self) -> impl Iterator<Item = &Path> {
        self.sources
            .iter()
            .chain(self.dependencies.iter())
            .map(PathBuf::as_path)
    }

    /// Prefix for URLs of generated assets
    #[must_use]
    pub fn www_root(&self) -> &str {
        self.www_root
    }

    /// Run-level cancellation
    #[must_use]
    pub fn cancel(&self) -> &CancelToken {
        self.cancel
    }

    /// Read an input file.
    ///
    /// # Errors
    ///
    /// `TechError::Io` if the file cannot be read.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, TechError> {
        tokio::fs::read(path).await.map_err(|e| TechError::io(path, e))
    }

    /// Write and publish the target.
    ///
    /// # Errors
    ///
    /// See [`Node::write_target_file`].
    pub async fn write_target(&self, contents: &[u8]) -> Result<PathBuf, TechError> {
        self.node
            .write_target_file(self.target, contents, self.cancel)
            .await
    }
}

/// Identity string for a tech configured with `options`.
#[must_use]
pub fn tech_identity(name: &str, options: &OptionMap) -> String {
    let encoded = serde_yaml::to_string(options).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    format!("{name}:{}", &hex::encode(hasher.finalize())[..16])
}

/// Instantiate a built-in tech by name.
///
/// # Errors
///
/// `ConfigError::UnknownTech` for an unknown name,
/// `ConfigError::InvalidOption` for malformed options.
pub fn create(name: &str, target: &str, options: &OptionMap) -> Result<Arc<dyn Tech>, ConfigError> {
    match name {
        ConcatTech::NAME => Ok(Arc::new(ConcatTech::from_options(options)?)),
        CopyTech::NAME => Ok(Arc::new(CopyTech::from_options(options))),
        ManifestTech::NAME => Ok(Arc::new(ManifestTech::from_options(options))),
        _ => Err(ConfigError::UnknownTech {
            tech: name.to_string(),
            target: target.to_string(),
        }),
    }
}

pub(crate) fn string_option(
    tech: &str,
    options: &OptionMap,
    option: &str,
) -> Result<Option<String>, ConfigError> {
    match options.get(option) {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(ConfigError::InvalidOption {
            tech: tech.to_string(),
            option: option.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}
