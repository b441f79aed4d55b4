//! Error types

use convenient_cache::CacheError;
use convenient_graph::GraphError;
use std::path::{Path, PathBuf};

/// Run-level failures. Any of these means no tech was executed.
#[derive(Debug, thiserror::Error)]
pub enum MakeError {
    /// The declared targets depend on each other in a loop
    #[error("Dependency cycle: {}", .chain.join(" -> "))]
    GraphCycle {
        /// Target ids forming the cycle, first and last element equal
        chain: Vec<String>,
    },

    /// A dependency reference does not name any declared target
    #[error("Target {target} depends on unknown target {dependency}")]
    UnknownTarget {
        /// Declaring target
        target: String,
        /// Unresolved reference
        dependency: String,
    },

    /// Two declarations produce the same target in the same node
    #[error("Target {0} is declared more than once")]
    DuplicateTarget(String),

    /// A requested or forced target is neither a declared target nor a node
    #[error("Nothing is declared for {0}")]
    NotDeclared(String),

    /// Invalid project configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Graph bookkeeping failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Cache bookkeeping failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Filesystem error outside of a tech run
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for platform operations
pub type MakeResult<T> = Result<T, MakeError>;

/// Why a single target failed to build.
#[derive(Debug, thiserror::Error)]
pub enum TechError {
    /// Temp-file creation, input reading or publishing failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The run was cancelled before the output could be published
    #[error("Build cancelled")]
    Cancelled,

    /// The tech rejected its inputs or configuration
    #[error("{0}")]
    Failed(String),

    /// The build succeeded but its fingerprint could not be recorded
    #[error("Cache update failed: {0}")]
    Cache(#[from] CacheError),
}

impl TechError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Problems reading or interpreting `treemake.yml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Configuration file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The configuration is not valid YAML or has the wrong shape
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A target names a tech that does not exist
    #[error("Unknown tech '{tech}' for target {target}")]
    UnknownTech {
        /// Declared tech name
        tech: String,
        /// Declaring target mask
        target: String,
    },

    /// A tech option has the wrong type
    #[error("Invalid option '{option}' for tech {tech}: {reason}")]
    InvalidOption {
        /// Tech name
        tech: String,
        /// Option name
        option: String,
        /// What is wrong with it
        reason: String,
    },
}
