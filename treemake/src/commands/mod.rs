//! Treemake command-line interface
//!
//! - `make`: build targets incrementally
//! - `clean`: remove targets and leftover temp files
//! - `cache`: inspect or reset the fingerprint cache

use clap::{Parser, Subcommand};
use convenient_cache::FileCache;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use treemake::config::DEFAULT_MODE;
use treemake::{MakePlatform, ProjectConfig};

pub mod cache;
pub mod clean;
pub mod make;

pub type CommandResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Treemake - incremental build engine for directory-scoped asset trees
#[derive(Parser)]
#[command(name = "treemake")]
#[command(about = "Incremental, graph-parallel build engine for asset trees")]
#[command(version)]
pub struct Cli {
    /// Project root (containing treemake.yml)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build targets and everything they depend on
    Make {
        /// Target ids (node/path:target) or node paths; all targets if empty
        targets: Vec<String>,

        /// Rebuild this target even if it is up to date (repeatable)
        #[arg(long)]
        force: Vec<String>,

        /// Number of parallel workers (default: from config, else CPU count)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Configuration mode
        #[arg(short, long, default_value = DEFAULT_MODE)]
        mode: String,
    },

    /// Remove built targets and leftover temp files
    Clean {
        /// Target ids or node paths; everything if empty
        targets: Vec<String>,

        /// Configuration mode
        #[arg(short, long, default_value = DEFAULT_MODE)]
        mode: String,
    },

    /// Cache management operations
    Cache {
        /// Configuration mode
        #[arg(short, long, default_value = DEFAULT_MODE)]
        mode: String,

        #[command(subcommand)]
        operation: CacheOperation,
    },
}

#[derive(Subcommand)]
pub enum CacheOperation {
    /// Show cache location and size
    Info,

    /// Drop every cache entry
    Clear,
}

/// Loaded project: configuration and the cache it points to.
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
    pub cache: Arc<FileCache>,
}

impl Project {
    /// Load `treemake.yml` from `dir` and open the cache it points to.
    pub fn open(dir: &Path, mode: &str) -> CommandResult<Self> {
        let root = std::fs::canonicalize(dir)?;
        let config = ProjectConfig::load(&root)?;
        let options = config.resolve(mode)?;
        let cache = Arc::new(FileCache::open(&root, root.join(&options.cache_file))?);
        Ok(Self {
            root,
            config,
            cache,
        })
    }

    /// Platform over every declared node
    pub fn platform(&self, mode: &str) -> CommandResult<MakePlatform> {
        Ok(MakePlatform::from_config(
            &self.root,
            &self.config,
            mode,
            self.cache.clone(),
        )?)
    }
}
