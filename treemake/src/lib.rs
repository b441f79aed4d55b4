//! Treemake - incremental, graph-parallel build engine for directory-scoped
//! asset trees
//!
//! A project is a set of nodes (directories). Each node declares targets
//! produced by techs from source files and from targets of other nodes.
//! [`MakePlatform`] resolves the declarations into a dependency graph and
//! builds it:
//! 1. Cycle and reference checks before anything runs
//! 2. Parallel execution, bounded by the configured number of workers
//! 3. Content-hash cache lookups so unchanged targets are not rebuilt
//! 4. Atomic publishing of outputs through temp files
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use convenient_cache::FileCache;
//! use treemake::{MakeOptions, MakePlatform, MakeRequest, TargetSpec, tech::CopyTech};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(FileCache::open("/project", "/project/.treemake/cache.json")?);
//! let mut platform = MakePlatform::new("/project", MakeOptions::default(), cache);
//! platform.declare(
//!     "pages/index",
//!     TargetSpec::new("?.html", Arc::new(CopyTech::default())).sources(["index.src.html"]),
//! );
//! let report = platform.make(MakeRequest::default()).await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod logger;
pub mod node;
pub mod platform;
pub mod tech;

pub use cancel::CancelToken;
pub use config::{MakeOptions, ProjectConfig};
pub use error::{ConfigError, MakeError, MakeResult, TechError};
pub use logger::{Logger, TracingLogger};
pub use node::Node;
pub use platform::{
    CleanReport, MakePlatform, MakeReport, MakeRequest, PlatformRoot, ProjectRoot, SkipReason,
    TargetOutcome, TargetSpec,
};
pub use tech::{BuildContext, Tech};
