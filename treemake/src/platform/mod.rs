//! The make platform: owns the project root, the nodes and the target
//! declarations, and turns them into a scheduled, cached build.

mod plan;
mod report;
mod scheduler;

pub use report::{MakeReport, SkipReason, TargetOutcome};

use crate::cancel::CancelToken;
use crate::config::{MakeOptions, ProjectConfig};
use crate::error::{MakeError, MakeResult};
use crate::logger::Logger;
use crate::node::Node;
use crate::tech::{self, Tech};
use convenient_cache::{Cache, KeyLocks};
use plan::BuildPlan;
use scheduler::RunContext;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Access to the project root, as needed by nodes.
pub trait PlatformRoot: Send + Sync {
    /// Absolute project root directory
    fn dir(&self) -> &Path;
}

/// Plain [`PlatformRoot`] over a directory.
#[derive(Debug, Clone)]
pub struct ProjectRoot(PathBuf);

impl ProjectRoot {
    /// Root at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self(dir.into())
    }
}

impl PlatformRoot for ProjectRoot {
    fn dir(&self) -> &Path {
        &self.0
    }
}

/// A target to declare in a node.
#[derive(Clone)]
pub struct TargetSpec {
    /// Target name or mask
    pub target: String,
    /// Tech producing the target
    pub tech: Arc<dyn Tech>,
    /// Source files relative to the node directory
    pub sources: Vec<String>,
    /// `target` in the same node or `node/path:target`
    pub depends: Vec<String>,
}

impl TargetSpec {
    /// Target without sources or dependencies
    pub fn new(target: impl Into<String>, tech: Arc<dyn Tech>) -> Self {
        Self {
            target: target.into(),
            tech,
            sources: Vec::new(),
            depends: Vec::new(),
        }
    }

    /// Add source files
    #[must_use]
    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Add dependency references
    #[must_use]
    pub fn depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends.extend(depends.into_iter().map(Into::into));
        self
    }
}

/// What to build in one run.
#[derive(Debug, Clone, Default)]
pub struct MakeRequest {
    /// Target ids or node paths; empty builds everything
    pub targets: Vec<String>,
    /// Target ids or node paths that must be rebuilt regardless of the cache
    pub force: Vec<String>,
    /// Stops scheduling once triggered
    pub cancel: CancelToken,
}

/// Result of [`MakePlatform::clean`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Target files removed
    pub targets: usize,
    /// Leftover temp files removed
    pub tmp_files: usize,
}

/// Graph scheduler over all declared nodes.
pub struct MakePlatform {
    root: Arc<ProjectRoot>,
    options: MakeOptions,
    cache: Arc<dyn Cache>,
    logger: Option<Arc<dyn Logger>>,
    nodes: BTreeMap<String, Arc<Node>>,
    declarations: Vec<(String, TargetSpec)>,
    locks: Arc<KeyLocks>,
}

impl PlatformRoot for MakePlatform {
    fn dir(&self) -> &Path {
        self.root.dir()
    }
}

impl MakePlatform {
    /// Empty platform for the project at `root`.
    pub fn new(root: impl Into<PathBuf>, options: MakeOptions, cache: Arc<dyn Cache>) -> Self {
        Self {
            root: Arc::new(ProjectRoot::new(root)),
            options,
            cache,
            logger: None,
            nodes: BTreeMap::new(),
            declarations: Vec::new(),
            locks: Arc::new(KeyLocks::new()),
        }
    }

    /// Platform with the nodes and targets of `config`, options resolved
    /// for `mode`.
    ///
    /// # Errors
    ///
    /// `MakeError::Config` for invalid options or unknown techs.
    pub fn from_config(
        root: impl Into<PathBuf>,
        config: &ProjectConfig,
        mode: &str,
        cache: Arc<dyn Cache>,
    ) -> MakeResult<Self> {
        let options = config.resolve(mode)?;
        info!("Mode '{}': {} workers, www root {}", mode, options.jobs, options.www_root);

        let mut platform = Self::new(root, options, cache);
        for node in &config.nodes {
            let _ = platform.add_node(&node.path);
            for decl in &node.targets {
                let tech = tech::create(&decl.tech, &decl.target, &decl.options)?;
                platform.declare(
                    &node.path,
                    TargetSpec::new(&decl.target, tech)
                        .sources(decl.sources.iter().cloned())
                        .depends(decl.depends.iter().cloned()),
                );
            }
        }
        Ok(platform)
    }

    /// Use `logger` for every node created from now on.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Resolved options
    #[must_use]
    pub fn options(&self) -> &MakeOptions {
        &self.options
    }

    /// Mutable options, e.g. to apply command-line overrides
    pub fn options_mut(&mut self) -> &mut MakeOptions {
        &mut self.options
    }

    /// Shared cache
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Get or create the node at `path`.
    pub fn add_node(&mut self, path: &str) -> Arc<Node> {
        let key = normalize_node_path(path);
        if let Some(node) = self.nodes.get(&key) {
            return Arc::clone(node);
        }

        let mut node = Node::new(&key, self.root.clone(), Arc::clone(&self.cache));
        if let Some(logger) = &self.logger {
            node.set_logger(Arc::clone(logger));
        }
        let node = Arc::new(node);
        let _ = self.nodes.insert(key, Arc::clone(&node));
        node
    }

    /// Node at `path`, if declared
    #[must_use]
    pub fn node(&self, path: &str) -> Option<&Arc<Node>> {
        self.nodes.get(&normalize_node_path(path))
    }

    /// All declared nodes keyed by path
    #[must_use]
    pub fn nodes(&self) -> &BTreeMap<String, Arc<Node>> {
        &self.nodes
    }

    /// Declare a target in the node at `node_path`, creating the node if
    /// needed.
    pub fn declare(&mut self, node_path: &str, spec: TargetSpec) {
        let node = self.add_node(node_path);
        self.declarations.push((node.path().to_string(), spec));
    }

    /// Ids (`node/path:target`) of all declared targets, in declaration
    /// order.
    ///
    /// # Errors
    ///
    /// Fails like [`MakePlatform::make`] on an invalid graph.
    pub fn targets(&self) -> MakeResult<Vec<String>> {
        let plan = self.plan()?;
        plan.graph
            .node_ids()
            .map(|id| plan.target(id).map(|target| target.id.clone()))
            .collect()
    }

    fn plan(&self) -> MakeResult<BuildPlan> {
        BuildPlan::build(&self.nodes, &self.declarations)
    }

    /// Build the requested targets and their dependencies.
    ///
    /// Returns `Err` only when the graph itself is invalid, in which case
    /// nothing was built. Individual target failures are reported in the
    /// returned [`MakeReport`].
    ///
    /// # Errors
    ///
    /// `MakeError::GraphCycle`, `MakeError::UnknownTarget`,
    /// `MakeError::DuplicateTarget` or `MakeError::NotDeclared`.
    pub async fn make(&self, request: MakeRequest) -> MakeResult<MakeReport> {
        let start = Instant::now();
        let plan = self.plan()?;

        let selected = plan.select(&request.targets)?;
        let mut forced = HashSet::new();
        for name in &request.force {
            forced.extend(plan.lookup(name)?);
        }

        let ctx = RunContext {
            cache: Arc::clone(&self.cache),
            locks: Arc::clone(&self.locks),
            cancel: request.cancel,
            www_root: Arc::from(self.options.www_root.as_str()),
            jobs: self.options.jobs,
        };
        let outcomes = scheduler::run(Arc::new(plan), &selected, &forced, ctx).await?;

        let report = MakeReport::new(outcomes, start.elapsed());
        info!(
            "Build finished: {} built, {} up to date, {} failed, {} skipped",
            report.built(),
            report.up_to_date(),
            report.failed().count(),
            report.skipped().count()
        );
        Ok(report)
    }

    /// Remove the target files of the requested targets (and their
    /// dependencies; everything when empty), drop their cache entries and
    /// sweep leftover temp files from the affected nodes.
    ///
    /// # Errors
    ///
    /// Graph errors as for [`MakePlatform::make`], or `MakeError::Io`.
    pub fn clean(&self, targets: &[String]) -> MakeResult<CleanReport> {
        let plan = self.plan()?;
        let mut report = CleanReport::default();
        let mut swept = HashSet::new();

        for id in plan.select(targets)? {
            let target = plan.target(id)?;
            if target.node.clean_target_file(&target.name)? {
                report.targets += 1;
            }
            self.cache.invalidate(&target.key);

            if swept.insert(target.node.path().to_string()) {
                report.tmp_files += target.node.clean_tmp_files()?;
            }
        }

        info!(
            "Cleaned {} targets, {} temp files",
            report.targets, report.tmp_files
        );
        Ok(report)
    }
}

fn normalize_node_path(path: &str) -> String {
    path.replace('\\', "/").trim_end_matches('/').to_string()
}
