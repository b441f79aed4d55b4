//! Graph-parallel execution of a build plan.
//!
//! A target is spawned once every dependency ended `UpToDate` or `Built`,
//! with at most `jobs` targets in flight. A failure marks every transitive
//! dependent `Skipped` while unrelated branches keep going.

use super::plan::BuildPlan;
use super::report::{SkipReason, TargetOutcome};
use crate::cancel::CancelToken;
use crate::error::{MakeResult, TechError};
use crate::tech::BuildContext;
use convenient_cache::{Cache, KeyLocks};
use convenient_graph::NodeId;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Shared collaborators for one run
#[derive(Clone)]
pub(crate) struct RunContext {
    pub cache: Arc<dyn Cache>,
    pub locks: Arc<KeyLocks>,
    pub cancel: CancelToken,
    pub www_root: Arc<str>,
    pub jobs: usize,
}

enum Progress {
    Pending,
    Building,
    Done(TargetOutcome),
}

/// Build the `selected` targets of `plan`; `forced` targets ignore cache
/// hits. Returns the outcome of every selected target keyed by target id.
pub(crate) async fn run(
    plan: Arc<BuildPlan>,
    selected: &HashSet<NodeId>,
    forced: &HashSet<NodeId>,
    ctx: RunContext,
) -> MakeResult<BTreeMap<String, TargetOutcome>> {
    let mut progress: HashMap<NodeId, Progress> = HashMap::new();
    let mut waiting: HashMap<NodeId, usize> = HashMap::new();
    let mut ready: VecDeque<NodeId> = VecDeque::new();

    for id in plan.graph.topological_order()? {
        if !selected.contains(&id) {
            continue;
        }
        let _ = progress.insert(id, Progress::Pending);
        match plan.graph.dependencies(id)?.len() {
            0 => ready.push_back(id),
            count => {
                let _ = waiting.insert(id, count);
            }
        }
    }

    let jobs = ctx.jobs.max(1);
    info!("Building {} targets with {} workers", progress.len(), jobs);

    let mut running = JoinSet::new();
    let mut tasks = HashMap::new();

    loop {
        while running.len() < jobs && !ctx.cancel.is_cancelled() {
            let Some(id) = ready.pop_front() else { break };
            if !matches!(progress.get(&id), Some(Progress::Pending)) {
                continue;
            }
            let _ = progress.insert(id, Progress::Building);
            let handle = running.spawn(build_target(
                Arc::clone(&plan),
                id,
                forced.contains(&id),
                ctx.clone(),
            ));
            let _ = tasks.insert(handle.id(), id);
        }

        let Some(joined) = running.join_next_with_id().await else {
            break;
        };
        let (task_id, result) = match joined {
            Ok((task_id, result)) => (task_id, result),
            Err(e) => (e.id(), Err(TechError::Failed(format!("tech aborted: {e}")))),
        };
        let Some(id) = tasks.remove(&task_id) else {
            continue;
        };

        match result {
            Ok(outcome) => {
                let _ = progress.insert(id, Progress::Done(outcome));
                for &dependent in plan.graph.dependents(id)? {
                    let Some(count) = waiting.get_mut(&dependent) else {
                        continue;
                    };
                    *count -= 1;
                    if *count == 0 {
                        let _ = waiting.remove(&dependent);
                        ready.push_back(dependent);
                    }
                }
            }
            Err(TechError::Cancelled) => {
                let _ = progress.insert(
                    id,
                    Progress::Done(TargetOutcome::Skipped {
                        reason: SkipReason::Cancelled,
                    }),
                );
            }
            Err(e) => {
                let failed = plan.target(id)?.id.clone();
                error!("✗ FAILED     {}: {}", failed, e);
                let _ = progress.insert(
                    id,
                    Progress::Done(TargetOutcome::Failed {
                        cause: e.to_string(),
                    }),
                );
                for dependent in plan.graph.transitive_dependents(id)? {
                    if let Some(state @ Progress::Pending) = progress.get_mut(&dependent) {
                        *state = Progress::Done(TargetOutcome::Skipped {
                            reason: SkipReason::DependencyFailed(failed.clone()),
                        });
                    }
                }
            }
        }
    }

    let mut outcomes = BTreeMap::new();
    for (id, state) in progress {
        let outcome = match state {
            Progress::Done(outcome) => outcome,
            Progress::Pending | Progress::Building => TargetOutcome::Skipped {
                reason: SkipReason::Cancelled,
            },
        };
        let _ = outcomes.insert(plan.target(id)?.id.clone(), outcome);
    }
    Ok(outcomes)
}

/// Check the cache and, on a miss, run the tech and record the new
/// fingerprints. The key lock is held for the whole sequence.
async fn build_target(
    plan: Arc<BuildPlan>,
    id: NodeId,
    force: bool,
    ctx: RunContext,
) -> Result<TargetOutcome, TechError> {
    let target = plan
        .target(id)
        .map_err(|e| TechError::Failed(e.to_string()))?;
    let dependencies = plan
        .dependency_paths(id)
        .map_err(|e| TechError::Failed(e.to_string()))?;
    let inputs: Vec<PathBuf> = target
        .sources
        .iter()
        .chain(&dependencies)
        .cloned()
        .collect();
    let target_path = target.node.resolve_path(&target.name);
    let logger = target.node.logger();
    let identity = target.tech.output_identity(&ctx.www_root);

    let _guard = ctx.locks.lock(&target.key).await;

    if !force {
        let (cache, key, inputs, identity) = (
            Arc::clone(&ctx.cache),
            target.key.clone(),
            inputs.clone(),
            identity.clone(),
        );
        let fresh = blocking(move || cache.is_up_to_date(&key, &target_path, &inputs, &identity))
            .await?;
        if fresh {
            debug!("✓ UP TO DATE {}", target.id);
            logger.log_action("isValid", &target.name, "");
            return Ok(TargetOutcome::UpToDate);
        }
    }

    if ctx.cancel.is_cancelled() {
        return Err(TechError::Cancelled);
    }

    logger.log_action("rebuild", &target.name, target.tech.name());
    let build_ctx = BuildContext::new(
        &target.node,
        &target.name,
        &target.sources,
        &dependencies,
        &ctx.www_root,
        &ctx.cancel,
    );
    target.tech.build(&build_ctx).await?;

    let (cache, key) = (Arc::clone(&ctx.cache), target.key.clone());
    blocking(move || cache.store(&key, &inputs, &identity)).await??;
    info!("⚡ BUILT      {}", target.id);
    Ok(TargetOutcome::Built)
}

/// Cache lookups read and hash input files, so they run off the async
/// workers.
async fn blocking<T, F>(f: F) -> Result<T, TechError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TechError::Failed(format!("cache task failed: {e}")))
}
