//! Resolution of declared targets into a checked dependency graph

use super::TargetSpec;
use crate::error::{MakeError, MakeResult};
use crate::node::Node;
use crate::tech::Tech;
use convenient_cache::CacheKey;
use convenient_graph::{DependencyGraph, NodeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// A declared target with every name and path resolved.
pub(crate) struct PlannedTarget {
    /// `node/path:target`
    pub id: String,
    pub name: String,
    pub node: Arc<Node>,
    pub tech: Arc<dyn Tech>,
    pub sources: Vec<PathBuf>,
    pub key: CacheKey,
}

/// Dependency graph over all declared targets, known to be acyclic.
pub(crate) struct BuildPlan {
    pub graph: DependencyGraph<PlannedTarget>,
    index: HashMap<String, NodeId>,
    by_node: HashMap<String, Vec<NodeId>>,
}

pub(crate) fn target_id(node: &str, target: &str) -> String {
    format!("{node}:{target}")
}

/// Split `node/path:mask` or a bare `mask` (same node) into its parts.
fn split_reference<'a>(reference: &'a str, current_node: &'a str) -> (&'a str, &'a str) {
    match reference.rsplit_once(':') {
        Some((node, mask)) => (node.trim_end_matches('/'), mask),
        None => (current_node, reference),
    }
}

impl BuildPlan {
    /// Resolve all declarations. Fails before anything runs on duplicate
    /// targets, dangling references or a dependency cycle.
    pub fn build(
        nodes: &BTreeMap<String, Arc<Node>>,
        declarations: &[(String, TargetSpec)],
    ) -> MakeResult<Self> {
        let mut graph = DependencyGraph::new();
        let mut index = HashMap::new();
        let mut by_node: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut ids = Vec::with_capacity(declarations.len());

        for (node_path, spec) in declarations {
            let node = nodes
                .get(node_path)
                .ok_or_else(|| MakeError::NotDeclared(node_path.clone()))?;
            let name = node.unmask_node_target_name(node_path, &spec.target);
            let id = target_id(node_path, &name);
            if index.contains_key(&id) {
                return Err(MakeError::DuplicateTarget(id));
            }

            let planned = PlannedTarget {
                sources: spec.sources.iter().map(|s| node.resolve_path(s)).collect(),
                key: CacheKey::new(node_path, name.clone()),
                tech: Arc::clone(&spec.tech),
                node: Arc::clone(node),
                id: id.clone(),
                name,
            };
            let graph_id = graph.add_node(planned);
            let _ = index.insert(id, graph_id);
            by_node.entry(node_path.clone()).or_default().push(graph_id);
            ids.push(graph_id);
        }

        for ((node_path, spec), &graph_id) in declarations.iter().zip(&ids) {
            let node = nodes
                .get(node_path)
                .ok_or_else(|| MakeError::NotDeclared(node_path.clone()))?;
            for reference in &spec.depends {
                let (dep_node, mask) = split_reference(reference, node_path);
                let dep_id = target_id(dep_node, &node.unmask_node_target_name(dep_node, mask));
                let &dependency = index.get(&dep_id).ok_or_else(|| MakeError::UnknownTarget {
                    target: graph.node(graph_id).map(|t| t.id.clone()).unwrap_or_default(),
                    dependency: reference.clone(),
                })?;
                graph.add_dependency(graph_id, dependency)?;
            }
        }

        if let Some(cycle) = graph.find_cycle() {
            let chain = cycle
                .into_iter()
                .map(|id| graph.node(id).map(|t| t.id.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            return Err(MakeError::GraphCycle { chain });
        }

        info!(
            "Graph built: {} targets, {} dependencies",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(Self {
            graph,
            index,
            by_node,
        })
    }

    pub fn target(&self, id: NodeId) -> MakeResult<&PlannedTarget> {
        Ok(self.graph.node(id)?)
    }

    /// Final paths of the direct dependencies of `id`.
    pub fn dependency_paths(&self, id: NodeId) -> MakeResult<Vec<PathBuf>> {
        self.graph
            .dependencies(id)?
            .iter()
            .map(|&dep| {
                let target = self.target(dep)?;
                Ok(target.node.resolve_path(&target.name))
            })
            .collect()
    }

    /// Targets named by `request`: a target id or a node path (all of its
    /// targets).
    pub fn lookup(&self, request: &str) -> MakeResult<Vec<NodeId>> {
        let request = request.trim_end_matches('/');
        if let Some(&id) = self.index.get(request) {
            return Ok(vec![id]);
        }
        self.by_node
            .get(request)
            .cloned()
            .ok_or_else(|| MakeError::NotDeclared(request.to_string()))
    }

    /// Requested targets plus everything they depend on; every target when
    /// nothing is requested.
    pub fn select(&self, requests: &[String]) -> MakeResult<HashSet<NodeId>> {
        if requests.is_empty() {
            return Ok(self.graph.node_ids().collect());
        }
        let mut roots = Vec::new();
        for request in requests {
            roots.extend(self.lookup(request)?);
        }
        Ok(self.graph.dependency_closure(&roots)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_reference() {
        assert_eq!(split_reference("?.js", "pages/index"), ("pages/index", "?.js"));
        assert_eq!(
            split_reference("blocks/button:?.css", "pages/index"),
            ("blocks/button", "?.css")
        );
        assert_eq!(split_reference("blocks/button/:b.js", "x"), ("blocks/button", "b.js"));
    }
}
