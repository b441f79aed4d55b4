//! Dependency graph for incremental builds.
//!
//! Nodes are arbitrary payloads (build targets, in practice) and edges point
//! from a node to the nodes it depends on. Unlike a strict DAG, edges are
//! accepted unconditionally while the graph is being declared; cycles are
//! detected afterwards in a single pass so the caller can report the whole
//! offending chain before any work starts.
//!
//! # Features
//!
//! - Cycle detection that returns the chain of nodes forming the cycle
//! - Topological ordering using Kahn's algorithm (dependencies first)
//! - Direct and transitive dependency/dependent queries
//! - Optional serde support for [`NodeId`]
//!
//! # Example
//!
//! ```
//! use convenient_graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::<&str>::new();
//! let app = graph.add_node("app.js");
//! let lib = graph.add_node("lib.js");
//!
//! graph.add_dependency(app, lib).unwrap(); // app.js depends on lib.js
//!
//! assert!(graph.find_cycle().is_none());
//! assert_eq!(graph.topological_order().unwrap(), vec![lib, app]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

use std::collections::{HashSet, VecDeque};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Node identifier in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in insertion order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Error types for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The graph contains a cycle. The chain starts and ends with the same
    /// node, each element depending on the next.
    #[error("Cycle detected in graph: {}", format_chain(.0))]
    CycleDetected(Vec<NodeId>),

    /// Node not found
    #[error("Node {0} not found in graph")]
    NodeNotFound(NodeId),
}

fn format_chain(chain: &[NodeId]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Clone)]
struct Entry<N> {
    data: N,
    // Nodes this node depends on
    dependencies: Vec<NodeId>,
    // Nodes depending on this node
    dependents: Vec<NodeId>,
}

/// Directed dependency graph.
///
/// Node lookup is O(1), edge insertion is O(degree) because duplicate edges
/// are collapsed, and cycle detection and ordering are O(V + E).
#[derive(Debug, Clone)]
pub struct DependencyGraph<N> {
    entries: Vec<Entry<N>>,
    edge_count: usize,
}

impl<N> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> DependencyGraph<N> {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            edge_count: 0,
        }
    }

    /// Add a node to the graph and return its ID.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId(self.entries.len());
        self.entries.push(Entry {
            data,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        });
        id
    }

    /// Record that `node` depends on `dependency`.
    ///
    /// Declaring the same edge twice is a no-op. Self-edges and cycles are
    /// accepted here and reported by [`DependencyGraph::find_cycle`].
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if either node doesn't exist.
    pub fn add_dependency(&mut self, node: NodeId, dependency: NodeId) -> GraphResult<()> {
        self.check(node)?;
        self.check(dependency)?;

        if self.entries[node.0].dependencies.contains(&dependency) {
            return Ok(());
        }

        self.entries[node.0].dependencies.push(dependency);
        self.entries[dependency.0].dependents.push(node);
        self.edge_count += 1;
        Ok(())
    }

    fn check(&self, id: NodeId) -> GraphResult<()> {
        if id.0 < self.entries.len() {
            Ok(())
        } else {
            Err(GraphError::NodeNotFound(id))
        }
    }

    /// Get a reference to a node's data.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn node(&self, id: NodeId) -> GraphResult<&N> {
        self.entries
            .get(id.0)
            .map(|entry| &entry.data)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Get a mutable reference to a node's data.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut N> {
        self.entries
            .get_mut(id.0)
            .map(|entry| &mut entry.data)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Get all node IDs in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.entries.len()).map(NodeId)
    }

    /// Get the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.entries.len()
    }

    /// Get the number of distinct edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Direct dependencies of a node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependencies(&self, id: NodeId) -> GraphResult<&[NodeId]> {
        self.entries
            .get(id.0)
            .map(|entry| entry.dependencies.as_slice())
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Direct dependents of a node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependents(&self, id: NodeId) -> GraphResult<&[NodeId]> {
        self.entries
            .get(id.0)
            .map(|entry| entry.dependents.as_slice())
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Every node that depends on `id`, directly or through other nodes.
    ///
    /// The result excludes `id` itself and is in breadth-first order.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn transitive_dependents(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.check(id)?;
        Ok(self.walk(&[id], |entry| &entry.dependents))
    }

    /// Every node reachable from `roots` through dependency edges, roots
    /// included.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if any root doesn't exist.
    pub fn dependency_closure(&self, roots: &[NodeId]) -> GraphResult<HashSet<NodeId>> {
        for &root in roots {
            self.check(root)?;
        }
        let mut closure: HashSet<NodeId> = self.walk(roots, |entry| &entry.dependencies).into_iter().collect();
        closure.extend(roots.iter().copied());
        Ok(closure)
    }

    fn walk<'a, F>(&'a self, roots: &[NodeId], next: F) -> Vec<NodeId>
    where
        F: Fn(&'a Entry<N>) -> &'a Vec<NodeId>,
    {
        let mut visited: HashSet<NodeId> = roots.iter().copied().collect();
        let mut queue: VecDeque<NodeId> = roots.iter().copied().collect();
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            for &neighbor in next(&self.entries[current.0]) {
                if visited.insert(neighbor) {
                    result.push(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }

        result
    }

    /// Find one cycle in the graph, if any.
    ///
    /// Runs a depth-first traversal with an explicit stack holding the nodes
    /// on the current path. The returned chain starts and ends with the same
    /// node and each element depends on the one after it, e.g. `[a, b, c, a]`.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<NodeId>> {
        let mut visited = vec![false; self.entries.len()];
        let mut on_path = vec![false; self.entries.len()];

        for root in self.node_ids() {
            if visited[root.0] {
                continue;
            }
            visited[root.0] = true;
            on_path[root.0] = true;
            // (node, index of the next dependency to follow)
            let mut stack = vec![(root, 0usize)];

            while let Some(frame) = stack.last_mut() {
                let id = frame.0;
                let Some(&dependency) = self.entries[id.0].dependencies.get(frame.1) else {
                    on_path[id.0] = false;
                    let _ = stack.pop();
                    continue;
                };
                frame.1 += 1;

                if on_path[dependency.0] {
                    let start = stack
                        .iter()
                        .position(|&(p, _)| p == dependency)
                        .unwrap_or(0);
                    let mut cycle: Vec<NodeId> = stack[start..].iter().map(|&(p, _)| p).collect();
                    cycle.push(dependency);
                    return Some(cycle);
                }
                if !visited[dependency.0] {
                    visited[dependency.0] = true;
                    on_path[dependency.0] = true;
                    stack.push((dependency, 0));
                }
            }
        }

        None
    }

    /// Topological order using Kahn's algorithm, dependencies first.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::CycleDetected` with the offending chain if the
    /// graph contains a cycle.
    pub fn topological_order(&self) -> GraphResult<Vec<NodeId>> {
        let mut pending: Vec<usize> = self
            .entries
            .iter()
            .map(|entry| entry.dependencies.len())
            .collect();

        let mut queue: VecDeque<NodeId> = self
            .node_ids()
            .filter(|id| pending[id.0] == 0)
            .collect();

        let mut result = Vec::with_capacity(self.entries.len());

        while let Some(id) = queue.pop_front() {
            result.push(id);
            for &dependent in &self.entries[id.0].dependents {
                pending[dependent.0] -= 1;
                if pending[dependent.0] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if result.len() == self.entries.len() {
            Ok(result)
        } else {
            Err(GraphError::CycleDetected(self.find_cycle().unwrap_or_default()))
        }
    }
}
