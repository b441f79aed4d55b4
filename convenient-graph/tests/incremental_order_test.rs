//! Simulated incremental build over a dependency graph
//!
//! Walks the graph in topological order, rebuilding only targets whose own
//! input changed or whose dependencies were rebuilt.

use convenient_graph::{DependencyGraph, GraphError, NodeId};
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct Target {
    name: &'static str,
    dirty: bool,
}

fn project() -> (DependencyGraph<Target>, Vec<NodeId>) {
    let mut graph = DependencyGraph::new();
    let names = ["bundle.js", "button.js", "input.js", "i18n.js", "styles.css"];
    let ids: Vec<NodeId> = names
        .iter()
        .map(|&name| graph.add_node(Target { name, dirty: false }))
        .collect();

    // bundle.js <- button.js <- i18n.js
    // bundle.js <- input.js  <- i18n.js
    graph.add_dependency(ids[0], ids[1]).unwrap();
    graph.add_dependency(ids[0], ids[2]).unwrap();
    graph.add_dependency(ids[1], ids[3]).unwrap();
    graph.add_dependency(ids[2], ids[3]).unwrap();

    (graph, ids)
}

fn rebuild(graph: &DependencyGraph<Target>) -> Vec<&'static str> {
    let mut rebuilt: HashSet<NodeId> = HashSet::new();
    let mut names = Vec::new();

    for id in graph.topological_order().unwrap() {
        let target = graph.node(id).unwrap();
        let stale_dependency = graph
            .dependencies(id)
            .unwrap()
            .iter()
            .any(|dep| rebuilt.contains(dep));

        if target.dirty || stale_dependency {
            let _ = rebuilt.insert(id);
            names.push(target.name);
        }
    }

    names
}

#[test]
fn test_clean_tree_rebuilds_nothing() {
    let (graph, _) = project();
    assert!(rebuild(&graph).is_empty());
}

#[test]
fn test_leaf_change_propagates_to_every_dependent() {
    let (mut graph, ids) = project();
    graph.node_mut(ids[3]).unwrap().dirty = true;

    let rebuilt = rebuild(&graph);
    assert_eq!(rebuilt.first(), Some(&"i18n.js"));
    assert_eq!(rebuilt.last(), Some(&"bundle.js"));
    assert_eq!(rebuilt.len(), 4);
    assert!(!rebuilt.contains(&"styles.css"));

    let dependents = graph.transitive_dependents(ids[3]).unwrap();
    assert_eq!(dependents.len(), 3);
}

#[test]
fn test_cycle_blocks_ordering() {
    let (mut graph, ids) = project();
    graph.add_dependency(ids[3], ids[0]).unwrap();

    match graph.topological_order() {
        Err(GraphError::CycleDetected(chain)) => {
            assert_eq!(chain.first(), chain.last());
            assert!(chain.contains(&ids[3]));
            assert!(chain.contains(&ids[0]));
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}
