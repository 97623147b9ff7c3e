// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{Result, TaskwardenError};
use crate::task::{Constraint, ProcessName};

/// Internal node structure: stores immediate predecessors and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Processes that must succeed before this one can run.
    deps: Vec<ProcessName>,
    /// Processes that wait for this one.
    dependents: Vec<ProcessName>,
}

/// Ordering constraints between the processes of one task, plus the terminal
/// outcomes recorded so far.
///
/// Adjacency is fixed at construction. Success/failure facts accrue as
/// processes finish and are what `eligible` and `blocked` are answered from.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: HashMap<ProcessName, DagNode>,
    /// A topological order of all processes.
    order: Vec<ProcessName>,
    succeeded: HashSet<ProcessName>,
    failed: HashSet<ProcessName>,
    blocked: HashSet<ProcessName>,
}

impl DependencyGraph {
    /// Build the graph for the given process names and ordering edges.
    ///
    /// Fails with [`TaskwardenError::UnknownProcess`] if an edge names an
    /// undeclared process and with [`TaskwardenError::CyclicConstraint`] if
    /// the edges do not form a DAG (self-edges included).
    pub fn new<'a>(
        processes: impl IntoIterator<Item = &'a str>,
        constraints: &[Constraint],
    ) -> Result<Self> {
        let declared: Vec<&str> = processes.into_iter().collect();

        let mut nodes: HashMap<ProcessName, DagNode> = declared
            .iter()
            .map(|name| (name.to_string(), DagNode::default()))
            .collect();

        for edge in constraints {
            for name in [&edge.predecessor, &edge.successor] {
                if !nodes.contains_key(name) {
                    return Err(TaskwardenError::UnknownProcess {
                        process: name.clone(),
                        context: format!(
                            "constraint '{}' -> '{}'",
                            edge.predecessor, edge.successor
                        ),
                    });
                }
            }

            if edge.predecessor == edge.successor {
                return Err(TaskwardenError::CyclicConstraint(format!(
                    "process '{}' cannot be ordered after itself",
                    edge.predecessor
                )));
            }

            if let Some(node) = nodes.get_mut(&edge.successor) {
                if node.deps.contains(&edge.predecessor) {
                    continue;
                }
                node.deps.push(edge.predecessor.clone());
            }
            if let Some(node) = nodes.get_mut(&edge.predecessor) {
                node.dependents.push(edge.successor.clone());
            }
        }

        let order = topological_order(&declared, constraints)?;

        Ok(Self {
            nodes,
            order,
            succeeded: HashSet::new(),
            failed: HashSet::new(),
            blocked: HashSet::new(),
        })
    }

    /// True iff every predecessor of `process` has succeeded.
    ///
    /// Processes with no predecessors are always eligible.
    pub fn eligible(&self, process: &str) -> bool {
        match self.nodes.get(process) {
            Some(node) => node.deps.iter().all(|dep| self.succeeded.contains(dep)),
            None => false,
        }
    }

    /// True iff some (transitive) predecessor of `process` failed permanently,
    /// so `process` can never run.
    pub fn blocked(&self, process: &str) -> bool {
        self.blocked.contains(process)
    }

    /// True iff `process` has at least one declared dependent.
    pub fn is_predecessor_of_any(&self, process: &str) -> bool {
        !self.dependents_of(process).is_empty()
    }

    /// Record that `process` reached terminal SUCCESS.
    pub fn record_success(&mut self, process: &str) {
        if self.nodes.contains_key(process) {
            self.succeeded.insert(process.to_string());
        }
    }

    /// Record that `process` reached terminal FAILED and propagate blocking to
    /// all of its transitive dependents.
    ///
    /// Returns the processes that became blocked by this call.
    pub fn record_failure(&mut self, process: &str) -> Vec<ProcessName> {
        if !self.nodes.contains_key(process) {
            return Vec::new();
        }
        self.failed.insert(process.to_string());

        let mut stack: Vec<ProcessName> = self.dependents_of(process).to_vec();
        let mut newly_blocked = Vec::new();

        while let Some(name) = stack.pop() {
            if !self.blocked.insert(name.clone()) {
                continue;
            }
            debug!(process = %name, failed = %process, "blocked by upstream failure");
            stack.extend(self.dependents_of(&name).iter().cloned());
            newly_blocked.push(name);
        }

        newly_blocked
    }

    pub fn has_failed(&self, process: &str) -> bool {
        self.failed.contains(process)
    }

    /// Immediate predecessors of a process.
    pub fn dependencies_of(&self, process: &str) -> &[ProcessName] {
        self.nodes
            .get(process)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a process.
    pub fn dependents_of(&self, process: &str) -> &[ProcessName] {
        self.nodes
            .get(process)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Processes without predecessors, in topological order.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter(|name| self.dependencies_of(name).is_empty())
            .map(String::as_str)
    }

    /// All processes in a valid launch order.
    pub fn topological_order(&self) -> &[ProcessName] {
        &self.order
    }
}

/// Sort with petgraph; a failed sort means a cycle.
///
/// Edge direction: predecessor -> successor.
fn topological_order(declared: &[&str], constraints: &[Constraint]) -> Result<Vec<ProcessName>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in declared {
        graph.add_node(*name);
    }
    for edge in constraints {
        graph.add_edge(edge.predecessor.as_str(), edge.successor.as_str(), ());
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(TaskwardenError::CyclicConstraint(format!(
            "cycle detected in ordering constraints involving process '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(names: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let constraints: Vec<_> = edges.iter().map(|(a, b)| Constraint::new(*a, *b)).collect();
        DependencyGraph::new(names.iter().copied(), &constraints).unwrap()
    }

    #[test]
    fn roots_are_eligible_immediately() {
        let g = graph(&["a", "b", "c"], &[("a", "b")]);
        assert!(g.eligible("a"));
        assert!(!g.eligible("b"));
        assert!(g.eligible("c"));
        let roots: Vec<_> = g.roots().collect();
        assert!(roots.contains(&"a") && roots.contains(&"c"));
        assert!(!roots.contains(&"b"));
    }

    #[test]
    fn eligibility_requires_every_predecessor_to_succeed() {
        let mut g = graph(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);
        g.record_success("a");
        assert!(!g.eligible("c"));
        g.record_success("b");
        assert!(g.eligible("c"));
    }

    #[test]
    fn failure_blocks_transitively() {
        let mut g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c")]);
        let blocked = g.record_failure("a");
        assert_eq!(blocked.len(), 2);
        assert!(g.blocked("b"));
        assert!(g.blocked("c"));
        assert!(!g.blocked("d"));
        assert!(!g.blocked("a"));
        assert!(g.has_failed("a"));
    }

    #[test]
    fn diamond_blocks_each_dependent_once() {
        let mut g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let blocked = g.record_failure("a");
        assert_eq!(blocked.len(), 3);
    }

    #[test]
    fn predecessor_of_any() {
        let g = graph(&["a", "b", "c"], &[("a", "b")]);
        assert!(g.is_predecessor_of_any("a"));
        assert!(!g.is_predecessor_of_any("b"));
        assert!(!g.is_predecessor_of_any("c"));
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let g = graph(&["a", "b"], &[("a", "b"), ("a", "b")]);
        assert_eq!(g.dependencies_of("b"), ["a".to_string()]);
        assert_eq!(g.dependents_of("a"), ["b".to_string()]);
    }

    #[test]
    fn topological_order_respects_edges() {
        let g = graph(&["c", "b", "a"], &[("a", "b"), ("b", "c")]);
        assert_eq!(g.topological_order(), ["a", "b", "c"]);
    }

    #[test]
    fn rejects_cycles_and_unknown_names() {
        let cyclic = [Constraint::new("a", "b"), Constraint::new("b", "a")];
        assert!(matches!(
            DependencyGraph::new(["a", "b"], &cyclic),
            Err(TaskwardenError::CyclicConstraint(_))
        ));

        let self_edge = [Constraint::new("a", "a")];
        assert!(matches!(
            DependencyGraph::new(["a"], &self_edge),
            Err(TaskwardenError::CyclicConstraint(_))
        ));

        let unknown = [Constraint::new("a", "zzz")];
        match DependencyGraph::new(["a"], &unknown) {
            Err(TaskwardenError::UnknownProcess { process, .. }) => assert_eq!(process, "zzz"),
            other => panic!("expected UnknownProcess, got {other:?}"),
        }
    }
}
