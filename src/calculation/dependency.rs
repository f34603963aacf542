//! Component dependency ordering.
//!
//! Components that reference other components are evaluated after them.
//! Ordering is a Kahn topological sort with ties broken by insertion order,
//! so the same compensation record always evaluates in the same order.

use std::collections::{HashMap, VecDeque};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{EngineError, EngineResult};

/// Dependency graph over component codes.
#[derive(Debug, Clone, Default)]
pub struct ComponentGraph {
    graph: DiGraph<String, ()>,
    index_map: HashMap<String, NodeIndex>,
    /// Position of each node in insertion order.
    rank: HashMap<NodeIndex, usize>,
    insertion_order: Vec<NodeIndex>,
}

impl ComponentGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component; adding an existing code is a no-op.
    pub fn add_component(&mut self, code: &str) -> NodeIndex {
        if let Some(&idx) = self.index_map.get(code) {
            return idx;
        }
        let idx = self.graph.add_node(code.to_string());
        self.index_map.insert(code.to_string(), idx);
        self.rank.insert(idx, self.insertion_order.len());
        self.insertion_order.push(idx);
        idx
    }

    /// Records that `dependent` needs `dependency` evaluated first.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) {
        let from = self.add_component(dependency);
        let to = self.add_component(dependent);
        self.graph.add_edge(from, to, ());
    }

    /// Returns component codes in evaluation order.
    ///
    /// Fails with `InvalidFormula` naming a component on the cycle when the
    /// references are circular.
    pub fn evaluation_order(&self) -> EngineResult<Vec<String>> {
        let node_count = self.graph.node_count();
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| (idx, 0))
            .collect();
        for edge in self.graph.edge_references() {
            *in_degree.entry(edge.target()).or_insert(0) += 1;
        }

        let mut queue: VecDeque<NodeIndex> = self
            .insertion_order
            .iter()
            .filter(|idx| in_degree.get(idx).copied().unwrap_or(0) == 0)
            .copied()
            .collect();

        let mut order = Vec::with_capacity(node_count);
        while let Some(idx) = queue.pop_front() {
            if let Some(code) = self.graph.node_weight(idx) {
                order.push(code.clone());
            }

            let mut neighbors: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .collect();
            neighbors.sort_by_key(|n| self.rank.get(n).copied().unwrap_or(usize::MAX));
            neighbors.dedup();

            for neighbor in neighbors {
                if let Some(degree) = in_degree.get_mut(&neighbor) {
                    *degree = degree.saturating_sub(
                        self.graph.edges_connecting(idx, neighbor).count(),
                    );
                    if *degree == 0 {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        if order.len() != node_count {
            let code = self
                .insertion_order
                .iter()
                .find(|idx| in_degree.get(idx).copied().unwrap_or(0) > 0)
                .and_then(|&idx| self.graph.node_weight(idx))
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            return Err(EngineError::invalid_formula(
                &code,
                "circular reference between components",
            ));
        }

        Ok(order)
    }
}
