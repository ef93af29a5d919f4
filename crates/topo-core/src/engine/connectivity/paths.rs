use super::graph::LatticeGraph;
use crate::core::models::connectivity::Connectivity;

/// Lazily walks every Hamiltonian path of a [`LatticeGraph`].
///
/// Depth-first search with an explicit stack, so the number of paths held in memory is one
/// regardless of how many exist. Paths come out in a fixed order: by start node, then by
/// neighbour order at every step. Nodes with a predecessor constraint can neither start a
/// path nor be entered before their predecessor has been visited.
pub struct HamiltonianPaths {
    graph: LatticeGraph,
    predecessors: Vec<Option<usize>>,
    next_start: usize,
    path: Vec<usize>,
    cursors: Vec<usize>,
    visited: Vec<bool>,
}

impl HamiltonianPaths {
    pub fn new(graph: LatticeGraph) -> Self {
        let n = graph.node_count();
        Self::with_predecessors(graph, vec![None; n])
    }

    pub fn with_predecessors(graph: LatticeGraph, predecessors: Vec<Option<usize>>) -> Self {
        let n = graph.node_count();
        Self {
            graph,
            predecessors,
            next_start: 0,
            path: Vec::with_capacity(n),
            cursors: Vec::with_capacity(n),
            visited: vec![false; n],
        }
    }

    pub fn graph(&self) -> &LatticeGraph {
        &self.graph
    }

    fn can_visit(&self, node: usize) -> bool {
        !self.visited[node] && self.predecessors[node].is_none_or(|p| self.visited[p])
    }

    fn push(&mut self, node: usize) {
        self.path.push(node);
        self.cursors.push(0);
        self.visited[node] = true;
    }

    fn pop(&mut self) {
        if let Some(node) = self.path.pop() {
            self.cursors.pop();
            self.visited[node] = false;
        }
    }

    fn next_candidate(&mut self) -> Option<usize> {
        let depth = self.path.len() - 1;
        let current = self.path[depth];
        loop {
            let candidate = self.graph.neighbors(current).get(self.cursors[depth]).copied()?;
            self.cursors[depth] += 1;
            if self.can_visit(candidate) {
                return Some(candidate);
            }
        }
    }

    /// Emits the current full-length path and backtracks off its last node.
    fn emit(&mut self) -> Connectivity {
        let connectivity = self.graph.connectivity(&self.path);
        self.pop();
        connectivity
    }
}

impl Iterator for HamiltonianPaths {
    type Item = Connectivity;

    fn next(&mut self) -> Option<Connectivity> {
        let n = self.graph.node_count();
        loop {
            if self.path.is_empty() {
                let start = (self.next_start..n).find(|&s| self.predecessors[s].is_none())?;
                self.next_start = start + 1;
                self.push(start);
            } else if let Some(candidate) = self.next_candidate() {
                self.push(candidate);
            } else {
                self.pop();
                continue;
            }

            if self.path.len() == n {
                return Some(self.emit());
            }
        }
    }
}
