use crate::core::models::case::{Case, PlacedSse, SlotSource};
use crate::core::models::connectivity::Connectivity;
use crate::core::models::sse::{SseId, SseType};
use crate::core::utils::geometry::center_distance;
use std::collections::HashMap;

/// Whether two slots may be joined by a loop, judged by their lattice positions alone.
///
/// Helices only connect to their direct neighbours in a layer; strands may also skip one
/// position (greek-key crossover). Any two SSEs in adjacent layers are candidates; the
/// distance check in [`LatticeGraph`] decides which of those are close enough.
pub fn lattice_neighbors(a: &SseId, b: &SseId) -> bool {
    match a.layer.abs_diff(b.layer) {
        0 => {
            let gap = a.position.abs_diff(b.position);
            match (a.sse_type, b.sse_type) {
                (SseType::Strand, SseType::Strand) => (1..=2).contains(&gap),
                _ => gap == 1,
            }
        }
        1 => true,
        _ => false,
    }
}

/// Candidate-loop graph over the placed SSEs of one case.
///
/// Nodes are the SSE slots in architecture order. Two nodes are joined when they are lattice
/// neighbours and their centers are at most `link_dist` apart.
#[derive(Debug, Clone)]
pub struct LatticeGraph {
    nodes: Vec<SseId>,
    adjacency: Vec<Vec<usize>>,
    index: HashMap<SseId, usize>,
    link_dist: f64,
}

impl LatticeGraph {
    /// Builds the graph for a placed case. Returns `None` if some slot has no coordinates.
    pub fn from_case(case: &Case) -> Option<Self> {
        let placed: Vec<&PlacedSse> = case
            .sse_ids()
            .iter()
            .map(|id| case.placed(id))
            .collect::<Option<_>>()?;
        Some(Self::from_placed(&placed, case.configuration().link_dist))
    }

    pub fn from_placed(placed: &[&PlacedSse], link_dist: f64) -> Self {
        let nodes: Vec<SseId> = placed.iter().map(|p| p.id).collect();
        let adjacency = placed
            .iter()
            .map(|a| {
                placed
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| {
                        a.id != b.id
                            && lattice_neighbors(&a.id, &b.id)
                            && center_distance(a, b) <= link_dist
                    })
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();
        let index = nodes.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self {
            nodes,
            adjacency,
            index,
            link_dist,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[SseId] {
        &self.nodes
    }

    pub fn link_dist(&self) -> f64 {
        self.link_dist
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    pub fn index_of(&self, id: &SseId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn are_adjacent(&self, a: &SseId, b: &SseId) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.adjacency[i].contains(&j),
            _ => false,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn connectivity(&self, path: &[usize]) -> Connectivity {
        Connectivity::new(path.iter().map(|&i| self.nodes[i]).collect())
    }
}

/// For every node, the node that must already be visited before it can be entered.
///
/// Slots bound to segments of the same motif have to be traversed in the motif's segment
/// order, so each such slot waits on the slot holding the previous segment.
pub(crate) fn motif_predecessors(case: &Case, graph: &LatticeGraph) -> Vec<Option<usize>> {
    let mut chains: HashMap<&str, Vec<(usize, usize)>> = HashMap::new();
    for (node, id) in graph.nodes().iter().enumerate() {
        let Some(slot) = case.slot(id) else { continue };
        if let SlotSource::MotifRef {
            motif_id,
            segment_id,
        } = &slot.source
        {
            if let Some(rank) = case.motif(motif_id).and_then(|m| m.segment_rank(segment_id)) {
                chains.entry(motif_id.as_str()).or_default().push((rank, node));
            }
        }
    }

    let mut predecessors = vec![None; graph.node_count()];
    for chain in chains.values_mut() {
        chain.sort_unstable();
        for pair in chain.windows(2) {
            predecessors[pair[1].1] = Some(pair[0].1);
        }
    }
    predecessors
}
