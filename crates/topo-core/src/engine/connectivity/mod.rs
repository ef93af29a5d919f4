//! Enumeration and evaluation of connectivities: the order in which a single chain visits the
//! SSEs of a placed architecture.
//!
//! Candidate loops form a [`graph::LatticeGraph`]; every connectivity is a Hamiltonian path
//! of that graph ([`paths::HamiltonianPaths`]). Paths are grouped into classes by an
//! [`equivalence::EquivalenceRelation`] and each class becomes one output [`Case`].

pub mod equivalence;
pub mod graph;
pub mod paths;

use self::equivalence::{Canonicalizer, is_flipped_step};
use self::graph::{LatticeGraph, motif_predecessors};
use self::paths::HamiltonianPaths;
use super::config::EnumerationConfig;
use crate::core::models::case::{Case, EquivalentConnectivities, PlacedSse, SlotSource};
use crate::core::models::connectivity::{Connectivity, ParseConnectivityError};
use crate::core::models::sse::SseId;
use indexmap::IndexMap;
use indexmap::map::Entry;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectivityError {
    #[error("Case '{case}' has no coordinates; place it before building connectivities")]
    NotPlaced { case: String },

    #[error("No valid connectivity for case '{case}': {constraint}")]
    NoValidConnectivity { case: String, constraint: String },

    #[error("Invalid connectivity '{input}': {source}")]
    Parse {
        input: String,
        #[source]
        source: ParseConnectivityError,
    },

    #[error("Connectivity '{connectivity}' does not visit every SSE exactly once: {reason}")]
    NotAPermutation {
        connectivity: String,
        reason: String,
    },

    #[error(
        "Connectivity '{connectivity}' visits {later} before {earlier}, but motif '{motif}' fixes the opposite order"
    )]
    MotifOrderViolated {
        connectivity: String,
        motif: String,
        earlier: SseId,
        later: SseId,
    },

    #[error("Case '{case}' does not fix a connectivity")]
    NoFixedConnectivity { case: String },
}

/// Sets every SSE's up/down orientation from its position along `topology`.
///
/// Consecutive elements alternate direction; `flip_first` inverts the whole pattern. Any
/// earlier orientation is replaced, other tilt components are left alone.
pub(crate) fn orient(coordinates: &mut [PlacedSse], topology: &Connectivity, flip_first: bool) {
    for (step, id) in topology.iter().enumerate() {
        let Some(sse) = coordinates.iter_mut().find(|p| &p.id == id) else {
            continue;
        };
        let upright = if sse.is_flipped() {
            sse.tilt.x - 180.0
        } else {
            sse.tilt.x
        };
        sse.tilt.x = if is_flipped_step(step, flip_first) {
            upright + 180.0
        } else {
            upright
        };
    }
}

/// Returns a copy of `case` with `connectivity` stamped as its topology.
fn apply_connectivity(case: &Case, connectivity: Connectivity) -> Case {
    let mut out = case.clone();
    orient(
        &mut out.coordinates,
        &connectivity,
        case.configuration.flip_first,
    );
    out.topology = Some(connectivity);
    out.metadata.equivalent_connectivities = None;
    out
}

fn lattice_graph(case: &Case) -> Result<LatticeGraph, ConnectivityError> {
    LatticeGraph::from_case(case).ok_or_else(|| ConnectivityError::NotPlaced {
        case: case.name().to_string(),
    })
}

/// Lazily yields every valid connectivity of a placed case, motif order included.
pub fn connectivities(case: &Case) -> Result<HamiltonianPaths, ConnectivityError> {
    let graph = lattice_graph(case)?;
    let predecessors = motif_predecessors(case, &graph);
    Ok(HamiltonianPaths::with_predecessors(graph, predecessors))
}

fn describe_constraints(case: &Case, graph: &LatticeGraph) -> String {
    let mut description = format!(
        "{} SSE(s) cannot be joined in one chain through the {} candidate loop(s) within link_dist {:.2} Å",
        graph.node_count(),
        graph.edge_count(),
        graph.link_dist()
    );
    let predecessors = motif_predecessors(case, graph);
    let ordered: Vec<String> = predecessors
        .iter()
        .enumerate()
        .filter_map(|(node, pred)| {
            pred.map(|p| format!("{} before {}", graph.nodes()[p], graph.nodes()[node]))
        })
        .collect();
    if !ordered.is_empty() {
        description.push_str(&format!(
            " while keeping motif order ({})",
            ordered.join(", ")
        ));
    }
    description
}

/// Enumerates the connectivities of a placed case and returns one case per equivalence class.
///
/// Classes are kept in the order their first member was found; that member becomes the
/// representative topology and the rest are recorded in `metadata.equivalent_connectivities`.
/// `limit` truncates the class list after grouping.
pub fn enumerate(case: &Case, config: &EnumerationConfig) -> Result<Vec<Case>, ConnectivityError> {
    let paths = connectivities(case)?;
    let constraint = describe_constraints(case, paths.graph());
    debug!(
        "Lattice graph for '{}': {} node(s), {} edge(s)",
        case.name(),
        paths.graph().node_count(),
        paths.graph().edge_count()
    );

    let canonicalizer = Canonicalizer::new(config.equivalence, case);
    let mut classes: IndexMap<String, (Connectivity, Vec<Connectivity>)> = IndexMap::new();
    let mut total = 0usize;
    for connectivity in paths {
        total += 1;
        match classes.entry(canonicalizer.key(&connectivity)) {
            Entry::Occupied(mut class) => class.get_mut().1.push(connectivity),
            Entry::Vacant(slot) => {
                slot.insert((connectivity, Vec::new()));
            }
        }
    }

    if classes.is_empty() {
        return Err(ConnectivityError::NoValidConnectivity {
            case: case.name().to_string(),
            constraint,
        });
    }
    info!(
        "Found {} connectivity(ies) in {} class(es) under '{}' for case '{}'",
        total,
        classes.len(),
        canonicalizer.relation(),
        case.name()
    );

    let relation = canonicalizer.relation().to_string();
    Ok(classes
        .into_values()
        .take(config.limit.unwrap_or(usize::MAX))
        .map(|(representative, others)| {
            let mut out = apply_connectivity(case, representative);
            out.metadata.equivalent_connectivities = Some(EquivalentConnectivities {
                relation: relation.clone(),
                others,
            });
            out
        })
        .collect())
}

/// Checks a user-supplied connectivity against a placed case and stamps it as the topology.
///
/// The string must decode, visit every slot exactly once and keep motif segment order.
/// The stamped topology is always the `.`-joined form, whichever form was given.
/// Steps that are not lattice neighbours within `link_dist` are allowed but logged.
pub fn evaluate(case: &Case, fixed: &str) -> Result<Case, ConnectivityError> {
    let connectivity: Connectivity =
        fixed.trim().parse().map_err(|source| ConnectivityError::Parse {
            input: fixed.to_string(),
            source,
        })?;
    let graph = lattice_graph(case)?;

    let slots = case.sse_ids();
    if !connectivity.is_permutation_of(&slots) {
        return Err(ConnectivityError::NotAPermutation {
            connectivity: connectivity.to_string(),
            reason: permutation_mismatch(&connectivity, &slots),
        });
    }

    let predecessors = motif_predecessors(case, &graph);
    for (node, pred) in predecessors.iter().enumerate() {
        let Some(pred) = pred else { continue };
        let (later, earlier) = (graph.nodes()[node], graph.nodes()[*pred]);
        if connectivity.position_of(&later) < connectivity.position_of(&earlier) {
            let motif = case
                .slot(&later)
                .and_then(|slot| match &slot.source {
                    SlotSource::MotifRef { motif_id, .. } => Some(motif_id.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            return Err(ConnectivityError::MotifOrderViolated {
                connectivity: connectivity.to_string(),
                motif,
                earlier,
                later,
            });
        }
    }

    for (from, to) in connectivity.pairs() {
        if !graph.are_adjacent(from, to) {
            warn!(
                "Connectivity '{}' of case '{}' joins {} and {}, which are not neighbours within {:.2} Å",
                connectivity,
                case.name(),
                from,
                to,
                graph.link_dist()
            );
        }
    }

    Ok(apply_connectivity(case, connectivity))
}

/// Evaluates every connectivity the case fixes: the configured list, or else its stamped topology.
pub fn evaluate_fixed(case: &Case) -> Result<Vec<Case>, ConnectivityError> {
    let configured = case.configuration().connectivities();
    if !configured.is_empty() {
        return configured.into_iter().map(|c| evaluate(case, c)).collect();
    }
    match case.topology() {
        Some(topology) => Ok(vec![evaluate(case, &topology.to_string())?]),
        None => Err(ConnectivityError::NoFixedConnectivity {
            case: case.name().to_string(),
        }),
    }
}

fn permutation_mismatch(connectivity: &Connectivity, slots: &[SseId]) -> String {
    let mut seen = Vec::with_capacity(connectivity.len());
    for id in connectivity.iter() {
        if !slots.contains(id) {
            return format!("{id} is not a slot of the architecture");
        }
        if seen.contains(id) {
            return format!("{id} is visited twice");
        }
        seen.push(*id);
    }
    let missing: Vec<String> = slots
        .iter()
        .filter(|id| !seen.contains(id))
        .map(ToString::to_string)
        .collect();
    format!("{} never visited", missing.join(", "))
}
