use crate::core::models::case::{Case, LoopRange};
use crate::core::utils::geometry::loop_span;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoopLengthError {
    #[error("Case '{case}' has no topology; loop lengths need a traversal order")]
    MissingTopology { case: String },

    #[error("Case '{case}' has no coordinates; place it before estimating loops")]
    NotPlaced { case: String },

    #[error("Case '{case}' lists {found} linker length(s) in 'l_linkers' but its topology has {expected} loop(s)")]
    LinkerCountMismatch {
        case: String,
        expected: usize,
        found: usize,
    },
}

/// Residues needed to bridge `span` Å when each loop residue covers `loop_step` Å.
///
/// Never less than one.
pub fn loop_length(span: f64, loop_step: f64) -> u32 {
    let residues = (span / loop_step).ceil();
    if residues.is_finite() && residues > 1.0 {
        residues as u32
    } else {
        1
    }
}

/// Search window `[length - range, length + range]`, floored at one residue.
pub fn loop_window(length: u32, range: u32) -> LoopRange {
    LoopRange {
        min: length.saturating_sub(range).max(1),
        max: length + range,
    }
}

/// Checks that `l_linkers`, when given, holds one length per loop of a full chain.
///
/// Every topology visits each SSE once, so the count is known before any connectivity exists.
pub fn check_linkers(case: &Case) -> Result<(), LoopLengthError> {
    let expected = case.sse_count().saturating_sub(1);
    match &case.configuration().l_linkers {
        Some(linkers) if linkers.len() != expected => Err(LoopLengthError::LinkerCountMismatch {
            case: case.name().to_string(),
            expected,
            found: linkers.len(),
        }),
        _ => Ok(()),
    }
}

/// Fills `metadata.loop_lengths` and `metadata.loop_ranges` for every loop of the topology.
///
/// When the configuration carries `l_linkers`, those lengths are used verbatim; otherwise each
/// loop gets enough residues to span from the C-terminus of one SSE to the N-terminus of the
/// next at `loop_step` Å per residue.
pub fn estimate_loop_lengths(case: &Case, range: u32) -> Result<Case, LoopLengthError> {
    let name = || case.name().to_string();
    let ordered = match case.ordered_structures() {
        Some(ordered) => ordered,
        None if case.topology().is_none() => {
            return Err(LoopLengthError::MissingTopology { case: name() });
        }
        None => return Err(LoopLengthError::NotPlaced { case: name() }),
    };
    let loop_count = ordered.len().saturating_sub(1);

    let lengths = match &case.configuration().l_linkers {
        Some(linkers) if linkers.len() == loop_count => linkers.clone(),
        Some(linkers) => {
            return Err(LoopLengthError::LinkerCountMismatch {
                case: name(),
                expected: loop_count,
                found: linkers.len(),
            });
        }
        None => {
            let step = case.configuration().loop_step;
            ordered
                .windows(2)
                .map(|pair| loop_length(loop_span(pair[0], pair[1]), step))
                .collect()
        }
    };

    let mut out = case.clone();
    debug!("Loop lengths for '{}': {:?}", case.name(), lengths);
    out.metadata.loop_ranges = Some(lengths.iter().map(|&l| loop_window(l, range)).collect());
    out.metadata.loop_lengths = Some(lengths);
    Ok(out)
}
