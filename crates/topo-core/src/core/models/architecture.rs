//! Parsers for the compact architecture (`2H.4E.2H`) and topology (`B2E.C1H.B1E`) notations.

use super::case::{CaseValidationError, Layer, Slot};
use super::connectivity::{Connectivity, scan_tokens};
use super::sse::{MAX_LAYERS, SseId, SseType, layer_letter};
use std::collections::BTreeMap;

fn architecture_error(input: &str, reason: impl Into<String>) -> CaseValidationError {
    CaseValidationError::Architecture {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn topology_error(input: &str, reason: impl Into<String>) -> CaseValidationError {
    CaseValidationError::Topology {
        input: input.to_string(),
        reason: reason.into(),
    }
}

/// Parses an architecture string into layers.
///
/// Layers are separated by `.`. Each layer is a run-length list of SSE types (`4E`,
/// `1E2H`), optionally followed by one `:length` per SSE (`2h:13:10`). Case is ignored.
/// SSEs without an explicit length take the configured per-type default.
pub fn parse_architecture(input: &str) -> Result<Vec<Layer>, CaseValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(architecture_error(input, "no layers given"));
    }

    let mut layers = Vec::new();
    for (li, layer_notation) in trimmed.split('.').enumerate() {
        let mut parts = layer_notation.trim().split(':');
        let counts = parts.next().unwrap_or_default();
        let types = parse_run_length(counts).ok_or_else(|| {
            architecture_error(
                input,
                format!("layer {} ('{layer_notation}') is not a list like '2H' or '1E2H'", li + 1),
            )
        })?;

        let lengths = parts
            .map(|p| p.trim().parse::<u32>().ok().filter(|&l| l > 0))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                architecture_error(input, format!("layer {} has a non-positive or non-numeric length", li + 1))
            })?;

        let slots = if lengths.is_empty() {
            types.into_iter().map(Slot::with_default_length).collect()
        } else if lengths.len() == types.len() {
            types
                .into_iter()
                .zip(lengths)
                .map(|(t, l)| Slot::fixed(t, l))
                .collect()
        } else {
            return Err(architecture_error(
                input,
                format!(
                    "layer {} declares {} SSEs but {} lengths",
                    li + 1,
                    types.len(),
                    lengths.len()
                ),
            ));
        };
        layers.push(Layer::new(slots));
    }

    if layers.len() > MAX_LAYERS {
        return Err(architecture_error(
            input,
            format!("at most {MAX_LAYERS} layers are supported"),
        ));
    }
    Ok(layers)
}

fn parse_run_length(notation: &str) -> Option<Vec<SseType>> {
    let mut types = Vec::new();
    let mut digits = String::new();
    for c in notation.trim().chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let sse_type = SseType::from_letter(c)?;
        let count: usize = digits.parse().ok().filter(|&n| n > 0)?;
        types.extend(std::iter::repeat_n(sse_type, count));
        digits.clear();
    }
    (digits.is_empty() && !types.is_empty()).then_some(types)
}

/// Parses a topology string into the layers it implies and the traversal order it encodes.
///
/// Layers must be used from `A` on without gaps and positions within a layer must run
/// from 1 without gaps. A trailing number after a token sets that SSE's length (`B2E5`).
pub fn parse_topology(input: &str) -> Result<(Vec<Layer>, Connectivity), CaseValidationError> {
    if input.contains(',') {
        return Err(topology_error(
            input,
            "expected a single topology; build one case per topology",
        ));
    }
    let normalized = input.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(topology_error(input, "no SSEs given"));
    }
    let tokens = scan_tokens(&normalized).map_err(|e| topology_error(input, e.to_string()))?;

    let mut grid: BTreeMap<u8, BTreeMap<u16, (SseType, Option<u32>)>> = BTreeMap::new();
    for (id, length) in &tokens {
        if length == &Some(0) {
            return Err(topology_error(input, format!("{id} has zero length")));
        }
        let previous = grid
            .entry(id.layer)
            .or_default()
            .insert(id.position, (id.sse_type, *length));
        if previous.is_some() {
            return Err(topology_error(
                input,
                format!("position {}{} is used twice", id.layer_letter(), id.position),
            ));
        }
    }

    let mut layers = Vec::with_capacity(grid.len());
    for (expected, (layer, positions)) in grid.into_iter().enumerate() {
        if layer as usize != expected {
            return Err(topology_error(
                input,
                format!("layer {} is skipped", layer_letter(expected)),
            ));
        }
        let mut slots = Vec::with_capacity(positions.len());
        for (expected_pos, (position, (sse_type, length))) in positions.into_iter().enumerate() {
            if position as usize != expected_pos + 1 {
                return Err(topology_error(
                    input,
                    format!(
                        "position {}{} is skipped",
                        layer_letter(expected),
                        expected_pos + 1
                    ),
                ));
            }
            slots.push(match length {
                Some(l) => Slot::fixed(sse_type, l),
                None => Slot::with_default_length(sse_type),
            });
        }
        layers.push(Layer::new(slots));
    }

    let steps: Vec<SseId> = tokens.into_iter().map(|(id, _)| id).collect();
    Ok((layers, Connectivity::new(steps)))
}
