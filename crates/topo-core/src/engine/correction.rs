use crate::core::models::case::{Case, PlacedSse};
use crate::core::models::connectivity::Connectivity;
use crate::core::models::sse::{SseId, layer_index};
use crate::core::statistics::corrections::{
    CorrectionDocument, CorrectionKey, CorrectionTable, Corrections, LayerCorrection, XAlign,
    YAlign,
};
use crate::core::utils::geometry::{compose_tilt, half_extent, rotation_from_tilt};
use nalgebra::Vector3;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrectionError {
    #[error("Case '{case}' has no topology; corrections are defined on consecutive SSE pairs")]
    MissingTopology { case: String },

    #[error("Case '{case}' has no coordinates to correct")]
    NotPlaced { case: String },

    #[error("Correction for case '{case}' targets SSE {sse}, which is not in its architecture")]
    UnknownSse { case: String, sse: SseId },

    #[error("Correction for case '{case}' targets layer '{layer}', which is not in its architecture")]
    UnknownLayer { case: String, layer: String },
}

/// Applies every correction source to a placed case that carries a topology.
///
/// The configured documents run first, then the documents embedded in
/// `metadata.corrections`, then the pair table along the traversal order. Every applied
/// correction is appended to `metadata.corrections_applied`.
///
/// Running this twice on the same case applies the corrections twice.
pub fn apply_corrections(case: &Case, corrections: &Corrections) -> Result<Case, CorrectionError> {
    let topology = case
        .topology()
        .ok_or_else(|| CorrectionError::MissingTopology {
            case: case.name().to_string(),
        })?;
    if !case.is_placed() {
        return Err(CorrectionError::NotPlaced {
            case: case.name().to_string(),
        });
    }

    let mut corrected = case.clone();
    for document in corrections.documents.iter().chain(&case.metadata.corrections) {
        apply_document_in_place(&mut corrected, document)?;
    }
    apply_pair_table(&mut corrected, topology, &corrections.table);

    debug!(
        "Applied {} correction(s) to case '{}'",
        corrected.metadata.corrections_applied.len() - case.metadata.corrections_applied.len(),
        case.name()
    );
    Ok(corrected)
}

/// Applies one document to a placed case: its layer corrections, then its SSE corrections.
///
/// Unlike pair corrections, these need no topology.
pub fn apply_document(case: &Case, document: &CorrectionDocument) -> Result<Case, CorrectionError> {
    if !case.is_placed() {
        return Err(CorrectionError::NotPlaced {
            case: case.name().to_string(),
        });
    }
    let mut corrected = case.clone();
    apply_document_in_place(&mut corrected, document)?;
    Ok(corrected)
}

fn apply_document_in_place(
    case: &mut Case,
    document: &CorrectionDocument,
) -> Result<(), CorrectionError> {
    let widest = (0..case.layers.len())
        .map(|layer| layer_width(&case.coordinates, layer as u8))
        .fold(0.0, f64::max);

    for (label, correction) in &document.layers {
        let layer = resolve_layer(case, label)?;
        if correction.is_noop() {
            continue;
        }
        apply_layer_correction(&mut case.coordinates, layer, correction, widest);
        case.metadata.corrections_applied.push(format!("layer {label}"));
    }

    for (id, correction) in &document.sse {
        let target = case
            .coordinates
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| CorrectionError::UnknownSse {
                case: case.configuration.name.clone(),
                sse: *id,
            })?;
        for (axis, delta) in correction.shift.iter().enumerate() {
            target.center[axis] += delta;
        }
        target.tilt = compose_tilt(&target.tilt, &correction.tilt);
        case.metadata.corrections_applied.push(format!("sse {id}"));
    }
    Ok(())
}

fn resolve_layer(case: &Case, label: &str) -> Result<u8, CorrectionError> {
    let mut chars = label.chars();
    let index = match (chars.next(), chars.next()) {
        (Some(letter), None) => layer_index(letter.to_ascii_uppercase()),
        _ => None,
    };
    index
        .filter(|&i| usize::from(i) < case.layers.len())
        .ok_or_else(|| CorrectionError::UnknownLayer {
            case: case.name().to_string(),
            layer: label.to_string(),
        })
}

/// Indices into `coordinates` of one layer, by position.
fn layer_members(coordinates: &[PlacedSse], layer: u8) -> Vec<usize> {
    let mut members: Vec<usize> = (0..coordinates.len())
        .filter(|&i| coordinates[i].id.layer == layer)
        .collect();
    members.sort_by_key(|&i| coordinates[i].id.position);
    members
}

fn layer_width(coordinates: &[PlacedSse], layer: u8) -> f64 {
    let xs = coordinates
        .iter()
        .filter(|p| p.id.layer == layer)
        .map(|p| p.center[0]);
    let (min, max) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    });
    if min.is_finite() { max - min } else { 0.0 }
}

fn apply_layer_correction(
    coordinates: &mut [PlacedSse],
    layer: u8,
    correction: &LayerCorrection,
    widest: f64,
) {
    let members = layer_members(coordinates, layer);

    let slack = (widest - layer_width(coordinates, layer)) / 2.0;
    let dx = match correction.xalign {
        XAlign::Left => -slack,
        XAlign::Center => 0.0,
        XAlign::Right => slack,
    };
    for &i in &members {
        coordinates[i].center[0] += dx;
    }

    if members.len() > 1 && correction.yalign != YAlign::Middle {
        let half = |p: &PlacedSse| half_extent(p.length, p.id.sse_type.rise());
        let tops: Vec<f64> = members
            .iter()
            .map(|&i| coordinates[i].center[1] + half(&coordinates[i]))
            .collect();
        let bottoms: Vec<f64> = members
            .iter()
            .map(|&i| coordinates[i].center[1] - half(&coordinates[i]))
            .collect();
        let top = tops.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let bottom = bottoms.iter().copied().fold(f64::INFINITY, f64::min);
        for (k, &i) in members.iter().enumerate() {
            coordinates[i].center[1] += match correction.yalign {
                YAlign::Top => top - tops[k],
                YAlign::Bottom => bottom - bottoms[k],
                YAlign::Middle => 0.0,
            };
        }
    }

    if members.len() > 2 && correction.zcurve != 0.0 {
        let first = coordinates[members[0]].center[0];
        let last = coordinates[members[members.len() - 1]].center[0];
        let half_chord = (last - first).abs() / 2.0;
        if half_chord > 0.0 {
            let middle = (first + last) / 2.0;
            let sagitta = correction.zcurve.abs();
            let radius = (half_chord * half_chord + sagitta * sagitta) / (2.0 * sagitta);
            for &i in &members {
                let d = (coordinates[i].center[0] - middle).clamp(-half_chord, half_chord);
                let rise = (radius * radius - d * d).sqrt() - (radius - sagitta);
                coordinates[i].center[2] -= correction.zcurve.signum() * rise;
            }
        }
    }
}

/// Shifts and tilts the second SSE of every consecutive pair found in `table`.
///
/// The shift is expressed in the frame of the first SSE. Pairs absent from the table are left
/// alone.
fn apply_pair_table(case: &mut Case, topology: &Connectivity, table: &CorrectionTable) {
    if table.is_empty() {
        return;
    }
    let index_of = |id: &SseId| case.coordinates.iter().position(|p| &p.id == id);
    let pairs: Vec<(usize, usize, CorrectionKey)> = topology
        .pairs()
        .filter_map(|(first, second)| {
            Some((
                index_of(first)?,
                index_of(second)?,
                CorrectionKey::between(first, second),
            ))
        })
        .collect();

    for (first, second, key) in pairs {
        let Some(correction) = table.get(&key) else {
            trace!("No correction for {}", key);
            continue;
        };
        let frame = rotation_from_tilt(&case.coordinates[first].tilt);
        let shift = frame * Vector3::from(correction.shift);

        let target = &mut case.coordinates[second];
        for (axis, delta) in shift.iter().enumerate() {
            target.center[axis] += delta;
        }
        target.tilt = compose_tilt(&target.tilt, &correction.tilt);
        case.metadata.corrections_applied.push(key.to_string());
    }
}
