use crate::core::models::case::{Case, Configuration, Layer, Motif, PlacedSse, SlotSource, Tilt};
use crate::core::models::sse::{SseId, SseType, layer_letter};
use crate::engine::connectivity::orient;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error(
        "Layer {layer} puts {left} next to {right} but no helix/strand spacing is configured (set 'default_x_mixed')"
    )]
    UndefinedSpacing {
        layer: char,
        left: SseId,
        right: SseId,
    },

    #[error("Motif segment '{motif}.{segment}' has an invalid residue range {ini}..{end}")]
    InvalidMotifSegment {
        motif: String,
        segment: String,
        ini: i64,
        end: i64,
    },

    #[error("Slot {slot} references motif segment '{motif}.{segment}' which does not exist")]
    UnresolvedReference {
        slot: SseId,
        motif: String,
        segment: String,
    },
}

/// Intra-layer spacing between two neighbouring SSE types, if the configuration defines one.
pub fn spacing(left: SseType, right: SseType, config: &Configuration) -> Option<f64> {
    match (left, right) {
        (SseType::Helix, SseType::Helix) => Some(config.default_x_h),
        (SseType::Strand, SseType::Strand) => Some(config.default_x_e),
        _ => config.default_x_mixed,
    }
}

/// X coordinate of every slot of a layer, spaced by type and centered on X = 0.
fn layer_x_positions(
    layer_index: usize,
    layer: &Layer,
    config: &Configuration,
) -> Result<Vec<f64>, GeometryError> {
    let mut xs = Vec::with_capacity(layer.len());
    let mut x = 0.0;
    let mut previous: Option<SseType> = None;
    for (pi, sse_type) in layer.types().enumerate() {
        if let Some(prev) = previous {
            x += spacing(prev, sse_type, config).ok_or_else(|| GeometryError::UndefinedSpacing {
                layer: layer_letter(layer_index),
                left: SseId::new(layer_index as u8, pi as u16, prev),
                right: SseId::new(layer_index as u8, pi as u16 + 1, sse_type),
            })?;
        }
        xs.push(x);
        previous = Some(sse_type);
    }
    let shift = xs.last().copied().unwrap_or(0.0) / 2.0;
    Ok(xs.into_iter().map(|x| x - shift).collect())
}

fn motif_segment_length(
    slot: SseId,
    motifs: &[Motif],
    motif_id: &str,
    segment_id: &str,
) -> Result<u32, GeometryError> {
    let segment = motifs
        .iter()
        .find(|m| m.id == motif_id)
        .and_then(|m| m.segment(segment_id))
        .ok_or_else(|| GeometryError::UnresolvedReference {
            slot,
            motif: motif_id.to_string(),
            segment: segment_id.to_string(),
        })?;

    let invalid = || GeometryError::InvalidMotifSegment {
        motif: motif_id.to_string(),
        segment: segment_id.to_string(),
        ini: segment.ini,
        end: segment.end,
    };
    if segment.end < segment.ini {
        return Err(invalid());
    }
    u32::try_from(segment.end - segment.ini + 1).map_err(|_| invalid())
}

/// Places every SSE of an architecture on the idealized lattice.
///
/// Layer `k` sits at `z = k * default_z`; within a layer SSEs are spaced along X by type and
/// centered on X = 0. All elements start untilted and running along +Y.
pub fn place_layers(
    layers: &[Layer],
    motifs: &[Motif],
    config: &Configuration,
) -> Result<Vec<PlacedSse>, GeometryError> {
    let mut placed = Vec::with_capacity(layers.iter().map(Layer::len).sum());
    for (li, layer) in layers.iter().enumerate() {
        let xs = layer_x_positions(li, layer, config)?;
        let z = li as f64 * config.default_z;
        debug!(
            "Layer {}: {} SSE(s) at z = {:.2}, x = {:?}",
            layer_letter(li),
            layer.len(),
            z,
            xs
        );

        for (pi, (slot, x)) in layer.slots().iter().zip(xs).enumerate() {
            let id = SseId::new(li as u8, pi as u16 + 1, slot.sse_type);
            let length = match &slot.source {
                SlotSource::Default => config.lengths.for_type(slot.sse_type),
                SlotSource::Fixed { length } => *length,
                SlotSource::MotifRef {
                    motif_id,
                    segment_id,
                } => motif_segment_length(id, motifs, motif_id, segment_id)?,
            };
            placed.push(PlacedSse {
                id,
                center: [x, 0.0, z],
                tilt: Tilt::default(),
                length,
            });
        }
    }
    Ok(placed)
}

/// Returns a copy of `case` with freshly computed lattice coordinates.
///
/// Geometry derived from earlier coordinates (loop lengths, applied corrections) is dropped.
/// A stamped topology is kept and its orientation re-applied.
pub fn place(case: &Case) -> Result<Case, GeometryError> {
    let mut coordinates = place_layers(&case.layers, &case.motifs, &case.configuration)?;
    if let Some(topology) = &case.topology {
        orient(&mut coordinates, topology, case.configuration.flip_first);
    }

    let mut placed = case.clone();
    placed.coordinates = coordinates;
    placed.metadata.loop_lengths = None;
    placed.metadata.loop_ranges = None;
    placed.metadata.corrections_applied.clear();
    debug!(
        "Placed {} SSE(s) for case '{}'",
        placed.coordinates.len(),
        placed.name()
    );
    Ok(placed)
}
