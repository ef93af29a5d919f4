use crate::core::models::case::{Case, Layer, Slot, SlotSource, SseLengths};
use crate::core::models::connectivity::Connectivity;
use crate::core::models::sse::{SseId, SseType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decides when two connectivities describe the same topology.
///
/// Every emitted case represents one equivalence class; the other members are listed in its
/// `metadata.equivalent_connectivities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EquivalenceRelation {
    /// Only identical strings are equivalent.
    Exact,
    /// Connectivities related by a 180° rotation of the lattice that maps the architecture
    /// onto itself: about the stacking axis (positions reversed in every layer), about the
    /// position axis (layer order reversed), or about the SSE axis (both). Mirror images are
    /// never merged since they differ in handedness.
    #[default]
    LatticeRotation,
    /// Lattice rotations, and a path is also equivalent to its own reverse.
    LatticeRotationAndReversal,
    /// Same up/down pattern of the SSEs read in architecture order.
    Directionality,
}

impl EquivalenceRelation {
    pub fn as_str(self) -> &'static str {
        match self {
            EquivalenceRelation::Exact => "exact",
            EquivalenceRelation::LatticeRotation => "lattice-rotation",
            EquivalenceRelation::LatticeRotationAndReversal => "lattice-rotation-and-reversal",
            EquivalenceRelation::Directionality => "directionality",
        }
    }
}

#[derive(Debug, Error)]
#[error(
    "Unknown equivalence relation '{0}' (expected exact, lattice-rotation, lattice-rotation-and-reversal or directionality)"
)]
pub struct ParseEquivalenceError(pub String);

impl FromStr for EquivalenceRelation {
    type Err = ParseEquivalenceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "exact" | "none" => Ok(EquivalenceRelation::Exact),
            "lattice-rotation" | "rotation" => Ok(EquivalenceRelation::LatticeRotation),
            "lattice-rotation-and-reversal" | "rotation-reversal" => {
                Ok(EquivalenceRelation::LatticeRotationAndReversal)
            }
            "directionality" => Ok(EquivalenceRelation::Directionality),
            _ => Err(ParseEquivalenceError(s.to_string())),
        }
    }
}

impl fmt::Display for EquivalenceRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LatticeRotation {
    Identity,
    ReversePositions,
    ReverseLayers,
    ReverseBoth,
}

impl LatticeRotation {
    fn apply(self, id: &SseId, shape: &[usize]) -> SseId {
        let layer_count = shape.len() as u8;
        let layer = match self {
            LatticeRotation::ReverseLayers | LatticeRotation::ReverseBoth => {
                layer_count - 1 - id.layer
            }
            _ => id.layer,
        };
        let position = match self {
            LatticeRotation::ReversePositions | LatticeRotation::ReverseBoth => {
                shape[layer as usize] as u16 + 1 - id.position
            }
            _ => id.position,
        };
        SseId::new(layer, position, id.sse_type)
    }
}

/// What makes a slot distinguishable after a rotation: its type and its resolved length, or
/// the motif segment it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotSignature<'a> {
    Free { sse_type: SseType, length: u32 },
    Motif {
        sse_type: SseType,
        motif: &'a str,
        segment: &'a str,
    },
}

fn signature<'a>(slot: &'a Slot, lengths: &SseLengths) -> SlotSignature<'a> {
    match &slot.source {
        SlotSource::Default => SlotSignature::Free {
            sse_type: slot.sse_type,
            length: lengths.for_type(slot.sse_type),
        },
        SlotSource::Fixed { length } => SlotSignature::Free {
            sse_type: slot.sse_type,
            length: *length,
        },
        SlotSource::MotifRef {
            motif_id,
            segment_id,
        } => SlotSignature::Motif {
            sse_type: slot.sse_type,
            motif: motif_id,
            segment: segment_id,
        },
    }
}

/// Rotations that map every slot onto a slot with the same signature.
///
/// A motif segment is bound to a single slot, so any rotation that moves a motif-bound slot
/// is rejected.
fn valid_rotations(layers: &[Layer], lengths: &SseLengths) -> Vec<LatticeRotation> {
    let signatures: Vec<Vec<SlotSignature>> = layers
        .iter()
        .map(|l| l.slots().iter().map(|s| signature(s, lengths)).collect())
        .collect();
    let n = signatures.len();
    let mirrors = |i: usize, j: usize| signatures[i].iter().eq(signatures[j].iter().rev());

    let mut rotations = vec![LatticeRotation::Identity];
    if (0..n).all(|i| mirrors(i, i)) {
        rotations.push(LatticeRotation::ReversePositions);
    }
    if (0..n).all(|i| signatures[i] == signatures[n - 1 - i]) {
        rotations.push(LatticeRotation::ReverseLayers);
    }
    if (0..n).all(|i| mirrors(i, n - 1 - i)) {
        rotations.push(LatticeRotation::ReverseBoth);
    }
    rotations
}

/// Maps connectivities of one case to a class key under an [`EquivalenceRelation`].
pub struct Canonicalizer {
    relation: EquivalenceRelation,
    rotations: Vec<LatticeRotation>,
    shape: Vec<usize>,
    architecture_order: HashMap<SseId, usize>,
    motif_slots: Vec<SseId>,
    flip_first: bool,
}

impl Canonicalizer {
    pub fn new(relation: EquivalenceRelation, case: &Case) -> Self {
        Self {
            relation,
            rotations: valid_rotations(case.layers(), &case.configuration().lengths),
            shape: case.shape(),
            architecture_order: case
                .sse_ids()
                .into_iter()
                .enumerate()
                .map(|(i, id)| (id, i))
                .collect(),
            motif_slots: case
                .sse_ids()
                .into_iter()
                .filter(|id| {
                    case.slot(id)
                        .is_some_and(|s| matches!(s.source, SlotSource::MotifRef { .. }))
                })
                .collect(),
            flip_first: case.configuration().flip_first,
        }
    }

    pub fn relation(&self) -> EquivalenceRelation {
        self.relation
    }

    pub fn key(&self, connectivity: &Connectivity) -> String {
        match self.relation {
            EquivalenceRelation::Exact => connectivity.to_string(),
            EquivalenceRelation::LatticeRotation => self.min_rotation(connectivity),
            EquivalenceRelation::LatticeRotationAndReversal => {
                let forward = self.min_rotation(connectivity);
                let backward = self.min_rotation(&connectivity.reversed());
                forward.min(backward)
            }
            EquivalenceRelation::Directionality => self.directionality(connectivity),
        }
    }

    fn min_rotation(&self, connectivity: &Connectivity) -> String {
        self.rotations
            .iter()
            .map(|rotation| {
                Connectivity::new(
                    connectivity
                        .iter()
                        .map(|id| rotation.apply(id, &self.shape))
                        .collect(),
                )
                .to_string()
            })
            .min()
            .unwrap_or_else(|| connectivity.to_string())
    }

    /// Up/down profile in architecture order. Motif-bound slots also contribute their place
    /// along the chain, so paths that carry the motif at different positions stay apart.
    fn directionality(&self, connectivity: &Connectivity) -> String {
        let mut profile = vec!['0'; self.architecture_order.len()];
        for (step, id) in connectivity.iter().enumerate() {
            if let Some(&slot) = self.architecture_order.get(id) {
                if is_flipped_step(step, self.flip_first) {
                    profile[slot] = '1';
                }
            }
        }
        let mut key: String = profile.into_iter().collect();
        for id in &self.motif_slots {
            if let Some(step) = connectivity.position_of(id) {
                key.push_str(&format!("|{id}@{step}"));
            }
        }
        key
    }
}

/// Whether the SSE at traversal `step` points against the lattice axis.
pub fn is_flipped_step(step: usize, flip_first: bool) -> bool {
    (step + usize::from(flip_first)) % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::case::{Configuration, Motif, Segment};
    use std::path::PathBuf;

    fn key(relation: EquivalenceRelation, architecture: &str, connectivity: &str) -> String {
        let case = Case::from_architecture("eq", architecture).unwrap();
        Canonicalizer::new(relation, &case).key(&connectivity.parse().unwrap())
    }

    #[test]
    fn exact_relation_keeps_strings_apart() {
        let a = key(EquivalenceRelation::Exact, "2H.2H", "A1H.A2H.B2H.B1H");
        let b = key(EquivalenceRelation::Exact, "2H.2H", "A2H.A1H.B1H.B2H");
        assert_ne!(a, b);
    }

    #[test]
    fn position_reversal_merges_palindromic_layers() {
        let a = key(EquivalenceRelation::LatticeRotation, "2H.2H", "A1H.A2H.B2H.B1H");
        let b = key(EquivalenceRelation::LatticeRotation, "2H.2H", "A2H.A1H.B1H.B2H");
        assert_eq!(a, b);
    }

    #[test]
    fn layer_reversal_needs_matching_layers() {
        let a = key(EquivalenceRelation::LatticeRotation, "2H.2H", "A1H.A2H.B2H.B1H");
        let b = key(EquivalenceRelation::LatticeRotation, "2H.2H", "B1H.B2H.A2H.A1H");
        assert_eq!(a, b);

        let c = key(EquivalenceRelation::LatticeRotation, "2H.2E", "A1H.A2H.B2E.B1E");
        let d = key(EquivalenceRelation::LatticeRotation, "2H.2E", "A2H.A1H.B1E.B2E");
        assert_eq!(c, d);
        let e = key(EquivalenceRelation::LatticeRotation, "2H.2E", "B1E.B2E.A2H.A1H");
        assert_ne!(c, e);
    }

    #[test]
    fn asymmetric_mixed_layer_blocks_position_reversal() {
        let case = Case::from_architecture("eq", "1E2H").unwrap();
        let rotations = valid_rotations(case.layers(), &case.configuration().lengths);
        assert!(!rotations.contains(&LatticeRotation::ReversePositions));
        assert!(!rotations.contains(&LatticeRotation::ReverseBoth));
    }

    fn motif_on_a1(architecture: &str) -> Case {
        let plain = Case::from_architecture("eq", architecture).unwrap();
        let mut layers: Vec<Layer> = plain.layers().to_vec();
        let mut first: Vec<Slot> = layers[0].slots().to_vec();
        first[0] = Slot::motif_ref(first[0].sse_type, "site", "s1");
        layers[0] = Layer::new(first);
        let motif = Motif {
            id: "site".to_string(),
            pdbfile: PathBuf::from("site.pdb"),
            chain: "A".to_string(),
            segments: vec![Segment {
                id: "s1".to_string(),
                ini: 1,
                end: 13,
            }],
        };
        Case::new(Configuration::new("eq"), layers, vec![motif]).unwrap()
    }

    #[test]
    fn motif_bound_slot_blocks_every_rotation() {
        let case = motif_on_a1("2H.2H");
        let rotations = valid_rotations(case.layers(), &case.configuration().lengths);
        assert_eq!(rotations, vec![LatticeRotation::Identity]);

        let canon = Canonicalizer::new(EquivalenceRelation::LatticeRotation, &case);
        let a = canon.key(&"A1H.A2H.B2H.B1H".parse().unwrap());
        let b = canon.key(&"A2H.A1H.B1H.B2H".parse().unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn fixed_lengths_must_match_under_rotation() {
        let plain = Case::from_architecture("eq", "2H").unwrap();
        let layers = vec![Layer::new(vec![
            Slot::fixed(SseType::Helix, 13),
            Slot::fixed(SseType::Helix, 20),
        ])];
        let case = Case::new(plain.configuration().clone(), layers, vec![]).unwrap();
        let rotations = valid_rotations(case.layers(), &case.configuration().lengths);
        assert!(!rotations.contains(&LatticeRotation::ReversePositions));

        let defaulted = vec![Layer::new(vec![
            Slot::fixed(SseType::Helix, 13),
            Slot::with_default_length(SseType::Helix),
        ])];
        let case = Case::new(plain.configuration().clone(), defaulted, vec![]).unwrap();
        let rotations = valid_rotations(case.layers(), &case.configuration().lengths);
        assert!(rotations.contains(&LatticeRotation::ReversePositions));
    }

    #[test]
    fn directionality_separates_motif_positions() {
        let case = motif_on_a1("2H.2H");
        let canon = Canonicalizer::new(EquivalenceRelation::Directionality, &case);
        // same up/down profile "0110", motif first versus motif last
        let a = canon.key(&"A1H.A2H.B2H.B1H".parse().unwrap());
        let b = canon.key(&"B2H.B1H.A1H.A2H".parse().unwrap());
        assert!(a.starts_with("0110") && b.starts_with("0110"));
        assert_ne!(a, b);
    }

    #[test]
    fn reversal_relation_merges_a_path_with_its_reverse() {
        let forward = "A1H.A2H.A3H";
        let backward = "A3H.A2H.A1H";
        let rot_a = key(EquivalenceRelation::LatticeRotation, "3H", forward);
        let rot_b = key(EquivalenceRelation::LatticeRotation, "3H", backward);
        // reversing positions of a 3-helix layer maps A1H.A2H.A3H to A3H.A2H.A1H as well
        assert_eq!(rot_a, rot_b);

        let a = key(EquivalenceRelation::LatticeRotation, "2H.1H", "A1H.B1H.A2H");
        let b = key(EquivalenceRelation::LatticeRotation, "2H.1H", "A2H.B1H.A1H");
        assert_eq!(a, b);
        let c = key(EquivalenceRelation::LatticeRotation, "2H.1H", "B1H.A1H.A2H");
        let d = key(EquivalenceRelation::LatticeRotation, "2H.1H", "A1H.A2H.B1H");
        assert_ne!(c, d);
        let c = key(EquivalenceRelation::LatticeRotationAndReversal, "2H.1H", "B1H.A1H.A2H");
        let d = key(EquivalenceRelation::LatticeRotationAndReversal, "2H.1H", "A2H.A1H.B1H");
        assert_eq!(c, d);
    }

    #[test]
    fn directionality_reads_alternating_flips_in_architecture_order() {
        let k = key(EquivalenceRelation::Directionality, "2H.2H", "A1H.A2H.B2H.B1H");
        assert_eq!(k, "0110");
        let same = key(EquivalenceRelation::Directionality, "2H.2H", "A1H.B1H.B2H.A2H");
        assert_eq!(same, k);
        let other = key(EquivalenceRelation::Directionality, "2H.2H", "B1H.A2H.A1H.B2H");
        assert_eq!(other, "0101");
    }

    #[test]
    fn relation_names_parse_back() {
        for relation in [
            EquivalenceRelation::Exact,
            EquivalenceRelation::LatticeRotation,
            EquivalenceRelation::LatticeRotationAndReversal,
            EquivalenceRelation::Directionality,
        ] {
            assert_eq!(relation.to_string().parse::<EquivalenceRelation>().unwrap(), relation);
        }
        assert!("mirror".parse::<EquivalenceRelation>().is_err());
    }
}
