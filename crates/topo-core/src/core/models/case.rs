use super::architecture;
use super::connectivity::Connectivity;
use super::sse::{MAX_LAYERS, SseId, SseType};
use crate::core::statistics::corrections::CorrectionDocument;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_Z: f64 = 10.0;
pub const DEFAULT_X_H: f64 = 10.0;
pub const DEFAULT_X_E: f64 = 4.85;
pub const DEFAULT_LINK_DIST: f64 = 18.97;
pub const DEFAULT_LOOP_STEP: f64 = 3.2;
pub const DEFAULT_HELIX_LENGTH: u32 = 13;
pub const DEFAULT_STRAND_LENGTH: u32 = 7;

/// Errors raised while building or deserializing a [`Case`].
///
/// Each variant names the offending field with a dotted/indexed path
/// (`layers[1][0].type`) so that a caller can point the user at the exact spot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaseValidationError {
    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("'{field}' references unknown motif segment '{reference}'")]
    UnknownMotifSegment { field: String, reference: String },

    #[error("'{field}' reference '{reference}' matches several motif segments; use '<motif>.<segment>'")]
    AmbiguousMotifSegment { field: String, reference: String },

    #[error("Invalid architecture string '{input}': {reason}")]
    Architecture { input: String, reason: String },

    #[error("Invalid topology string '{input}': {reason}")]
    Topology { input: String, reason: String },
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> CaseValidationError {
    CaseValidationError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SseLengths {
    #[serde(rename = "H")]
    pub helix: u32,
    #[serde(rename = "E")]
    pub strand: u32,
}

impl SseLengths {
    pub fn for_type(&self, sse_type: SseType) -> u32 {
        match sse_type {
            SseType::Helix => self.helix,
            SseType::Strand => self.strand,
        }
    }
}

impl Default for SseLengths {
    fn default() -> Self {
        Self {
            helix: DEFAULT_HELIX_LENGTH,
            strand: DEFAULT_STRAND_LENGTH,
        }
    }
}

/// Case-level settings. Every numeric field carries a documented default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    pub name: String,
    /// Distance between stacked layers along Z (Å).
    pub default_z: f64,
    /// Spacing between two neighbouring helices of one layer (Å).
    pub default_x_h: f64,
    /// Spacing between two neighbouring strands of one layer (Å).
    pub default_x_e: f64,
    /// Spacing between a helix and a strand sharing a layer; mixed layers need it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_x_mixed: Option<f64>,
    /// Longest center-to-center distance two SSEs may have and still be joined by a loop (Å).
    pub link_dist: f64,
    /// Distance spanned by a single loop residue (Å).
    pub loop_step: f64,
    /// Flip the first SSE of a connectivity instead of the second.
    pub flip_first: bool,
    /// One or more fixed connectivities, comma separated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l_linkers: Option<Vec<u32>>,
    pub lengths: SseLengths,
}

impl Configuration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_z: DEFAULT_Z,
            default_x_h: DEFAULT_X_H,
            default_x_e: DEFAULT_X_E,
            default_x_mixed: None,
            link_dist: DEFAULT_LINK_DIST,
            loop_step: DEFAULT_LOOP_STEP,
            flip_first: false,
            connectivity: None,
            l_linkers: None,
            lengths: SseLengths::default(),
        }
    }

    /// Fixed connectivities listed in `connectivity`, in order.
    pub fn connectivities(&self) -> Vec<&str> {
        self.connectivity
            .as_deref()
            .map(|c| {
                c.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn validate(&self) -> Result<(), CaseValidationError> {
        if self.name.trim().is_empty() {
            return Err(CaseValidationError::MissingField(
                "configuration.name".to_string(),
            ));
        }
        let positive = [
            ("configuration.default_z", Some(self.default_z)),
            ("configuration.default_x_h", Some(self.default_x_h)),
            ("configuration.default_x_e", Some(self.default_x_e)),
            ("configuration.default_x_mixed", self.default_x_mixed),
            ("configuration.link_dist", Some(self.link_dist)),
            ("configuration.loop_step", Some(self.loop_step)),
        ];
        for (field, value) in positive {
            if let Some(v) = value {
                if !(v.is_finite() && v > 0.0) {
                    return Err(invalid(field, format!("must be a positive number, got {v}")));
                }
            }
        }
        if self.lengths.helix == 0 || self.lengths.strand == 0 {
            return Err(invalid("configuration.lengths", "SSE lengths must be positive"));
        }
        Ok(())
    }
}

/// Where a slot gets its residue length from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSource {
    /// Per-type default from `configuration.lengths`.
    Default,
    Fixed { length: u32 },
    /// Length and identity come from a motif segment.
    MotifRef {
        motif_id: String,
        segment_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "RawSlot")]
pub struct Slot {
    pub sse_type: SseType,
    pub source: SlotSource,
}

impl Slot {
    pub fn with_default_length(sse_type: SseType) -> Self {
        Self {
            sse_type,
            source: SlotSource::Default,
        }
    }

    pub fn fixed(sse_type: SseType, length: u32) -> Self {
        Self {
            sse_type,
            source: SlotSource::Fixed { length },
        }
    }

    pub fn motif_ref(
        sse_type: SseType,
        motif_id: impl Into<String>,
        segment_id: impl Into<String>,
    ) -> Self {
        Self {
            sse_type,
            source: SlotSource::MotifRef {
                motif_id: motif_id.into(),
                segment_id: segment_id.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Layer {
    slots: Vec<Slot>,
}

impl Layer {
    pub fn new(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn types(&self) -> impl DoubleEndedIterator<Item = SseType> + '_ {
        self.slots.iter().map(|s| s.sse_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub ini: i64,
    pub end: i64,
}

/// A functional fragment to embed verbatim: residue ranges of one chain of a reference structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Motif {
    pub id: String,
    pub pdbfile: PathBuf,
    pub chain: String,
    pub segments: Vec<Segment>,
}

impl Motif {
    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn segment_rank(&self, id: &str) -> Option<usize> {
        self.segments.iter().position(|s| s.id == id)
    }
}

/// Orientation of an SSE as XYZ Euler angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Tilt {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One SSE positioned in space by the geometry engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedSse {
    pub id: SseId,
    pub center: [f64; 3],
    #[serde(default)]
    pub tilt: Tilt,
    pub length: u32,
}

impl PlacedSse {
    pub fn center_point(&self) -> Point3<f64> {
        Point3::new(self.center[0], self.center[1], self.center[2])
    }

    /// True when the element points against the lattice Y axis.
    pub fn is_flipped(&self) -> bool {
        (self.tilt.x.rem_euclid(360.0) - 180.0).abs() < 1e-6
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalentConnectivities {
    /// Name of the equivalence relation that grouped these connectivities.
    pub relation: String,
    pub others: Vec<Connectivity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equivalent_connectivities: Option<EquivalentConnectivities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_lengths: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_ranges: Option<Vec<LoopRange>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections_applied: Vec<String>,
    /// Corrections carried by the case itself, applied after the configured ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<CorrectionDocument>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.equivalent_connectivities.is_none()
            && self.loop_lengths.is_none()
            && self.loop_ranges.is_none()
            && self.corrections_applied.is_empty()
            && self.corrections.is_empty()
    }
}

/// One topology instance as it moves through the pipeline.
///
/// A `Case` is always valid: both [`Case::new`] and deserialization run the same checks.
/// Pipeline stages never modify a `Case` in place; each returns a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCase")]
pub struct Case {
    pub(crate) configuration: Configuration,
    pub(crate) layers: Vec<Layer>,
    pub(crate) motifs: Vec<Motif>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) topology: Option<Connectivity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) coordinates: Vec<PlacedSse>,
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub(crate) metadata: Metadata,
}

impl Case {
    pub fn new(
        configuration: Configuration,
        layers: Vec<Layer>,
        motifs: Vec<Motif>,
    ) -> Result<Self, CaseValidationError> {
        let case = Self {
            configuration,
            layers,
            motifs,
            topology: None,
            coordinates: Vec::new(),
            metadata: Metadata::default(),
        };
        case.validate()?;
        Ok(case)
    }

    /// Builds a relative case from an architecture string such as `2H.4E.2H`.
    pub fn from_architecture(name: &str, notation: &str) -> Result<Self, CaseValidationError> {
        let layers = architecture::parse_architecture(notation)?;
        Self::new(Configuration::new(name), layers, Vec::new())
    }

    /// Builds a relative case from a topology string such as `B2E.C1H.B1E`.
    ///
    /// The architecture is inferred from the tokens and the traversal order is stored as
    /// the fixed `configuration.connectivity`.
    pub fn from_topology(name: &str, notation: &str) -> Result<Self, CaseValidationError> {
        let (layers, connectivity) = architecture::parse_topology(notation)?;
        let mut configuration = Configuration::new(name);
        configuration.connectivity = Some(connectivity.to_string());
        Self::new(configuration, layers, Vec::new())
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn name(&self) -> &str {
        &self.configuration.name
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn motifs(&self) -> &[Motif] {
        &self.motifs
    }

    pub fn topology(&self) -> Option<&Connectivity> {
        self.topology.as_ref()
    }

    pub fn coordinates(&self) -> &[PlacedSse] {
        &self.coordinates
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn is_placed(&self) -> bool {
        !self.coordinates.is_empty()
    }

    /// Every slot identifier, layer by layer and position by position.
    pub fn sse_ids(&self) -> Vec<SseId> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(li, layer)| {
                layer
                    .slots
                    .iter()
                    .enumerate()
                    .map(move |(pi, slot)| SseId::new(li as u8, pi as u16 + 1, slot.sse_type))
            })
            .collect()
    }

    pub fn slot(&self, id: &SseId) -> Option<&Slot> {
        self.layers
            .get(id.layer as usize)
            .and_then(|l| l.slots.get((id.position as usize).checked_sub(1)?))
            .filter(|s| s.sse_type == id.sse_type)
    }

    pub fn sse_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    /// Number of SSEs per layer.
    pub fn shape(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::len).collect()
    }

    /// How many connectivities this case already commits to; zero means "enumerate all".
    pub fn connectivity_count(&self) -> usize {
        match self.configuration.connectivities().len() {
            0 => usize::from(self.topology.is_some()),
            n => n,
        }
    }

    /// Canonical layout string, e.g. `2H.4E.2H`; mixed layers are run-length encoded (`1E2H`).
    pub fn architecture_signature(&self) -> String {
        self.layers
            .iter()
            .map(|layer| {
                let mut out = String::new();
                let mut types = layer.types().peekable();
                while let Some(t) = types.next() {
                    let mut count = 1;
                    while types.peek() == Some(&t) {
                        types.next();
                        count += 1;
                    }
                    out.push_str(&format!("{count}{t}"));
                }
                out
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn motif(&self, id: &str) -> Option<&Motif> {
        self.motifs.iter().find(|m| m.id == id)
    }

    pub fn motif_segment(&self, motif_id: &str, segment_id: &str) -> Option<&Segment> {
        self.motif(motif_id).and_then(|m| m.segment(segment_id))
    }

    pub fn placed(&self, id: &SseId) -> Option<&PlacedSse> {
        self.coordinates.iter().find(|p| &p.id == id)
    }

    /// Placed SSEs in traversal order. `None` until a topology is stamped and the case placed.
    pub fn ordered_structures(&self) -> Option<Vec<&PlacedSse>> {
        let topology = self.topology.as_ref()?;
        topology.iter().map(|id| self.placed(id)).collect()
    }

    /// `0`/`1` per SSE in architecture order, `1` marking elements that point down.
    pub fn directionality_profile(&self) -> Option<String> {
        if !self.is_placed() {
            return None;
        }
        self.sse_ids()
            .iter()
            .map(|id| {
                self.placed(id)
                    .map(|p| if p.is_flipped() { '1' } else { '0' })
            })
            .collect()
    }

    /// DSSP-like string of SSE and loop residues in traversal order (`HHHLLLEEEE...`).
    ///
    /// Loop lengths are taken from the estimator output, or from `l_linkers` when given.
    pub fn secondary_structure(&self) -> Option<String> {
        let ordered = self.ordered_structures()?;
        let loops = self
            .metadata
            .loop_lengths
            .as_ref()
            .or(self.configuration.l_linkers.as_ref())?;
        if loops.len() + 1 != ordered.len() {
            return None;
        }
        let mut out = String::new();
        for (i, sse) in ordered.iter().enumerate() {
            out.extend(std::iter::repeat_n(
                sse.id.sse_type.letter(),
                sse.length as usize,
            ));
            if let Some(&l) = loops.get(i) {
                out.extend(std::iter::repeat_n('L', l as usize));
            }
        }
        Some(out)
    }

    /// Looks up a dotted path (`configuration.link_dist`, `layers.0.1.type`) on the
    /// serialized form. Absent or null fields yield `None`.
    pub fn field(&self, key: &str) -> Option<Value> {
        let mut value = serde_json::to_value(self).ok()?;
        for part in key.split('.') {
            value = match value {
                Value::Object(mut map) => map.remove(part)?,
                Value::Array(items) => items.into_iter().nth(part.parse().ok()?)?,
                _ => return None,
            };
        }
        (!value.is_null()).then_some(value)
    }

    fn validate(&self) -> Result<(), CaseValidationError> {
        self.configuration.validate()?;

        if self.layers.is_empty() {
            return Err(invalid("layers", "at least one layer is required"));
        }
        if self.layers.len() > MAX_LAYERS {
            return Err(invalid(
                "layers",
                format!("at most {MAX_LAYERS} layers are supported"),
            ));
        }

        let mut motif_ids = HashSet::new();
        for (mi, motif) in self.motifs.iter().enumerate() {
            if !motif_ids.insert(motif.id.as_str()) {
                return Err(invalid(
                    format!("motifs[{mi}].id"),
                    format!("duplicate motif id '{}'", motif.id),
                ));
            }
            if motif.segments.is_empty() {
                return Err(CaseValidationError::MissingField(format!(
                    "motifs[{mi}].segments"
                )));
            }
            let mut segment_ids = HashSet::new();
            for (si, segment) in motif.segments.iter().enumerate() {
                if !segment_ids.insert(segment.id.as_str()) {
                    return Err(invalid(
                        format!("motifs[{mi}].segments[{si}].id"),
                        format!("duplicate segment id '{}'", segment.id),
                    ));
                }
            }
        }

        let mut bound_segments = HashSet::new();
        for (li, layer) in self.layers.iter().enumerate() {
            if layer.is_empty() {
                return Err(invalid(
                    format!("layers[{li}]"),
                    "a layer needs at least one SSE",
                ));
            }
            for (pi, slot) in layer.slots.iter().enumerate() {
                let field = format!("layers[{li}][{pi}]");
                match &slot.source {
                    SlotSource::Default => {}
                    SlotSource::Fixed { length } => {
                        if *length == 0 {
                            return Err(invalid(format!("{field}.length"), "must be positive"));
                        }
                    }
                    SlotSource::MotifRef {
                        motif_id,
                        segment_id,
                    } => {
                        if self.motif_segment(motif_id, segment_id).is_none() {
                            return Err(CaseValidationError::UnknownMotifSegment {
                                field: format!("{field}.ref"),
                                reference: format!("{motif_id}.{segment_id}"),
                            });
                        }
                        if !bound_segments.insert((motif_id.as_str(), segment_id.as_str())) {
                            return Err(invalid(
                                format!("{field}.ref"),
                                format!(
                                    "segment '{motif_id}.{segment_id}' is already bound to another slot"
                                ),
                            ));
                        }
                    }
                }
            }
        }

        let ids = self.sse_ids();
        if let Some(topology) = &self.topology {
            if !topology.is_permutation_of(&ids) {
                return Err(invalid(
                    "topology",
                    format!("'{topology}' must visit every SSE of the architecture exactly once"),
                ));
            }
        }
        for (ci, placed) in self.coordinates.iter().enumerate() {
            if !ids.contains(&placed.id) {
                return Err(invalid(
                    format!("coordinates[{ci}].id"),
                    format!("'{}' is not part of the architecture", placed.id),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawSlot {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    sse_type: Option<SseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<u32>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
}

impl From<Slot> for RawSlot {
    fn from(slot: Slot) -> Self {
        let (length, reference) = match slot.source {
            SlotSource::Default => (None, None),
            SlotSource::Fixed { length } => (Some(length), None),
            SlotSource::MotifRef {
                motif_id,
                segment_id,
            } => (None, Some(format!("{motif_id}.{segment_id}"))),
        };
        Self {
            sse_type: Some(slot.sse_type),
            length,
            reference,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfiguration {
    name: Option<String>,
    default_z: Option<f64>,
    default_x_h: Option<f64>,
    default_x_e: Option<f64>,
    default_x_mixed: Option<f64>,
    link_dist: Option<f64>,
    loop_step: Option<f64>,
    flip_first: Option<bool>,
    connectivity: Option<String>,
    l_linkers: Option<Vec<u32>>,
    lengths: Option<SseLengths>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    id: Option<String>,
    ini: Option<i64>,
    end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawMotif {
    id: Option<String>,
    pdbfile: Option<PathBuf>,
    chain: Option<String>,
    segments: Option<Vec<RawSegment>>,
}

#[derive(Debug, Deserialize)]
struct RawCase {
    configuration: Option<RawConfiguration>,
    #[serde(alias = "architecture")]
    layers: Option<Vec<Vec<RawSlot>>>,
    motifs: Option<Vec<RawMotif>>,
    #[serde(default)]
    topology: Option<Connectivity>,
    #[serde(default)]
    coordinates: Vec<PlacedSse>,
    #[serde(default)]
    metadata: Metadata,
}

fn required<T>(value: Option<T>, field: impl FnOnce() -> String) -> Result<T, CaseValidationError> {
    value.ok_or_else(|| CaseValidationError::MissingField(field()))
}

impl TryFrom<RawConfiguration> for Configuration {
    type Error = CaseValidationError;

    fn try_from(raw: RawConfiguration) -> Result<Self, Self::Error> {
        let name = required(raw.name, || "configuration.name".to_string())?;
        let mut configuration = Configuration::new(name);
        configuration.default_z = raw.default_z.unwrap_or(DEFAULT_Z);
        configuration.default_x_h = raw.default_x_h.unwrap_or(DEFAULT_X_H);
        configuration.default_x_e = raw.default_x_e.unwrap_or(DEFAULT_X_E);
        configuration.default_x_mixed = raw.default_x_mixed;
        configuration.link_dist = raw.link_dist.unwrap_or(DEFAULT_LINK_DIST);
        configuration.loop_step = raw.loop_step.unwrap_or(DEFAULT_LOOP_STEP);
        configuration.flip_first = raw.flip_first.unwrap_or(false);
        configuration.connectivity = raw.connectivity;
        configuration.l_linkers = raw.l_linkers;
        configuration.lengths = raw.lengths.unwrap_or_default();
        Ok(configuration)
    }
}

fn convert_motif(mi: usize, raw: RawMotif) -> Result<Motif, CaseValidationError> {
    let field = |name: &str| format!("motifs[{mi}].{name}");
    let id = required(raw.id, || field("id"))?;
    let pdbfile = required(raw.pdbfile, || field("pdbfile"))?;
    let chain = required(raw.chain, || field("chain"))?;
    let raw_segments = required(raw.segments, || field("segments"))?;
    let segments = raw_segments
        .into_iter()
        .enumerate()
        .map(|(si, s)| {
            let seg_field = |name: &str| format!("motifs[{mi}].segments[{si}].{name}");
            Ok(Segment {
                id: required(s.id, || seg_field("id"))?,
                ini: required(s.ini, || seg_field("ini"))?,
                end: required(s.end, || seg_field("end"))?,
            })
        })
        .collect::<Result<Vec<_>, CaseValidationError>>()?;
    Ok(Motif {
        id,
        pdbfile,
        chain,
        segments,
    })
}

/// Binds a `ref` string to exactly one motif segment.
///
/// `motif.segment` is tried first; a bare segment id must be unique across all motifs.
fn resolve_reference(
    motifs: &[Motif],
    reference: &str,
    field: &str,
) -> Result<SlotSource, CaseValidationError> {
    if let Some((motif_id, segment_id)) = reference.split_once('.') {
        if let Some(motif) = motifs.iter().find(|m| m.id == motif_id) {
            if motif.segment(segment_id).is_some() {
                return Ok(SlotSource::MotifRef {
                    motif_id: motif_id.to_string(),
                    segment_id: segment_id.to_string(),
                });
            }
        }
    }

    let mut matches = motifs
        .iter()
        .filter(|m| m.segment(reference).is_some())
        .map(|m| m.id.as_str());
    match (matches.next(), matches.next()) {
        (Some(motif_id), None) => Ok(SlotSource::MotifRef {
            motif_id: motif_id.to_string(),
            segment_id: reference.to_string(),
        }),
        (Some(_), Some(_)) => Err(CaseValidationError::AmbiguousMotifSegment {
            field: field.to_string(),
            reference: reference.to_string(),
        }),
        (None, _) => Err(CaseValidationError::UnknownMotifSegment {
            field: field.to_string(),
            reference: reference.to_string(),
        }),
    }
}

fn convert_slot(
    li: usize,
    pi: usize,
    raw: RawSlot,
    motifs: &[Motif],
) -> Result<Slot, CaseValidationError> {
    let field = format!("layers[{li}][{pi}]");
    let sse_type = required(raw.sse_type, || format!("{field}.type"))?;
    let source = match (raw.length, raw.reference) {
        (Some(_), Some(_)) => {
            return Err(invalid(
                field,
                "a motif-referenced slot takes its length from the motif; drop 'length'",
            ));
        }
        (Some(length), None) => SlotSource::Fixed { length },
        (None, Some(reference)) => resolve_reference(motifs, &reference, &format!("{field}.ref"))?,
        (None, None) => SlotSource::Default,
    };
    Ok(Slot { sse_type, source })
}

impl TryFrom<RawCase> for Case {
    type Error = CaseValidationError;

    fn try_from(raw: RawCase) -> Result<Self, Self::Error> {
        let configuration: Configuration =
            required(raw.configuration, || "configuration".to_string())?.try_into()?;
        let raw_layers = required(raw.layers, || "layers".to_string())?;
        let motifs = required(raw.motifs, || "motifs".to_string())?
            .into_iter()
            .enumerate()
            .map(|(mi, m)| convert_motif(mi, m))
            .collect::<Result<Vec<_>, _>>()?;

        let layers = raw_layers
            .into_iter()
            .enumerate()
            .map(|(li, raw_layer)| {
                raw_layer
                    .into_iter()
                    .enumerate()
                    .map(|(pi, raw_slot)| convert_slot(li, pi, raw_slot, &motifs))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Layer::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let case = Case {
            configuration,
            layers,
            motifs,
            topology: raw.topology,
            coordinates: raw.coordinates,
            metadata: raw.metadata,
        };
        case.validate()?;
        Ok(case)
    }
}
