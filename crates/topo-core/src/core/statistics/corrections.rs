use crate::core::io::document::{CaseFormat, CaseIoError};
use crate::core::models::case::Tilt;
use crate::core::models::sse::{SseId, SseType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Identifies a pair of consecutive SSEs by their types and relative lattice offset.
///
/// Offsets are measured from the first SSE of the pair to the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrectionKey {
    pub first: SseType,
    pub second: SseType,
    pub layer_offset: i32,
    pub position_offset: i32,
}

impl CorrectionKey {
    pub fn between(first: &SseId, second: &SseId) -> Self {
        Self {
            first: first.sse_type,
            second: second.sse_type,
            layer_offset: i32::from(second.layer) - i32::from(first.layer),
            position_offset: i32::from(second.position) - i32::from(first.position),
        }
    }
}

impl fmt::Display for CorrectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}[{:+},{:+}]",
            self.first, self.second, self.layer_offset, self.position_offset
        )
    }
}

/// Shift (Å) and tilt (degrees) applied to the second SSE of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Correction {
    pub shift: [f64; 3],
    pub tilt: Tilt,
}

#[derive(Debug, Deserialize)]
struct CorrectionRecord {
    type_i: SseType,
    type_j: SseType,
    layer_offset: i32,
    position_offset: i32,
    dx: f64,
    dy: f64,
    dz: f64,
    tx: f64,
    ty: f64,
    tz: f64,
}

#[derive(Debug, Error)]
pub enum CorrectionLoadError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Duplicate correction entry {key} in '{path}'")]
    Duplicate { path: String, key: CorrectionKey },
    #[error("Failed to read correction document '{path}': {source}")]
    Document { path: String, source: CaseIoError },
}

/// Per-pair geometric corrections keyed by [`CorrectionKey`].
///
/// Missing keys are expected for rare pairings and simply mean "no correction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionTable {
    entries: HashMap<CorrectionKey, Correction>,
}

impl CorrectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: CorrectionKey, correction: Correction) -> Option<Correction> {
        self.entries.insert(key, correction)
    }

    pub fn get(&self, key: &CorrectionKey) -> Option<&Correction> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads a table from CSV with the header
    /// `type_i,type_j,layer_offset,position_offset,dx,dy,dz,tx,ty,tz`.
    pub fn load(path: &Path) -> Result<Self, CorrectionLoadError> {
        let path_str = || path.to_string_lossy().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(path)
            .map_err(|e| CorrectionLoadError::Csv {
                path: path_str(),
                source: e,
            })?;

        let mut table = Self::new();
        for result in reader.deserialize::<CorrectionRecord>() {
            let record = result.map_err(|e| CorrectionLoadError::Csv {
                path: path_str(),
                source: e,
            })?;
            let key = CorrectionKey {
                first: record.type_i,
                second: record.type_j,
                layer_offset: record.layer_offset,
                position_offset: record.position_offset,
            };
            let correction = Correction {
                shift: [record.dx, record.dy, record.dz],
                tilt: Tilt {
                    x: record.tx,
                    y: record.ty,
                    z: record.tz,
                },
            };
            if table.insert(key, correction).is_some() {
                return Err(CorrectionLoadError::Duplicate {
                    path: path_str(),
                    key,
                });
            }
        }
        Ok(table)
    }
}

/// Horizontal placement of a layer against the widest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical alignment of the SSEs of a layer on their termini.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerCorrection {
    pub xalign: XAlign,
    pub yalign: YAlign,
    /// Bends the layer along a circular arc whose middle sits `zcurve` Å below its edges on Z.
    /// Layers of fewer than three SSEs stay flat.
    pub zcurve: f64,
}

impl LayerCorrection {
    pub fn is_noop(&self) -> bool {
        self.xalign == XAlign::Center && self.yalign == YAlign::Middle && self.zcurve == 0.0
    }
}

/// Absolute shift (Å) and tilt (degrees) applied to one named SSE.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SseCorrection {
    pub shift: [f64; 3],
    pub tilt: Tilt,
}

/// Corrections addressed to layers (by letter) and to single SSEs (by id).
///
/// Layer corrections are applied before SSE corrections. Documents are read from JSON or
/// TOML, or embedded in a case under `metadata.corrections`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorrectionDocument {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub layers: BTreeMap<String, LayerCorrection>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sse: BTreeMap<SseId, SseCorrection>,
}

impl CorrectionDocument {
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.sse.is_empty()
    }

    /// Reads a document, choosing the syntax from the file extension.
    pub fn load(path: &Path) -> Result<Self, CorrectionLoadError> {
        let wrap = |source: CaseIoError| CorrectionLoadError::Document {
            path: path.to_string_lossy().to_string(),
            source,
        };
        let format = CaseFormat::from_path(path).map_err(wrap)?;
        let content = std::fs::read_to_string(path).map_err(|e| wrap(e.into()))?;
        match format {
            CaseFormat::Json => serde_json::from_str(&content).map_err(|e| wrap(e.into())),
            CaseFormat::Toml => toml::from_str(&content).map_err(|e| wrap(e.into())),
        }
    }
}

/// Every correction source a build applies: documents first, then the pair table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corrections {
    pub documents: Vec<CorrectionDocument>,
    pub table: CorrectionTable,
}

impl Corrections {
    pub fn new() -> Self {
        Self::default()
    }
}

impl From<CorrectionTable> for Corrections {
    fn from(table: CorrectionTable) -> Self {
        Self {
            documents: Vec::new(),
            table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const HEADER: &str = "type_i,type_j,layer_offset,position_offset,dx,dy,dz,tx,ty,tz";

    #[test]
    fn load_succeeds_with_valid_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("corrections.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "# helix pairs").unwrap();
        writeln!(file, "H, H, 0, 1, 0.5, 0.0, -0.2, 0.0, 0.0, 12.0").unwrap();
        writeln!(file, "E,H,1,-1,0.0,1.0,0.0,5.0,0.0,0.0").unwrap();

        let table = CorrectionTable::load(&file_path).unwrap();
        assert_eq!(table.len(), 2);

        let key = CorrectionKey {
            first: SseType::Helix,
            second: SseType::Helix,
            layer_offset: 0,
            position_offset: 1,
        };
        let correction = table.get(&key).unwrap();
        assert_eq!(correction.shift, [0.5, 0.0, -0.2]);
        assert_eq!(correction.tilt.z, 12.0);
    }

    #[test]
    fn load_fails_for_missing_column() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("broken.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "type_i,type_j,layer_offset,dx").unwrap();
        writeln!(file, "H,H,0,1.0").unwrap();

        let result = CorrectionTable::load(&file_path);
        assert!(matches!(result, Err(CorrectionLoadError::Csv { .. })));
    }

    #[test]
    fn load_fails_for_unknown_sse_type() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad_type.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "X,H,0,1,0,0,0,0,0,0").unwrap();

        assert!(matches!(
            CorrectionTable::load(&file_path),
            Err(CorrectionLoadError::Csv { .. })
        ));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("dup.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "H,E,1,0,0,0,0,0,0,0").unwrap();
        writeln!(file, "H,E,1,0,1,0,0,0,0,0").unwrap();

        let err = CorrectionTable::load(&file_path).unwrap_err();
        assert!(err.to_string().contains("HE[+1,+0]"), "{err}");
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = CorrectionTable::load(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(CorrectionLoadError::Csv { .. })));
    }

    #[test]
    fn document_reads_layer_and_sse_sections_from_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tweaks.json");
        std::fs::write(
            &path,
            r#"{
                "layers": { "B": { "xalign": "right", "zcurve": 2.5 } },
                "sse": { "A1H": { "shift": [0.0, 1.5, 0.0], "tilt": { "x": 0, "y": 0, "z": 10 } } }
            }"#,
        )
        .unwrap();

        let doc = CorrectionDocument::load(&path).unwrap();
        let layer = doc.layers["B"];
        assert_eq!(layer.xalign, XAlign::Right);
        assert_eq!(layer.yalign, YAlign::Middle);
        assert_eq!(layer.zcurve, 2.5);
        let a1 = doc.sse[&"A1H".parse::<SseId>().unwrap()];
        assert_eq!(a1.shift, [0.0, 1.5, 0.0]);
        assert_eq!(a1.tilt.z, 10.0);
    }

    #[test]
    fn document_reads_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tweaks.toml");
        std::fs::write(
            &path,
            r#"
[layers.A]
yalign = "top"

[sse.B2E]
shift = [1.0, 0.0, 0.0]
"#,
        )
        .unwrap();

        let doc = CorrectionDocument::load(&path).unwrap();
        assert_eq!(doc.layers["A"].yalign, YAlign::Top);
        assert_eq!(doc.sse.len(), 1);
    }

    #[test]
    fn document_rejects_unknown_sections_and_formats() {
        let dir = tempdir().unwrap();
        let json = dir.path().join("typo.json");
        std::fs::write(&json, r#"{ "layer": {} }"#).unwrap();
        assert!(matches!(
            CorrectionDocument::load(&json),
            Err(CorrectionLoadError::Document { .. })
        ));

        let yaml = dir.path().join("tweaks.yaml");
        std::fs::write(&yaml, "").unwrap();
        let err = CorrectionDocument::load(&yaml).unwrap_err();
        assert!(err.to_string().contains("tweaks.yaml"), "{err}");
    }

    #[test]
    fn key_offsets_are_second_minus_first() {
        let a: SseId = "B3E".parse().unwrap();
        let b: SseId = "A1H".parse().unwrap();
        let key = CorrectionKey::between(&a, &b);
        assert_eq!(key.layer_offset, -1);
        assert_eq!(key.position_offset, -2);
        assert_eq!(key.to_string(), "EH[-1,-2]");
    }
}
