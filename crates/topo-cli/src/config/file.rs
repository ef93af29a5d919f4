use crate::cli::OutputFormat;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use topobuilder::engine::connectivity::equivalence::EquivalenceRelation;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileEnumerationConfig {
    pub equivalence: Option<EquivalenceRelation>,
    pub limit: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileCorrectionConfig {
    pub path: Option<PathBuf>,
    pub documents: Option<Vec<PathBuf>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileLoopConfig {
    pub range: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub enumeration: Option<FileEnumerationConfig>,
    pub corrections: Option<FileCorrectionConfig>,
    pub loops: Option<FileLoopConfig>,
    #[serde(rename = "output-format")]
    pub output_format: Option<OutputFormat>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_every_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("topo.toml");
        fs::write(
            &path,
            r#"
            output-format = "toml"

            [enumeration]
            equivalence = "lattice-rotation-and-reversal"
            limit = 12

            [corrections]
            path = "tables/corrections.csv"
            documents = ["layers.toml", "tweaks.json"]

            [loops]
            range = 2
            "#,
        )
        .unwrap();

        let config = FileConfig::from_file(&path).unwrap();
        let enumeration = config.enumeration.unwrap();
        assert_eq!(
            enumeration.equivalence,
            Some(EquivalenceRelation::LatticeRotationAndReversal)
        );
        assert_eq!(enumeration.limit, Some(12));
        let corrections = config.corrections.unwrap();
        assert_eq!(
            corrections.path,
            Some(PathBuf::from("tables/corrections.csv"))
        );
        assert_eq!(corrections.documents.unwrap().len(), 2);
        assert_eq!(config.loops.unwrap().range, Some(2));
        assert_eq!(config.output_format, Some(OutputFormat::Toml));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("topo.toml");
        fs::write(&path, "[loops]\nwidth = 3\n").unwrap();
        let err = FileConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
    }
}
