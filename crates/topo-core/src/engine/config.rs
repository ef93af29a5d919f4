use super::connectivity::equivalence::EquivalenceRelation;
use std::path::PathBuf;
use thiserror::Error;

/// Half-width of the loop length window written to `metadata.loop_ranges`.
pub const DEFAULT_LOOP_RANGE: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumerationConfig {
    pub equivalence: EquivalenceRelation,
    /// Keep at most this many equivalence classes, in discovery order.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionConfig {
    /// CSV table of empirical pair corrections; no table means no pair corrections.
    pub table_path: Option<PathBuf>,
    /// Layer and SSE correction documents (JSON or TOML), applied in order.
    pub documents: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    pub range: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            range: DEFAULT_LOOP_RANGE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildConfig {
    pub enumeration: EnumerationConfig,
    pub corrections: CorrectionConfig,
    pub loops: LoopConfig,
}

#[derive(Default)]
pub struct BuildConfigBuilder {
    equivalence: Option<EquivalenceRelation>,
    limit: Option<usize>,
    correction_table_path: Option<PathBuf>,
    correction_documents: Vec<PathBuf>,
    loop_range: Option<u32>,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equivalence(mut self, relation: EquivalenceRelation) -> Self {
        self.equivalence = Some(relation);
        self
    }
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
    pub fn correction_table_path(mut self, path: Option<PathBuf>) -> Self {
        self.correction_table_path = path;
        self
    }
    pub fn correction_documents(mut self, paths: Vec<PathBuf>) -> Self {
        self.correction_documents = paths;
        self
    }
    pub fn loop_range(mut self, range: u32) -> Self {
        self.loop_range = Some(range);
        self
    }

    pub fn build(self) -> Result<BuildConfig, ConfigError> {
        if self.limit == Some(0) {
            return Err(ConfigError::InvalidParameter {
                name: "limit",
                reason: "must keep at least one case".to_string(),
            });
        }
        let enumeration = EnumerationConfig {
            equivalence: self
                .equivalence
                .ok_or(ConfigError::MissingParameter("equivalence"))?,
            limit: self.limit,
        };
        let loops = LoopConfig {
            range: self
                .loop_range
                .ok_or(ConfigError::MissingParameter("loop_range"))?,
        };
        Ok(BuildConfig {
            enumeration,
            corrections: CorrectionConfig {
                table_path: self.correction_table_path,
                documents: self.correction_documents,
            },
            loops,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_equivalence_and_loop_range() {
        let err = BuildConfigBuilder::new().loop_range(2).build().unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("equivalence"));

        let err = BuildConfigBuilder::new()
            .equivalence(EquivalenceRelation::Exact)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("loop_range"));
    }

    #[test]
    fn builder_fills_every_section() {
        let config = BuildConfigBuilder::new()
            .equivalence(EquivalenceRelation::Directionality)
            .limit(Some(5))
            .correction_table_path(Some(PathBuf::from("corrections.csv")))
            .correction_documents(vec![PathBuf::from("layers.toml")])
            .loop_range(4)
            .build()
            .unwrap();
        assert_eq!(config.enumeration.equivalence, EquivalenceRelation::Directionality);
        assert_eq!(config.enumeration.limit, Some(5));
        assert_eq!(
            config.corrections.table_path.as_deref(),
            Some(std::path::Path::new("corrections.csv"))
        );
        assert_eq!(config.corrections.documents, [PathBuf::from("layers.toml")]);
        assert_eq!(config.loops.range, 4);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = BuildConfigBuilder::new()
            .equivalence(EquivalenceRelation::Exact)
            .loop_range(3)
            .limit(Some(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { name: "limit", .. }));
    }

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.enumeration.equivalence, EquivalenceRelation::LatticeRotation);
        assert_eq!(config.enumeration.limit, None);
        assert_eq!(config.loops.range, DEFAULT_LOOP_RANGE);
        assert!(config.corrections.table_path.is_none());
        assert!(config.corrections.documents.is_empty());
    }
}
