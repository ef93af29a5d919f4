use thiserror::Error;

use super::config::ConfigError;
use super::connectivity::ConnectivityError;
use super::correction::CorrectionError;
use super::loops::LoopLengthError;
use super::placement::GeometryError;
use crate::core::io::document::CaseIoError;
use crate::core::models::case::CaseValidationError;
use crate::core::statistics::corrections::CorrectionLoadError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid case: {source}")]
    Validation {
        #[from]
        source: CaseValidationError,
    },

    #[error("Case document error: {source}")]
    CaseIo {
        #[from]
        source: CaseIoError,
    },

    #[error("Invalid build configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Geometry error: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },

    #[error("Connectivity error: {source}")]
    Connectivity {
        #[from]
        source: ConnectivityError,
    },

    #[error("Failed to load correction table: {source}")]
    CorrectionTable {
        #[from]
        source: CorrectionLoadError,
    },

    #[error("Correction failed: {source}")]
    Correction {
        #[from]
        source: CorrectionError,
    },

    #[error("Loop length estimation failed: {source}")]
    LoopLength {
        #[from]
        source: LoopLengthError,
    },

    #[error("Stage '{stage}' failed for case '{case}': {source}")]
    Stage {
        stage: &'static str,
        case: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Stage '{stage}' failed for topology {topology} of case '{case}': {source}")]
    TopologyStage {
        stage: &'static str,
        case: String,
        topology: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Attaches the pipeline stage and case name to an error.
    pub fn in_stage(self, stage: &'static str, case: &str) -> Self {
        EngineError::Stage {
            stage,
            case: case.to_string(),
            source: Box::new(self),
        }
    }

    /// Like [`EngineError::in_stage`], for a failure tied to one topology of the case.
    pub fn in_topology_stage(self, stage: &'static str, case: &str, topology: &str) -> Self {
        EngineError::TopologyStage {
            stage,
            case: case.to_string(),
            topology: topology.to_string(),
            source: Box::new(self),
        }
    }
}
