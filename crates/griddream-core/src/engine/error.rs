use thiserror::Error;

use super::config::ConfigError;
use crate::core::grid::error::GridError;
use crate::core::io::gninatypes::GninaTypesError;
use crate::core::io::scores::ScoreWriteError;
use crate::core::io::targets::TargetError;
use crate::core::io::traits::MoleculeSourceError;
use crate::core::metrics::method::MetricError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),

    #[error("Molecule source error: {0}")]
    Source(#[from] MoleculeSourceError),

    #[error("Failed to read reference atoms from '{path}': {source}", path = path.display())]
    Reference {
        path: PathBuf,
        #[source]
        source: GninaTypesError,
    },

    #[error("Target data error: {0}")]
    Target(#[from] TargetError),

    #[error("Virtual screen requires a molecular grid layer, got a '{kind}' layer")]
    WrongLayerKind { kind: String },

    #[error("Candidate {candidate} screened against target {target} has no movable atoms")]
    EmptyCandidate { target: usize, candidate: usize },

    #[error(
        "Target examples hold {target_example_size} values but the gridder produces {grid_example_size}"
    )]
    LayoutMismatch {
        target_example_size: usize,
        grid_example_size: usize,
    },

    #[error("Requested {requested} targets but only {available} are available")]
    TargetCount { requested: usize, available: usize },

    #[error("Device error: {0}")]
    Device(String),

    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("Failed to write scores to '{path}': {source}", path = path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: ScoreWriteError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
