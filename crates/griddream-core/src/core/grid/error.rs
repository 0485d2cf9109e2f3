use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum GridError {
    #[error(
        "Grid dimension of {dim} points is not divisible by the sub-grid dimension {subgrid_dim}"
    )]
    NotDivisible { dim: usize, subgrid_dim: usize },

    #[error("Invalid grid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unknown atom type map: '{0}'")]
    UnknownTypeMap(String),

    #[error("Unsupported gridder mode: {0}")]
    UnsupportedMode(&'static str),
}
