//! Distance metrics between a target grid and a candidate grid.
//!
//! [`method`] names the metrics and their normalization, [`host`] holds the CPU
//! reductions, and [`emd`] the sub-cube pooling, cost matrix and transport solver the
//! earth mover's distance is built on.

pub mod emd;
pub mod host;
pub mod method;
