//! # Core Module
//!
//! The stateless foundation of GridDream: molecular data, file formats, voxel grids and
//! the distance metrics that compare them.
//!
//! ## Overview
//!
//! Everything in this module is free of screening state. Candidates are read into a
//! [`models::model::Model`], rasterized by a [`grid::gridder::Gridder`] into a dense
//! channel-major buffer, and compared against a target grid with one of the
//! [`metrics::method::DistanceMethod`]s.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Typed atoms, the smina type table and the per-candidate model
//! - **File I/O** ([`io`]) - SD files, `gninatypes` dumps, raw target batches and score files
//! - **Voxel Grids** ([`grid`]) - Grid layout, channel maps, layer settings and the density gridder
//! - **Metrics** ([`metrics`]) - Host reductions, normalization and the earth mover's distance

pub mod grid;
pub mod io;
pub mod metrics;
pub mod models;
