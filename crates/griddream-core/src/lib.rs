//! # GridDream Core Library
//!
//! Grid-based molecular overlap scoring for density-guided virtual screening: candidate
//! poses are rasterized into the same voxel grids an optimization run produced, and
//! ranked by how closely they reproduce each target density.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Model`, `Atom`), file formats,
//!   grid layout and rasterization, and the pure metric reductions.
//!
//! - **[`engine`]: The Logic Core.** The screening driver, metric backends (host and, with
//!   the `cuda` feature, device), configuration builders and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Complete procedures such as the exact virtual
//!   screen and target-batch generation, ready to be called from a front end.

pub mod core;
pub mod engine;
pub mod workflows;
