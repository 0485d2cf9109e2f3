//! # Workflows Module
//!
//! Top-level entry points of GridDream. Each workflow takes a grid layer and a fully
//! validated configuration, builds the collaborators it needs, reports progress, and
//! leaves its results on disk or returns them to the caller.
//!
//! ## Architecture
//!
//! - **Virtual Screen** ([`screen`]) - Exact scoring of every candidate pose against each
//!   target grid, with one score file per target. The approximate screen is exposed only
//!   as an explicit error.
//! - **Target Generation** ([`grid`]) - Rasterizes molecules into a target batch file in
//!   the layout a screen consumes.

pub mod grid;
pub mod screen;
