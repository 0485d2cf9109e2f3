//! Provides input/output for the formats the screen consumes and produces.
//!
//! Candidates stream in from SD files through the [`traits::MoleculeSource`] cursor,
//! reference geometry can also come from `gninatypes` binary dumps, target grids are
//! raw `f32` batches, and scores leave as one-per-line text plus an optional CSV table.

pub mod gninatypes;
pub mod scores;
pub mod sdf;
pub mod source;
pub mod targets;
pub mod traits;
