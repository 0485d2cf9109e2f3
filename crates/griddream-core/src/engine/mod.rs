//! # Engine Module
//!
//! The stateful layer of GridDream: it owns the screening configuration, turns a grid
//! layer into screening mode, selects a metric backend, and drives candidates through
//! the gridder one target at a time.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Metric, device and input settings with a validating builder
//! - **Layer Setup** ([`setup`]) - Screening-mode grid layer configuration
//! - **Metric Backends** ([`backend`]) - The backend trait, the host backend and backend selection
//! - **References** ([`reference`]) - How each target positions the candidate grids
//! - **Screening Driver** ([`screen`]) - The per-target candidate loop
//! - **Progress Monitoring** ([`progress`]) - Progress events for front ends
//! - **Error Handling** ([`error`]) - Engine-level errors aggregating every layer below

pub mod backend;
pub mod config;
#[cfg(feature = "cuda")]
pub mod device;
pub mod error;
pub mod progress;
pub mod reference;
pub mod scratch;
pub mod screen;
pub mod setup;
