//! Voxel grids: their layout, the channel maps that assign atom types to channels, the
//! grid layer settings, and the gridder that rasterizes atoms into a dense buffer.

pub mod density;
pub mod error;
pub mod gridder;
pub mod layout;
pub mod params;
pub mod typemap;
