use super::error::GridError;
use super::layout::GridLayout;
use crate::core::models::atom::Atom;
use nalgebra::Point3;

/// Rasterizes typed atoms into a dense multi-channel voxel grid.
///
/// A gridder is a single reusable buffer: every `set_*` call overwrites the state the
/// next `forward` pass reads, and the slice `forward` returns is only valid until the
/// gridder is touched again.
pub trait Gridder {
    fn layout(&self) -> GridLayout;

    /// Cube edge length in Angstroms.
    fn dimension(&self) -> f32;

    /// Voxel edge length in Angstroms.
    fn resolution(&self) -> f32;

    fn set_ligand(&mut self, atoms: &[Atom]);

    /// Replaces the receptor. Layers centred on the receptor recentre here, and an
    /// empty receptor drops back to the ligand centroid.
    fn set_receptor(&mut self, atoms: &[Atom]);

    fn set_grid_center(&mut self, center: Point3<f32>);

    fn set_labels(&mut self, affinity: f32, label: f32);

    /// Produces the grid for the current ligand/receptor state.
    ///
    /// # Errors
    ///
    /// Returns an error if the gridder cannot rasterize its current state.
    fn forward(&mut self) -> Result<&[f32], GridError>;

    fn example_size(&self) -> usize {
        self.layout().example_size()
    }

    fn num_grid_points(&self) -> usize {
        self.layout().num_grid_points()
    }

    fn num_ligand_types(&self) -> usize {
        self.layout().num_ligand_types
    }

    fn num_receptor_types(&self) -> usize {
        self.layout().num_receptor_types
    }
}
