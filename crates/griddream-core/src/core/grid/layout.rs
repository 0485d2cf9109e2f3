use super::error::GridError;

/// Shape of one example grid: a receptor-channel block followed by a ligand-channel
/// block, each channel a cube of `points_per_side³` voxels in x-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridLayout {
    pub points_per_side: usize,
    pub num_receptor_types: usize,
    pub num_ligand_types: usize,
}

impl GridLayout {
    pub fn new(points_per_side: usize, num_receptor_types: usize, num_ligand_types: usize) -> Self {
        Self {
            points_per_side,
            num_receptor_types,
            num_ligand_types,
        }
    }

    /// Number of points along one edge for a cubic grid of `dimension` Angstroms.
    pub fn points_for(dimension: f32, resolution: f32) -> Result<usize, GridError> {
        if !(resolution > 0.0) || !resolution.is_finite() {
            return Err(GridError::InvalidGeometry(format!(
                "resolution must be positive, got {}",
                resolution
            )));
        }
        if !(dimension >= 0.0) || !dimension.is_finite() {
            return Err(GridError::InvalidGeometry(format!(
                "dimension must be non-negative, got {}",
                dimension
            )));
        }
        Ok((dimension / resolution).round() as usize + 1)
    }

    pub fn num_grid_points(&self) -> usize {
        self.points_per_side.pow(3)
    }

    pub fn rec_grid_size(&self) -> usize {
        self.num_grid_points() * self.num_receptor_types
    }

    pub fn lig_grid_size(&self) -> usize {
        self.num_grid_points() * self.num_ligand_types
    }

    pub fn example_size(&self) -> usize {
        self.rec_grid_size() + self.lig_grid_size()
    }

    /// Offset of target `index` within a batch, skipping its receptor block.
    pub fn ligand_offset(&self, index: usize) -> usize {
        index * self.example_size() + self.rec_grid_size()
    }

    /// Flat index of a voxel within a channel block that starts at channel 0.
    #[inline]
    pub fn voxel_index(&self, channel: usize, x: usize, y: usize, z: usize) -> usize {
        let n = self.points_per_side;
        ((channel * n + x) * n + y) * n + z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_channel_counts() {
        let layout = GridLayout::new(4, 2, 3);
        assert_eq!(layout.num_grid_points(), 64);
        assert_eq!(layout.rec_grid_size(), 128);
        assert_eq!(layout.lig_grid_size(), 192);
        assert_eq!(layout.example_size(), 320);
        assert_eq!(layout.ligand_offset(0), 128);
        assert_eq!(layout.ligand_offset(2), 2 * 320 + 128);
    }

    #[test]
    fn points_include_both_edges() {
        assert_eq!(GridLayout::points_for(23.5, 0.5).unwrap(), 48);
        assert_eq!(GridLayout::points_for(1.5, 0.5).unwrap(), 4);
        assert_eq!(GridLayout::points_for(0.0, 0.5).unwrap(), 1);
    }

    #[test]
    fn non_positive_resolution_is_rejected() {
        assert!(GridLayout::points_for(10.0, 0.0).is_err());
        assert!(GridLayout::points_for(10.0, -1.0).is_err());
        assert!(GridLayout::points_for(-1.0, 0.5).is_err());
    }

    #[test]
    fn voxel_index_is_x_major() {
        let layout = GridLayout::new(3, 0, 2);
        assert_eq!(layout.voxel_index(0, 0, 0, 1), 1);
        assert_eq!(layout.voxel_index(0, 0, 1, 0), 3);
        assert_eq!(layout.voxel_index(0, 1, 0, 0), 9);
        assert_eq!(layout.voxel_index(1, 0, 0, 0), 27);
    }
}
