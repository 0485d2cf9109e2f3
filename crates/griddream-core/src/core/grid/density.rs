use super::error::GridError;
use super::gridder::Gridder;
use super::layout::GridLayout;
use super::params::MolGridParameter;
use super::typemap::TypeMap;
use crate::core::models::atom::Atom;
use nalgebra::{Point3, Vector3};
use tracing::trace;

/// Density contributed at squared distance `dist_sq` by an atom of radius `radius`.
///
/// Gaussian out to the radius, then a quadratic tail that reaches zero at 1.5 radii
/// with a continuous value and slope at the join.
#[inline]
pub fn atom_density(dist_sq: f32, radius: f32) -> f32 {
    let r_sq = radius * radius;
    if dist_sq > 2.25 * r_sq {
        return 0.0;
    }
    if dist_sq <= r_sq {
        return (-2.0 * dist_sq / r_sq).exp();
    }
    let q = dist_sq.sqrt() / radius;
    const E_MINUS_2: f32 = 0.135_335_28;
    E_MINUS_2 * (4.0 * q * q - 12.0 * q + 9.0)
}

/// Computes the geometric centre of a set of atoms.
pub fn centroid(atoms: &[Atom]) -> Option<Point3<f32>> {
    if atoms.is_empty() {
        return None;
    }
    let sum = atoms
        .iter()
        .fold(Vector3::zeros(), |acc, atom| acc + atom.position.coords);
    Some(Point3::from(sum / atoms.len() as f32))
}

/// An in-memory gridder producing one example at a time.
#[derive(Debug, Clone)]
pub struct DensityGridder {
    layout: GridLayout,
    dimension: f32,
    resolution: f32,
    radius_multiplier: f32,
    ligand_map: TypeMap,
    receptor_map: TypeMap,
    ignore_rec: bool,
    ignore_ligand: bool,
    use_rec_center: bool,
    ligand: Vec<Atom>,
    receptor: Vec<Atom>,
    center: Option<Point3<f32>>,
    labels: (f32, f32),
    buffer: Vec<f32>,
}

impl DensityGridder {
    pub fn from_params(param: &MolGridParameter) -> Result<Self, GridError> {
        if !param.inmemory {
            return Err(GridError::UnsupportedMode(
                "only in-memory grid layers can be rasterized directly",
            ));
        }
        if param.batch_size != 1 {
            return Err(GridError::UnsupportedMode(
                "in-memory gridding requires a batch size of 1",
            ));
        }
        if !(param.radius_multiplier > 0.0) {
            return Err(GridError::InvalidGeometry(format!(
                "radius multiplier must be positive, got {}",
                param.radius_multiplier
            )));
        }

        let layout = param.layout()?;

        Ok(Self {
            layout,
            dimension: param.dimension,
            resolution: param.resolution,
            radius_multiplier: param.radius_multiplier,
            ligand_map: TypeMap::new(param.ligand_map),
            receptor_map: TypeMap::new(param.receptor_map),
            ignore_rec: param.ignore_rec,
            ignore_ligand: param.ignore_ligand,
            use_rec_center: param.use_rec_center,
            ligand: Vec::new(),
            receptor: Vec::new(),
            center: None,
            labels: (0.0, 0.0),
            buffer: vec![0.0; layout.example_size()],
        })
    }

    pub fn labels(&self) -> (f32, f32) {
        self.labels
    }

    /// The centre the next forward pass will use.
    pub fn current_center(&self) -> Point3<f32> {
        self.center
            .or_else(|| centroid(&self.ligand))
            .unwrap_or_else(Point3::origin)
    }

    fn rasterize(&mut self, atoms_are_ligand: bool, origin: Point3<f32>) {
        let (atoms, map, block_start) = if atoms_are_ligand {
            (&self.ligand, &self.ligand_map, self.layout.rec_grid_size())
        } else {
            (&self.receptor, &self.receptor_map, 0)
        };
        let n = self.layout.points_per_side;
        let res = self.resolution;

        for atom in atoms {
            let Some(channel) = map.channel(atom.atom_type) else {
                continue;
            };
            let radius = atom.atom_type.xs_radius() * self.radius_multiplier;
            let cutoff = 1.5 * radius;
            let rel = atom.position - origin;

            let Some(ranges) = axis_range(rel.x, cutoff, res, n)
                .zip(axis_range(rel.y, cutoff, res, n))
                .zip(axis_range(rel.z, cutoff, res, n))
                .map(|((x, y), z)| (x, y, z))
            else {
                continue;
            };

            for x in ranges.0.clone() {
                let dx = x as f32 * res - rel.x;
                for y in ranges.1.clone() {
                    let dy = y as f32 * res - rel.y;
                    for z in ranges.2.clone() {
                        let dz = z as f32 * res - rel.z;
                        let density = atom_density(dx * dx + dy * dy + dz * dz, radius);
                        if density > 0.0 {
                            let idx = block_start + self.layout.voxel_index(channel, x, y, z);
                            self.buffer[idx] += density;
                        }
                    }
                }
            }
        }
    }
}

/// Voxel indices along one axis within `cutoff` of `coord`, or `None` if none fall
/// inside the grid.
fn axis_range(
    coord: f32,
    cutoff: f32,
    resolution: f32,
    n: usize,
) -> Option<std::ops::RangeInclusive<usize>> {
    let lo = ((coord - cutoff) / resolution).ceil().max(0.0);
    let hi = ((coord + cutoff) / resolution).floor().min((n - 1) as f32);
    if lo > hi {
        return None;
    }
    Some(lo as usize..=hi as usize)
}

impl Gridder for DensityGridder {
    fn layout(&self) -> GridLayout {
        self.layout
    }

    fn dimension(&self) -> f32 {
        self.dimension
    }

    fn resolution(&self) -> f32 {
        self.resolution
    }

    fn set_ligand(&mut self, atoms: &[Atom]) {
        self.ligand.clear();
        self.ligand.extend_from_slice(atoms);
    }

    fn set_receptor(&mut self, atoms: &[Atom]) {
        self.receptor.clear();
        self.receptor.extend_from_slice(atoms);
        if self.use_rec_center {
            // An empty receptor falls back to the ligand centroid, never a stale centre.
            self.center = centroid(atoms);
        }
    }

    fn set_grid_center(&mut self, center: Point3<f32>) {
        self.center = Some(center);
    }

    fn set_labels(&mut self, affinity: f32, label: f32) {
        self.labels = (affinity, label);
    }

    fn forward(&mut self) -> Result<&[f32], GridError> {
        let center = self.current_center();
        let half = (self.layout.points_per_side - 1) as f32 * self.resolution / 2.0;
        let origin = center - Vector3::new(half, half, half);
        trace!(
            ligand_atoms = self.ligand.len(),
            receptor_atoms = self.receptor.len(),
            "Rasterizing example centred at ({:.3}, {:.3}, {:.3})",
            center.x,
            center.y,
            center.z
        );

        self.buffer.fill(0.0);
        if !self.ignore_rec {
            self.rasterize(false, origin);
        }
        if !self.ignore_ligand {
            self.rasterize(true, origin);
        }
        Ok(&self.buffer)
    }
}
