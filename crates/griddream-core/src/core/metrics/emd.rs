use crate::core::grid::error::GridError;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use tracing::debug;

/// Edge length, in grid points, of the sub-cubes density is pooled into for EMD.
pub const DEFAULT_SUBGRID_DIM: usize = 4;

/// Ground distances between (sub-cube, channel) bins, stored as a packed triangle.
///
/// Bin `cube * ntypes + type` holds the pooled density of one channel inside one
/// sub-cube. Moving mass within a channel costs the distance between sub-cube centres;
/// moving it across channels costs the largest such distance.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    points_per_side: usize,
    subgrid_dim: usize,
    blocks_per_side: usize,
    ntypes: usize,
    max_cost: f32,
    values: Vec<f32>,
}

#[inline]
fn packed_index(i: usize, j: usize) -> usize {
    let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
    hi * (hi + 1) / 2 + lo
}

impl CostMatrix {
    /// Precomputes the cost of every bin pair for a cubic grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::NotDivisible`] if `points_per_side` is not a multiple of
    /// `subgrid_dim`, before anything is allocated.
    pub fn build(
        points_per_side: usize,
        subgrid_dim: usize,
        ntypes: usize,
        resolution: f32,
    ) -> Result<Self, GridError> {
        if subgrid_dim == 0 || points_per_side % subgrid_dim != 0 {
            return Err(GridError::NotDivisible {
                dim: points_per_side,
                subgrid_dim,
            });
        }
        if ntypes == 0 || points_per_side == 0 {
            return Err(GridError::InvalidGeometry(
                "cost matrix needs at least one channel and one sub-cube".to_string(),
            ));
        }

        let blocks_per_side = points_per_side / subgrid_dim;
        let ncubes = blocks_per_side.pow(3);
        let n = ncubes * ntypes;
        let cube_len = subgrid_dim as f32 * resolution;
        let max_cost = 3f32.sqrt() * (blocks_per_side - 1) as f32 * cube_len;
        debug!(
            blocks_per_side,
            ncubes,
            bins = n,
            "Building EMD cost matrix with {} packed entries",
            n * (n + 1) / 2
        );

        let block_of = |cube: usize| -> [usize; 3] {
            let z = cube % blocks_per_side;
            let y = (cube / blocks_per_side) % blocks_per_side;
            let x = cube / (blocks_per_side * blocks_per_side);
            [x, y, z]
        };

        // Same-channel cost depends only on the block offset between two cubes.
        let mut by_offset = vec![0.0f32; ncubes];
        for (offset, slot) in by_offset.iter_mut().enumerate() {
            let d2: usize = block_of(offset).iter().map(|d| d * d).sum();
            *slot = (d2 as f32).sqrt() * cube_len;
        }

        let mut values = vec![max_cost; n * (n + 1) / 2];
        for j in 0..n {
            let (cube_j, type_j) = (j / ntypes, j % ntypes);
            let bj = block_of(cube_j);
            let row = &mut values[packed_index(0, j)..=packed_index(j, j)];
            for cube_i in 0..=cube_j {
                let bi = block_of(cube_i);
                let offset = (bi[0].abs_diff(bj[0]) * blocks_per_side + bi[1].abs_diff(bj[1]))
                    * blocks_per_side
                    + bi[2].abs_diff(bj[2]);
                row[cube_i * ntypes + type_j] = by_offset[offset];
            }
        }

        Ok(Self {
            points_per_side,
            subgrid_dim,
            blocks_per_side,
            ntypes,
            max_cost,
            values,
        })
    }

    pub fn points_per_side(&self) -> usize {
        self.points_per_side
    }

    pub fn subgrid_dim(&self) -> usize {
        self.subgrid_dim
    }

    pub fn blocks_per_side(&self) -> usize {
        self.blocks_per_side
    }

    pub fn ncubes(&self) -> usize {
        self.blocks_per_side.pow(3)
    }

    pub fn ntypes(&self) -> usize {
        self.ntypes
    }

    /// Number of bins along one side of the matrix.
    pub fn n(&self) -> usize {
        self.ncubes() * self.ntypes
    }

    pub fn max_cost(&self) -> f32 {
        self.max_cost
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[packed_index(i, j)]
    }

    pub fn packed(&self) -> &[f32] {
        &self.values
    }
}

/// Pools a ligand-channel grid into per-(sub-cube, channel) masses.
///
/// Negative densities carry no mass.
pub fn aggregate_subcubes(grid: &[f32], cost: &CostMatrix) -> Vec<f32> {
    let dim = cost.points_per_side;
    let sub = cost.subgrid_dim;
    let bps = cost.blocks_per_side;
    let ntypes = cost.ntypes;
    let mut masses = vec![0.0f32; cost.n()];

    for (idx, &value) in grid.iter().enumerate().take(ntypes * dim * dim * dim) {
        if value <= 0.0 {
            continue;
        }
        let z = idx % dim;
        let y = (idx / dim) % dim;
        let x = (idx / (dim * dim)) % dim;
        let channel = idx / (dim * dim * dim);
        let cube = ((x / sub) * bps + y / sub) * bps + z / sub;
        masses[cube * ntypes + channel] += value;
    }
    masses
}

/// Earth mover's distance between two mass distributions over the bins of `cost`.
///
/// The common mass `min(Σa, Σb)` is transported at minimum cost and any surplus is
/// charged at the maximum ground distance.
pub fn earth_movers_distance(cost: &CostMatrix, supply: &[f32], demand: &[f32]) -> f32 {
    let ntypes = cost.ntypes;
    let max_cost = cost.max_cost as f64;

    // Mass already in place stays put.
    let mut sources = vec![Vec::new(); ntypes];
    let mut sinks = vec![Vec::new(); ntypes];
    let (mut excess, mut deficit) = (0.0f64, 0.0f64);
    for (bin, (&a, &b)) in supply.iter().zip(demand).enumerate() {
        let (a, b) = (a.max(0.0) as f64, b.max(0.0) as f64);
        if a > b {
            sources[bin % ntypes].push((bin, a - b));
            excess += a - b;
        } else if b > a {
            sinks[bin % ntypes].push((bin, b - a));
            deficit += b - a;
        }
    }

    // Any move between channels costs the maximum distance, so each channel is matched
    // on its own and the mass left over crosses channels at that flat rate.
    let mut matched = Shipment::default();
    for (channel_sources, channel_sinks) in sources.iter().zip(&sinks) {
        if channel_sources.is_empty() || channel_sinks.is_empty() {
            continue;
        }
        // Costs are symmetric; searches grow from the shorter side.
        let (roots, leaves) = if channel_sources.len() <= channel_sinks.len() {
            (channel_sources, channel_sinks)
        } else {
            (channel_sinks, channel_sources)
        };
        let shipment = Transport::new(cost, roots, leaves).solve();
        matched.cost += shipment.cost;
        matched.mass += shipment.mass;
    }

    let crossing = (excess.min(deficit) - matched.mass).max(0.0);
    let surplus = (excess - deficit).abs();
    (matched.cost + (crossing + surplus) * max_cost) as f32
}

#[derive(Debug, Default, Clone, Copy)]
struct Shipment {
    cost: f64,
    mass: f64,
}

/// Shortest-path key ordered by `f64::total_cmp`.
#[derive(Debug, Clone, Copy)]
struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Distance {}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Distance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Min-cost transportation by successive shortest paths with node potentials.
///
/// Nodes `0..nsrc` are sources and the rest are sinks. Ground costs are read from the
/// packed matrix and only edges that carry flow are stored.
struct Transport<'a> {
    cost: &'a CostMatrix,
    sources: Vec<usize>,
    sinks: Vec<usize>,
    supply: Vec<f64>,
    demand: Vec<f64>,
    flow: HashMap<(usize, usize), f64>,
    inbound: Vec<Vec<usize>>,
    eps: f64,
}

impl<'a> Transport<'a> {
    fn new(cost: &'a CostMatrix, sources: &[(usize, f64)], sinks: &[(usize, f64)]) -> Self {
        let supply: Vec<f64> = sources.iter().map(|&(_, m)| m).collect();
        let demand: Vec<f64> = sinks.iter().map(|&(_, m)| m).collect();
        let scale = supply.iter().sum::<f64>().max(demand.iter().sum::<f64>());
        Self {
            cost,
            sources: sources.iter().map(|&(bin, _)| bin).collect(),
            sinks: sinks.iter().map(|&(bin, _)| bin).collect(),
            supply,
            demand,
            flow: HashMap::new(),
            inbound: vec![Vec::new(); sinks.len()],
            eps: scale * 1e-9,
        }
    }

    #[inline]
    fn edge_cost(&self, s: usize, t: usize) -> f64 {
        self.cost.get(self.sources[s], self.sinks[t]) as f64
    }

    fn carried(&self, s: usize, t: usize) -> f64 {
        self.flow.get(&(s, t)).copied().unwrap_or(0.0)
    }

    fn ship(&mut self, s: usize, t: usize, amount: f64) {
        let carried = self.carried(s, t) + amount;
        if carried > self.eps {
            if self.flow.insert((s, t), carried).is_none() {
                self.inbound[t].push(s);
            }
        } else if self.flow.remove(&(s, t)).is_some() {
            self.inbound[t].retain(|&other| other != s);
        }
    }

    fn solve(mut self) -> Shipment {
        let nsrc = self.sources.len();
        let nsnk = self.sinks.len();
        let nodes = nsrc + nsnk;
        let mut potential = vec![0.0f64; nodes];
        let mut dist = vec![f64::INFINITY; nodes];
        let mut prev = vec![usize::MAX; nodes];
        let mut done = vec![false; nodes];
        let mut shipped = 0.0;

        loop {
            let remaining = self
                .supply
                .iter()
                .sum::<f64>()
                .min(self.demand.iter().sum::<f64>());
            if remaining <= self.eps {
                break;
            }

            dist.fill(f64::INFINITY);
            prev.fill(usize::MAX);
            done.fill(false);

            // Sources with supply left sit at distance zero and are settled together.
            for s in 0..nsrc {
                if self.supply[s] <= self.eps {
                    continue;
                }
                dist[s] = 0.0;
                done[s] = true;
                for t in 0..nsnk {
                    let v = nsrc + t;
                    let reduced = self.edge_cost(s, t) + potential[s] - potential[v];
                    let nd = reduced.max(0.0);
                    if nd < dist[v] {
                        dist[v] = nd;
                        prev[v] = s;
                    }
                }
            }
            let mut frontier: BinaryHeap<Reverse<(Distance, usize)>> = (nsrc..nodes)
                .filter(|&v| dist[v].is_finite())
                .map(|v| Reverse((Distance(dist[v]), v)))
                .collect();

            let mut target = None;
            while let Some(Reverse((Distance(d), u))) = frontier.pop() {
                if done[u] || d > dist[u] {
                    continue;
                }
                done[u] = true;

                if u >= nsrc {
                    let t = u - nsrc;
                    if self.demand[t] > self.eps {
                        target = Some(u);
                        break;
                    }
                    // Residual edges back to sources that currently ship to this sink.
                    for &s in &self.inbound[t] {
                        if done[s] {
                            continue;
                        }
                        let reduced = -self.edge_cost(s, t) + potential[u] - potential[s];
                        let nd = d + reduced.max(0.0);
                        if nd < dist[s] {
                            dist[s] = nd;
                            prev[s] = u;
                            frontier.push(Reverse((Distance(nd), s)));
                        }
                    }
                } else {
                    for t in 0..nsnk {
                        let v = nsrc + t;
                        if done[v] {
                            continue;
                        }
                        let reduced = self.edge_cost(u, t) + potential[u] - potential[v];
                        let nd = d + reduced.max(0.0);
                        if nd < dist[v] {
                            dist[v] = nd;
                            prev[v] = u;
                            frontier.push(Reverse((Distance(nd), v)));
                        }
                    }
                }
            }

            let Some(sink) = target else {
                break;
            };

            // Bottleneck along the path.
            let mut bottleneck = self.demand[sink - nsrc];
            let mut v = sink;
            while prev[v] != usize::MAX {
                let u = prev[v];
                if u >= nsrc {
                    bottleneck = bottleneck.min(self.carried(v, u - nsrc));
                }
                v = u;
            }
            bottleneck = bottleneck.min(self.supply[v]);

            let mut v = sink;
            while prev[v] != usize::MAX {
                let u = prev[v];
                if u < nsrc {
                    self.ship(u, v - nsrc, bottleneck);
                } else {
                    self.ship(v, u - nsrc, -bottleneck);
                }
                v = u;
            }
            self.supply[v] -= bottleneck;
            self.demand[sink - nsrc] -= bottleneck;
            shipped += bottleneck;

            let reach = dist[sink];
            for (p, &d) in potential.iter_mut().zip(&dist) {
                *p += d.min(reach);
            }
        }

        let cost = self
            .flow
            .iter()
            .map(|(&(s, t), &f)| f * self.edge_cost(s, t))
            .sum();
        Shipment {
            cost,
            mass: shipped,
        }
    }
}
