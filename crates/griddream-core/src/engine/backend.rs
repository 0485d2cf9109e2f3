use super::config::{Device, MetricConfig};
use super::error::EngineError;
use crate::core::grid::layout::GridLayout;
use crate::core::metrics::emd::CostMatrix;
use crate::core::metrics::host::{self, Thresholds};
use crate::core::metrics::method::{self, DistanceMethod, HostRootMode};
use std::sync::Arc;
use tracing::info;

/// Compares candidate grids against the ligand block of one target at a time.
pub trait MetricBackend: Send {
    fn name(&self) -> &'static str;

    fn method(&self) -> DistanceMethod;

    /// Called once before the candidates of a target are scored.
    fn begin_target(&mut self, _target: &[f32]) -> Result<(), EngineError> {
        Ok(())
    }

    /// Normalized score of one candidate's ligand block against the current target.
    ///
    /// `natoms` is the candidate's movable atom count.
    fn score(&mut self, target: &[f32], screen: &[f32], natoms: usize)
    -> Result<f32, EngineError>;

    /// The host backend, when scores can be computed from shared references.
    fn as_host(&self) -> Option<&HostBackend> {
        None
    }
}

/// CPU reductions over host memory.
#[derive(Debug, Clone)]
pub struct HostBackend {
    method: DistanceMethod,
    thresholds: Thresholds,
    root_mode: HostRootMode,
    cost: Option<Arc<CostMatrix>>,
}

impl HostBackend {
    pub fn new(
        method: DistanceMethod,
        thresholds: Thresholds,
        root_mode: HostRootMode,
        cost: Option<Arc<CostMatrix>>,
    ) -> Self {
        Self {
            method,
            thresholds,
            root_mode,
            cost,
        }
    }

    pub fn root_mode(&self) -> HostRootMode {
        self.root_mode
    }

    pub fn evaluate(&self, target: &[f32], screen: &[f32], natoms: usize) -> Result<f32, EngineError> {
        let norm = method::normalization_factor(natoms, screen.len())?;
        let raw = host::raw_score(
            self.method,
            target,
            screen,
            self.thresholds,
            self.cost.as_deref(),
        )?;
        Ok(method::finalize(self.method, raw, norm, self.root_mode))
    }
}

impl MetricBackend for HostBackend {
    fn name(&self) -> &'static str {
        "host"
    }

    fn method(&self) -> DistanceMethod {
        self.method
    }

    fn score(
        &mut self,
        target: &[f32],
        screen: &[f32],
        natoms: usize,
    ) -> Result<f32, EngineError> {
        self.evaluate(target, screen, natoms)
    }

    fn as_host(&self) -> Option<&HostBackend> {
        Some(self)
    }
}

/// Builds the cost matrix when the configured method needs one.
pub fn build_cost_matrix(
    config: &MetricConfig,
    layout: &GridLayout,
    resolution: f32,
) -> Result<Option<Arc<CostMatrix>>, EngineError> {
    if config.method != DistanceMethod::Emd || !config.compute_cost {
        return Ok(None);
    }
    let cost = CostMatrix::build(
        layout.points_per_side,
        config.subgrid_dim,
        layout.num_ligand_types,
        resolution,
    )?;
    info!(
        "Precomputed EMD cost matrix over {} bins ({} sub-cubes per side).",
        cost.n(),
        cost.blocks_per_side()
    );
    Ok(Some(Arc::new(cost)))
}

/// Selects the backend for `device`.
pub fn create_backend(
    device: Device,
    config: &MetricConfig,
    layout: &GridLayout,
    resolution: f32,
) -> Result<Box<dyn MetricBackend>, EngineError> {
    let cost = build_cost_matrix(config, layout, resolution)?;
    match device {
        Device::Host => Ok(Box::new(HostBackend::new(
            config.method,
            config.thresholds,
            config.host_root_mode,
            cost,
        ))),
        #[cfg(feature = "cuda")]
        Device::Cuda { ordinal } => Ok(Box::new(super::device::CudaBackend::new(
            ordinal,
            config.method,
            config.thresholds,
            cost,
        )?)),
        #[cfg(not(feature = "cuda"))]
        Device::Cuda { .. } => Err(EngineError::Device(
            "this build has no CUDA support; rebuild with the `cuda` feature".to_string(),
        )),
    }
}
