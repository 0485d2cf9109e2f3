use crate::core::metrics::emd::DEFAULT_SUBGRID_DIM;
use crate::core::metrics::host::Thresholds;
use crate::core::metrics::method::{DistanceMethod, HostRootMode};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Got {references} reference entries for {outputs} output files")]
    ReferenceCount { references: usize, outputs: usize },
    #[error("The EMD method needs the cost matrix, but cost computation is disabled")]
    CostMatrixDisabled,
    #[error("Sub-grid dimension must be positive")]
    ZeroSubgridDim,
}

/// Where metric kernels run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Host,
    Cuda {
        ordinal: usize,
    },
}

impl Device {
    pub fn is_host(&self) -> bool {
        matches!(self, Device::Host)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricConfig {
    pub method: DistanceMethod,
    pub thresholds: Thresholds,
    pub host_root_mode: HostRootMode,
    pub compute_cost: bool,
    pub subgrid_dim: usize,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            method: DistanceMethod::default(),
            thresholds: Thresholds::default(),
            host_root_mode: HostRootMode::default(),
            compute_cost: true,
            subgrid_dim: DEFAULT_SUBGRID_DIM,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    pub metric: MetricConfig,
    pub device: Device,
    /// Multi-molecule file of candidate poses.
    pub screen_file: PathBuf,
    /// One entry per target: `none`, a `.gninatypes` dump, or a molecule file whose
    /// atoms centre the grid.
    pub references: Vec<String>,
    /// One score file per target.
    pub outputs: Vec<PathBuf>,
    pub summary_path: Option<PathBuf>,
}

impl ScreenConfig {
    pub fn num_targets(&self) -> usize {
        self.outputs.len()
    }
}

#[derive(Default)]
pub struct ScreenConfigBuilder {
    method: Option<DistanceMethod>,
    thresholds: Option<Thresholds>,
    host_root_mode: Option<HostRootMode>,
    compute_cost: Option<bool>,
    subgrid_dim: Option<usize>,
    device: Option<Device>,
    screen_file: Option<PathBuf>,
    references: Option<Vec<String>>,
    outputs: Option<Vec<PathBuf>>,
    summary_path: Option<PathBuf>,
}

impl ScreenConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: DistanceMethod) -> Self {
        self.method = Some(method);
        self
    }
    pub fn thresholds(mut self, positive: f32, negative: f32) -> Self {
        self.thresholds = Some(Thresholds { positive, negative });
        self
    }
    pub fn host_root_mode(mut self, mode: HostRootMode) -> Self {
        self.host_root_mode = Some(mode);
        self
    }
    pub fn compute_cost(mut self, compute: bool) -> Self {
        self.compute_cost = Some(compute);
        self
    }
    pub fn subgrid_dim(mut self, dim: usize) -> Self {
        self.subgrid_dim = Some(dim);
        self
    }
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }
    pub fn screen_file(mut self, path: PathBuf) -> Self {
        self.screen_file = Some(path);
        self
    }
    pub fn references(mut self, references: Vec<String>) -> Self {
        self.references = Some(references);
        self
    }
    pub fn outputs(mut self, outputs: Vec<PathBuf>) -> Self {
        self.outputs = Some(outputs);
        self
    }
    pub fn summary_path(mut self, path: Option<PathBuf>) -> Self {
        self.summary_path = path;
        self
    }

    pub fn build(self) -> Result<ScreenConfig, ConfigError> {
        let defaults = MetricConfig::default();
        let metric = MetricConfig {
            method: self.method.ok_or(ConfigError::MissingParameter("method"))?,
            thresholds: self.thresholds.unwrap_or(defaults.thresholds),
            host_root_mode: self.host_root_mode.unwrap_or(defaults.host_root_mode),
            compute_cost: self.compute_cost.unwrap_or(defaults.compute_cost),
            subgrid_dim: self.subgrid_dim.unwrap_or(defaults.subgrid_dim),
        };
        if metric.subgrid_dim == 0 {
            return Err(ConfigError::ZeroSubgridDim);
        }
        if metric.method == DistanceMethod::Emd && !metric.compute_cost {
            return Err(ConfigError::CostMatrixDisabled);
        }

        let references = self
            .references
            .ok_or(ConfigError::MissingParameter("references"))?;
        let outputs = self.outputs.ok_or(ConfigError::MissingParameter("outputs"))?;
        if references.len() != outputs.len() {
            return Err(ConfigError::ReferenceCount {
                references: references.len(),
                outputs: outputs.len(),
            });
        }

        Ok(ScreenConfig {
            metric,
            device: self.device.unwrap_or_default(),
            screen_file: self
                .screen_file
                .ok_or(ConfigError::MissingParameter("screen_file"))?,
            references,
            outputs,
            summary_path: self.summary_path,
        })
    }
}
