use super::backend::MetricBackend;
use super::error::EngineError;
use crate::core::metrics::emd::{self, CostMatrix};
use crate::core::metrics::host::Thresholds;
use crate::core::metrics::method::{self, DistanceMethod, MetricError, RawScore};
use cudarc::driver::{
    CudaContext, CudaFunction, CudaSlice, CudaStream, LaunchConfig, PushKernelArg,
};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info};

const BLOCK_SIZE: u32 = 256;
const MAX_BLOCKS: u32 = 1024;

const KERNELS: &str = r#"
__device__ void block_accumulate(float acc, float* out) {
    __shared__ float partial[256];
    unsigned int tid = threadIdx.x;
    partial[tid] = acc;
    __syncthreads();
    for (unsigned int stride = blockDim.x / 2; stride > 0; stride >>= 1) {
        if (tid < stride) partial[tid] += partial[tid + stride];
        __syncthreads();
    }
    if (tid == 0) atomicAdd(out, partial[0]);
}

#define GRID_STRIDE(i, n) \
    for (unsigned int i = blockIdx.x * blockDim.x + threadIdx.x; i < (n); i += blockDim.x * gridDim.x)

extern "C" __global__ void reduce_l1(const float* t, const float* s, float* out, unsigned int slot, unsigned int n) {
    float acc = 0.0f;
    GRID_STRIDE(i, n) { acc += fabsf(t[i] - s[i]); }
    block_accumulate(acc, out + slot);
}

extern "C" __global__ void reduce_l2sq(const float* t, const float* s, float* out, unsigned int slot, unsigned int n) {
    float acc = 0.0f;
    GRID_STRIDE(i, n) { float d = t[i] - s[i]; acc += d * d; }
    block_accumulate(acc, out + slot);
}

extern "C" __global__ void reduce_mult(const float* t, const float* s, float* out, unsigned int slot, unsigned int n) {
    float acc = 0.0f;
    GRID_STRIDE(i, n) { acc += t[i] * s[i]; }
    block_accumulate(acc, out + slot);
}

extern "C" __global__ void reduce_thresh(const float* t, const float* s, float* out, unsigned int slot, unsigned int n,
                                         float positive, float negative) {
    float acc = 0.0f;
    GRID_STRIDE(i, n) {
        float tv = t[i];
        float limit = tv >= 0.0f ? positive : negative;
        float mag = fabsf(tv);
        if (mag > 0.0f && mag > limit) {
            float d = tv - s[i];
            acc += d * d;
        }
    }
    block_accumulate(acc, out + slot);
}

extern "C" __global__ void aggregate_subcubes(const float* grid, float* masses, unsigned int dim,
                                              unsigned int subgrid_dim, unsigned int blocks_per_side,
                                              unsigned int ntypes) {
    unsigned int n = ntypes * dim * dim * dim;
    GRID_STRIDE(i, n) {
        float v = grid[i];
        if (v <= 0.0f) continue;
        unsigned int z = i % dim;
        unsigned int y = (i / dim) % dim;
        unsigned int x = (i / (dim * dim)) % dim;
        unsigned int channel = i / (dim * dim * dim);
        unsigned int cube = ((x / subgrid_dim) * blocks_per_side + y / subgrid_dim) * blocks_per_side + z / subgrid_dim;
        atomicAdd(masses + cube * ntypes + channel, v);
    }
}
"#;

fn device_error<E: Display>(what: &'static str) -> impl FnOnce(E) -> EngineError {
    move |e| EngineError::Device(format!("{}: {}", what, e))
}

struct Kernels {
    l1: CudaFunction,
    l2sq: CudaFunction,
    mult: CudaFunction,
    thresh: CudaFunction,
    aggregate: CudaFunction,
}

/// Metric kernels on a CUDA device.
///
/// Reductions accumulate into a two-float device scratch that is zeroed before every
/// candidate; the earth mover's distance pools masses on the device and solves the
/// transport problem on the host.
pub struct CudaBackend {
    stream: Arc<CudaStream>,
    kernels: Kernels,
    method: DistanceMethod,
    thresholds: Thresholds,
    cost: Option<Arc<CostMatrix>>,
    scratch: CudaSlice<f32>,
    target: Option<CudaSlice<f32>>,
    target_masses: Vec<f32>,
}

impl CudaBackend {
    pub fn new(
        ordinal: usize,
        method: DistanceMethod,
        thresholds: Thresholds,
        cost: Option<Arc<CostMatrix>>,
    ) -> Result<Self, EngineError> {
        if method == DistanceMethod::Emd && cost.is_none() {
            return Err(MetricError::MissingCostMatrix.into());
        }
        let context = CudaContext::new(ordinal).map_err(device_error("CUDA init failed"))?;
        let stream = context.default_stream();

        let ptx = cudarc::nvrtc::compile_ptx(KERNELS)
            .map_err(device_error("failed to compile metric kernels"))?;
        let module = context
            .load_module(ptx)
            .map_err(device_error("failed to load metric kernels"))?;
        let load = |name: &'static str| {
            module
                .load_function(name)
                .map_err(device_error("missing metric kernel"))
        };
        let kernels = Kernels {
            l1: load("reduce_l1")?,
            l2sq: load("reduce_l2sq")?,
            mult: load("reduce_mult")?,
            thresh: load("reduce_thresh")?,
            aggregate: load("aggregate_subcubes")?,
        };

        let scratch = stream
            .alloc_zeros::<f32>(2)
            .map_err(device_error("failed to allocate score scratch"))?;
        info!("CUDA backend ready on device {} for '{}'.", ordinal, method);

        Ok(Self {
            stream,
            kernels,
            method,
            thresholds,
            cost,
            scratch,
            target: None,
            target_masses: Vec::new(),
        })
    }

    fn launch_config(n: usize) -> LaunchConfig {
        let blocks = (n as u32).div_ceil(BLOCK_SIZE).clamp(1, MAX_BLOCKS);
        LaunchConfig {
            grid_dim: (blocks, 1, 1),
            block_dim: (BLOCK_SIZE, 1, 1),
            shared_mem_bytes: 0,
        }
    }

    fn reduce(
        &mut self,
        kernel: Reduction,
        target: &CudaSlice<f32>,
        screen: &CudaSlice<f32>,
        slot: u32,
        n: usize,
    ) -> Result<(), EngineError> {
        let config = Self::launch_config(n);
        let n = n as u32;
        let func = match kernel {
            Reduction::L1 => &self.kernels.l1,
            Reduction::L2sq => &self.kernels.l2sq,
            Reduction::Mult => &self.kernels.mult,
            Reduction::Thresh => &self.kernels.thresh,
        };
        let mut builder = self.stream.launch_builder(func);
        builder
            .arg(target)
            .arg(screen)
            .arg(&mut self.scratch)
            .arg(&slot)
            .arg(&n);
        if matches!(kernel, Reduction::Thresh) {
            builder
                .arg(&self.thresholds.positive)
                .arg(&self.thresholds.negative);
        }
        unsafe { builder.launch(config) }.map_err(device_error("kernel launch failed"))?;
        Ok(())
    }

    fn pooled_masses(&self, grid: &CudaSlice<f32>, cost: &CostMatrix) -> Result<Vec<f32>, EngineError> {
        let mut masses = self
            .stream
            .alloc_zeros::<f32>(cost.n())
            .map_err(device_error("failed to allocate mass buffer"))?;
        let dim = cost.points_per_side() as u32;
        let subgrid_dim = cost.subgrid_dim() as u32;
        let bps = cost.blocks_per_side() as u32;
        let ntypes = cost.ntypes() as u32;
        let config = Self::launch_config(cost.ntypes() * cost.points_per_side().pow(3));
        unsafe {
            self.stream
                .launch_builder(&self.kernels.aggregate)
                .arg(grid)
                .arg(&mut masses)
                .arg(&dim)
                .arg(&subgrid_dim)
                .arg(&bps)
                .arg(&ntypes)
                .launch(config)
        }
        .map_err(device_error("kernel launch failed"))?;
        self.stream
            .synchronize()
            .map_err(device_error("device synchronization failed"))?;
        self.stream
            .clone_dtoh(&masses)
            .map_err(device_error("failed to copy masses back"))
    }
}

#[derive(Clone, Copy)]
enum Reduction {
    L1,
    L2sq,
    Mult,
    Thresh,
}

impl MetricBackend for CudaBackend {
    fn name(&self) -> &'static str {
        "cuda"
    }

    fn method(&self) -> DistanceMethod {
        self.method
    }

    fn begin_target(&mut self, target: &[f32]) -> Result<(), EngineError> {
        let d_target = self
            .stream
            .clone_htod(target)
            .map_err(device_error("failed to upload target grid"))?;
        if let Some(cost) = self.cost.clone() {
            self.target_masses = self.pooled_masses(&d_target, &cost)?;
        }
        debug!("Uploaded target block of {} values.", target.len());
        self.target = Some(d_target);
        Ok(())
    }

    fn score(
        &mut self,
        target: &[f32],
        screen: &[f32],
        natoms: usize,
    ) -> Result<f32, EngineError> {
        if target.len() != screen.len() {
            return Err(MetricError::LengthMismatch {
                target: target.len(),
                screen: screen.len(),
            }
            .into());
        }
        let n = screen.len();
        let norm = method::normalization_factor(natoms, n)?;
        let d_target = self.target.take().ok_or_else(|| {
            EngineError::Internal("candidate scored before its target was uploaded".to_string())
        })?;
        let result = self.score_uploaded(&d_target, screen, n);
        self.target = Some(d_target);
        let raw = result?;
        Ok(method::finalize_device(self.method, raw, norm))
    }
}

impl CudaBackend {
    fn score_uploaded(
        &mut self,
        d_target: &CudaSlice<f32>,
        screen: &[f32],
        n: usize,
    ) -> Result<RawScore, EngineError> {
        let d_screen = self
            .stream
            .clone_htod(screen)
            .map_err(device_error("failed to upload candidate grid"))?;

        self.stream
            .memset_zeros(&mut self.scratch)
            .map_err(device_error("failed to clear score scratch"))?;
        match self.method {
            DistanceMethod::L1 => self.reduce(Reduction::L1, d_target, &d_screen, 0, n)?,
            DistanceMethod::L2 => self.reduce(Reduction::L2sq, d_target, &d_screen, 0, n)?,
            DistanceMethod::Mult => self.reduce(Reduction::Mult, d_target, &d_screen, 0, n)?,
            DistanceMethod::Threshold => {
                self.reduce(Reduction::Thresh, d_target, &d_screen, 0, n)?
            }
            DistanceMethod::Sum => {
                self.reduce(Reduction::L2sq, d_target, &d_screen, 0, n)?;
                self.reduce(Reduction::Mult, d_target, &d_screen, 1, n)?;
            }
            DistanceMethod::Emd => {
                let cost = self.cost.clone().ok_or(MetricError::MissingCostMatrix)?;
                let masses = self.pooled_masses(&d_screen, &cost)?;
                let value = emd::earth_movers_distance(&cost, &self.target_masses, &masses);
                return Ok(RawScore::Single(value));
            }
        }
        self.stream
            .synchronize()
            .map_err(device_error("device synchronization failed"))?;
        let sums = self
            .stream
            .clone_dtoh(&self.scratch)
            .map_err(device_error("failed to copy scores back"))?;

        Ok(match self.method {
            DistanceMethod::Sum => RawScore::Sum {
                l2sq: sums[0],
                mult: sums[1],
            },
            _ => RawScore::Single(sums[0]),
        })
    }
}
