use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum MetricError {
    #[error("Unknown distance method '{0}' (expected one of: l1, l2, mult, sum, threshold, emd)")]
    UnknownMethod(String),
    #[error("Target slice has {target} values but the screen slice has {screen}")]
    LengthMismatch { target: usize, screen: usize },
    #[error("Cannot normalize a score over zero voxels")]
    EmptyNormalization,
    #[error("The EMD method requires a precomputed cost matrix")]
    MissingCostMatrix,
}

/// How a candidate grid is compared against a target grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceMethod {
    L1,
    #[default]
    L2,
    Mult,
    Sum,
    Threshold,
    Emd,
}

impl DistanceMethod {
    pub const ALL: [DistanceMethod; 6] = [
        DistanceMethod::L1,
        DistanceMethod::L2,
        DistanceMethod::Mult,
        DistanceMethod::Sum,
        DistanceMethod::Threshold,
        DistanceMethod::Emd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DistanceMethod::L1 => "l1",
            DistanceMethod::L2 => "l2",
            DistanceMethod::Mult => "mult",
            DistanceMethod::Sum => "sum",
            DistanceMethod::Threshold => "threshold",
            DistanceMethod::Emd => "emd",
        }
    }
}

impl FromStr for DistanceMethod {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DistanceMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| MetricError::UnknownMethod(s.to_string()))
    }
}

impl fmt::Display for DistanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An un-normalized reduction over the ligand voxels of one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawScore {
    Single(f32),
    Sum { l2sq: f32, mult: f32 },
}

/// Which normalization the host backend applies.
///
/// `RawRoot` takes the square root of every raw reduction except `sum` before dividing,
/// which is how host scores have always been reported. `MatchDevice` applies the device
/// normalization so host and device scores are directly comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostRootMode {
    #[default]
    RawRoot,
    MatchDevice,
}

impl HostRootMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HostRootMode::RawRoot => "raw-root",
            HostRootMode::MatchDevice => "match-device",
        }
    }
}

impl FromStr for HostRootMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw-root" => Ok(HostRootMode::RawRoot),
            "match-device" => Ok(HostRootMode::MatchDevice),
            other => Err(format!(
                "unknown host root mode '{}' (expected raw-root or match-device)",
                other
            )),
        }
    }
}

/// Number of values a raw score is divided by: every ligand voxel, once per atom.
pub fn normalization_factor(natoms: usize, lig_grid_size: usize) -> Result<f32, MetricError> {
    let n = natoms * lig_grid_size;
    if n == 0 {
        return Err(MetricError::EmptyNormalization);
    }
    Ok(n as f32)
}

/// Normalization shared by the device backend and `HostRootMode::MatchDevice`.
pub fn finalize_device(method: DistanceMethod, raw: RawScore, norm: f32) -> f32 {
    match raw {
        RawScore::Sum { l2sq, mult } => (l2sq.sqrt() / 100.0 + mult) / norm,
        RawScore::Single(value) if method == DistanceMethod::L2 => value.sqrt() / norm,
        RawScore::Single(value) => value / norm,
    }
}

/// Normalization of `HostRootMode::RawRoot`.
///
/// The root is taken of the raw sum, so a negative `mult` reduction yields NaN.
pub fn finalize_host_legacy(raw: RawScore, norm: f32) -> f32 {
    match raw {
        RawScore::Sum { l2sq, mult } => (l2sq / 100.0 + mult) / norm,
        RawScore::Single(value) => value.sqrt() / norm,
    }
}

pub fn finalize(method: DistanceMethod, raw: RawScore, norm: f32, mode: HostRootMode) -> f32 {
    match mode {
        HostRootMode::RawRoot => finalize_host_legacy(raw, norm),
        HostRootMode::MatchDevice => finalize_device(method, raw, norm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_parse_exactly() {
        for method in DistanceMethod::ALL {
            assert_eq!(method.as_str().parse::<DistanceMethod>(), Ok(method));
        }
        assert_eq!(
            "L2".parse::<DistanceMethod>(),
            Err(MetricError::UnknownMethod("L2".into()))
        );
        assert!("cosine".parse::<DistanceMethod>().is_err());
    }

    #[test]
    fn default_method_is_l2() {
        assert_eq!(DistanceMethod::default(), DistanceMethod::L2);
        assert_eq!(HostRootMode::default(), HostRootMode::RawRoot);
    }

    #[test]
    fn legacy_host_roots_every_single_metric() {
        let raw = RawScore::Single(16.0);
        assert_eq!(finalize_host_legacy(raw, 2.0), 2.0);
        assert_eq!(finalize(DistanceMethod::Mult, raw, 2.0, HostRootMode::RawRoot), 2.0);
    }

    #[test]
    fn device_roots_only_l2() {
        let raw = RawScore::Single(16.0);
        assert_eq!(finalize_device(DistanceMethod::L2, raw, 2.0), 2.0);
        assert_eq!(finalize_device(DistanceMethod::L1, raw, 2.0), 8.0);
        assert_eq!(finalize_device(DistanceMethod::Emd, raw, 2.0), 8.0);
    }

    #[test]
    fn sum_normalization_differs_between_host_and_device() {
        let raw = RawScore::Sum {
            l2sq: 400.0,
            mult: 3.0,
        };
        assert_eq!(finalize_host_legacy(raw, 1.0), 7.0);
        assert!((finalize_device(DistanceMethod::Sum, raw, 1.0) - 3.2).abs() < 1e-6);
    }

    #[test]
    fn negative_mult_is_nan_under_the_legacy_root() {
        let score = finalize_host_legacy(RawScore::Single(-1.0), 1.0);
        assert!(score.is_nan());
    }

    #[test]
    fn zero_voxels_cannot_be_normalized() {
        assert_eq!(
            normalization_factor(0, 100),
            Err(MetricError::EmptyNormalization)
        );
        assert_eq!(normalization_factor(3, 100), Ok(300.0));
    }
}
