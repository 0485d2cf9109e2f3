use crate::cli::{LayerArgs, ScreenArgs};
use crate::error::{CliError, Result};
use griddream::core::grid::params::LayerParameter;
use griddream::core::grid::typemap::TypeMapKind;
use griddream::core::metrics::method::{DistanceMethod, HostRootMode};
use griddream::engine::config::{self as core_config, ScreenConfigBuilder};
use griddream::engine::error::EngineError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialLayerConfig {
    definition: Option<PathBuf>,
    resolution: Option<f32>,
    dimension: Option<f32>,
    radius_multiplier: Option<f32>,
    ligand_map: Option<String>,
    receptor_map: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialScreenSection {
    targets: Option<PathBuf>,
    screen_file: Option<PathBuf>,
    references: Option<Vec<String>>,
    outputs: Option<Vec<PathBuf>>,
    summary: Option<PathBuf>,
    method: Option<String>,
    positive_threshold: Option<f32>,
    negative_threshold: Option<f32>,
    host_root_mode: Option<String>,
    compute_cost: Option<bool>,
    subgrid_dim: Option<usize>,
    gpu: Option<usize>,
}

/// The screening configuration file, every key optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialScreenConfig {
    layer: Option<PartialLayerConfig>,
    screen: Option<PartialScreenSection>,
}

/// Everything a screen needs once file and command-line settings are merged.
#[derive(Debug)]
pub struct ScreenPlan {
    pub layer: LayerParameter,
    pub targets: PathBuf,
    pub config: core_config::ScreenConfig,
}

impl PartialScreenConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(mut self, args: &ScreenArgs) -> Result<ScreenPlan> {
        self.apply_set_values(&args.set_values)?;

        let layer_config = self.layer.take().unwrap_or_default();
        let screen = self.screen.take().unwrap_or_default();

        let layer = build_layer(&args.layer, layer_config)?;

        let method_name = args
            .method
            .as_deref()
            .or(screen.method.as_deref())
            .unwrap_or("l2");
        let method = DistanceMethod::from_str(method_name).map_err(EngineError::from)?;

        let mut builder = ScreenConfigBuilder::new().method(method);

        let defaults = core_config::MetricConfig::default();
        builder = builder.thresholds(
            args.positive_threshold
                .or(screen.positive_threshold)
                .unwrap_or(defaults.thresholds.positive),
            args.negative_threshold
                .or(screen.negative_threshold)
                .unwrap_or(defaults.thresholds.negative),
        );

        if let Some(mode) = args.host_root_mode.as_ref().or(screen.host_root_mode.as_ref()) {
            let mode = HostRootMode::from_str(mode).map_err(CliError::Config)?;
            builder = builder.host_root_mode(mode);
        }
        if let Some(compute) = screen.compute_cost {
            builder = builder.compute_cost(compute);
        }
        if let Some(dim) = args.subgrid_dim.or(screen.subgrid_dim) {
            builder = builder.subgrid_dim(dim);
        }
        if let Some(ordinal) = args.gpu.or(screen.gpu) {
            builder = builder.device(core_config::Device::Cuda { ordinal });
        }

        let screen_file = args
            .screen_file
            .clone()
            .or(screen.screen_file)
            .ok_or_else(|| required("screen.screen-file", "--screen"))?;
        let targets = args
            .targets
            .clone()
            .or(screen.targets)
            .ok_or_else(|| required("screen.targets", "--targets"))?;
        let references = pick_list(&args.references, screen.references)
            .ok_or_else(|| required("screen.references", "--reference"))?;
        let outputs = pick_list(&args.outputs, screen.outputs)
            .ok_or_else(|| required("screen.outputs", "--output"))?;

        let config = builder
            .screen_file(screen_file)
            .references(references)
            .outputs(outputs)
            .summary_path(args.summary.clone().or(screen.summary))
            .build()
            .map_err(EngineError::from)?;

        Ok(ScreenPlan {
            layer,
            targets,
            config,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key {
                "layer.resolution" => {
                    self.layer.get_or_insert_with(Default::default).resolution =
                        Some(parse_value(key, value_str)?);
                }
                "layer.dimension" => {
                    self.layer.get_or_insert_with(Default::default).dimension =
                        Some(parse_value(key, value_str)?);
                }
                "layer.radius-multiplier" => {
                    self.layer.get_or_insert_with(Default::default).radius_multiplier =
                        Some(parse_value(key, value_str)?);
                }
                "layer.ligand-map" => {
                    self.layer.get_or_insert_with(Default::default).ligand_map = Some(value_str.to_string());
                }
                "layer.receptor-map" => {
                    self.layer.get_or_insert_with(Default::default).receptor_map =
                        Some(value_str.to_string());
                }
                "screen.method" => {
                    self.screen.get_or_insert_with(Default::default).method = Some(value_str.to_string());
                }
                "screen.positive-threshold" => {
                    self.screen.get_or_insert_with(Default::default).positive_threshold =
                        Some(parse_value(key, value_str)?);
                }
                "screen.negative-threshold" => {
                    self.screen.get_or_insert_with(Default::default).negative_threshold =
                        Some(parse_value(key, value_str)?);
                }
                "screen.host-root-mode" => {
                    self.screen.get_or_insert_with(Default::default).host_root_mode =
                        Some(value_str.to_string());
                }
                "screen.compute-cost" => {
                    self.screen.get_or_insert_with(Default::default).compute_cost =
                        Some(parse_value(key, value_str)?);
                }
                "screen.subgrid-dim" => {
                    self.screen.get_or_insert_with(Default::default).subgrid_dim =
                        Some(parse_value(key, value_str)?);
                }
                "screen.gpu" => {
                    self.screen.get_or_insert_with(Default::default).gpu = Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builds the grid layer for commands that take no configuration file.
pub fn layer_from_args(args: &LayerArgs) -> Result<LayerParameter> {
    build_layer(args, PartialLayerConfig::default())
}

fn build_layer(args: &LayerArgs, file: PartialLayerConfig) -> Result<LayerParameter> {
    let definition = args.layer.as_ref().or(file.definition.as_ref());
    let mut layer = match definition {
        Some(path) => LayerParameter::load(path).map_err(|e| CliError::FileParsing {
            path: path.clone(),
            source: e.into(),
        })?,
        None => LayerParameter::default(),
    };

    if let Some(param) = layer.mol_grid_mut() {
        if let Some(resolution) = args.resolution.or(file.resolution) {
            param.resolution = resolution;
        }
        if let Some(dimension) = args.dimension.or(file.dimension) {
            param.dimension = dimension;
        }
        if let Some(multiplier) = file.radius_multiplier {
            param.radius_multiplier = multiplier;
        }
        if let Some(name) = &file.ligand_map {
            param.ligand_map = parse_type_map(name)?;
        }
        if let Some(name) = &file.receptor_map {
            param.receptor_map = parse_type_map(name)?;
        }
    }
    Ok(layer)
}

fn parse_type_map(name: &str) -> Result<TypeMapKind> {
    TypeMapKind::from_str(name).map_err(|e| CliError::Config(e.to_string()))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn pick_list<T: Clone>(cli: &[T], file: Option<Vec<T>>) -> Option<Vec<T>> {
    if cli.is_empty() {
        file
    } else {
        Some(cli.to_vec())
    }
}

fn required(file_key: &str, flag: &str) -> CliError {
    CliError::Config(format!(
        "A value for '{}' is required either in the config file or via {}.",
        file_key, flag
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use griddream::core::metrics::method::MetricError;
    use std::fs;
    use tempfile::tempdir;

    fn screen_args(extra: &[&str]) -> ScreenArgs {
        let mut argv = vec!["griddream", "screen"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Screen(args) => args,
            other => panic!("expected the screen command, got {:?}", other),
        }
    }

    #[test]
    fn file_settings_fill_in_what_the_command_line_leaves_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("screen.toml");
        fs::write(
            &path,
            r#"
            [layer]
            resolution = 0.375
            ligand-map = "element"

            [screen]
            targets = "top.bin"
            screen-file = "poses.sdf"
            references = ["none", "pocket.gninatypes"]
            outputs = ["a.txt", "b.txt"]
            method = "threshold"
            positive-threshold = 0.05
            "#,
        )
        .unwrap();

        let args = screen_args(&["--negative-threshold", "0.2", "--dimension", "12.0"]);
        let plan = PartialScreenConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        let param = plan.layer.mol_grid().unwrap();
        assert_eq!(param.resolution, 0.375);
        assert_eq!(param.dimension, 12.0);
        assert_eq!(param.ligand_map, TypeMapKind::Element);
        assert_eq!(plan.targets, PathBuf::from("top.bin"));
        assert_eq!(plan.config.metric.method, DistanceMethod::Threshold);
        assert_eq!(plan.config.metric.thresholds.positive, 0.05);
        assert_eq!(plan.config.metric.thresholds.negative, 0.2);
        assert_eq!(plan.config.references.len(), 2);
        assert_eq!(plan.config.device, core_config::Device::Host);
    }

    #[test]
    fn command_line_lists_replace_file_lists() {
        let args = screen_args(&[
            "-t", "top.bin", "-s", "poses.sdf", "-r", "none", "-o", "only.txt", "-m", "l1",
        ]);
        let plan = PartialScreenConfig::default().merge_with_cli(&args).unwrap();
        assert_eq!(plan.config.references, vec!["none".to_string()]);
        assert_eq!(plan.config.outputs, vec![PathBuf::from("only.txt")]);
        assert_eq!(plan.config.metric.method, DistanceMethod::L1);
    }

    #[test]
    fn set_values_override_the_file() {
        let args = screen_args(&[
            "-t",
            "top.bin",
            "-s",
            "poses.sdf",
            "-r",
            "none",
            "-o",
            "a.txt",
            "-S",
            "screen.method=sum",
            "-S",
            "layer.dimension=8",
            "-S",
            "screen.host-root-mode=match-device",
        ]);
        let plan = PartialScreenConfig::default().merge_with_cli(&args).unwrap();
        assert_eq!(plan.config.metric.method, DistanceMethod::Sum);
        assert_eq!(plan.config.metric.host_root_mode, HostRootMode::MatchDevice);
        assert_eq!(plan.layer.mol_grid().unwrap().dimension, 8.0);
    }

    #[test]
    fn unknown_methods_are_rejected_before_anything_runs() {
        let args = screen_args(&["-m", "cosine"]);
        let result = PartialScreenConfig::default().merge_with_cli(&args);
        assert!(matches!(
            result,
            Err(CliError::Core(EngineError::Metric(MetricError::UnknownMethod(name)))) if name == "cosine"
        ));
    }

    #[test]
    fn mismatched_reference_and_output_counts_fail() {
        let args = screen_args(&[
            "-t", "top.bin", "-s", "poses.sdf", "-r", "none", "none", "-o", "a.txt",
        ]);
        let result = PartialScreenConfig::default().merge_with_cli(&args);
        assert!(matches!(result, Err(CliError::Core(EngineError::Config(_)))));
    }

    #[test]
    fn missing_inputs_and_bad_keys_are_config_errors() {
        let args = screen_args(&["-s", "poses.sdf"]);
        assert!(matches!(
            PartialScreenConfig::default().merge_with_cli(&args),
            Err(CliError::Config(_))
        ));

        let args = screen_args(&["-S", "screen.colour=blue"]);
        assert!(matches!(
            PartialScreenConfig::default().merge_with_cli(&args),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[screen]\nmetric = \"l2\"\n").unwrap();
        assert!(matches!(
            PartialScreenConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
