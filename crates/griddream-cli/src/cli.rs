use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "GridDream Developers",
    version,
    about = "GridDream CLI - Score candidate ligand poses against optimized 3-D density grids for virtual screening.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used to grid candidates in parallel.
    /// Only effective in builds with the `parallel` feature.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every pose of a screening file against each target grid.
    Screen(ScreenArgs),
    /// Rasterize the molecules of an SD file into a target batch file.
    Grid(GridArgs),
    /// Convert the first molecule of an SD file into a gninatypes atom dump.
    Types(TypesArgs),
}

/// Grid layer overrides shared by commands that build a gridder.
#[derive(Args, Debug, Clone, Default)]
pub struct LayerArgs {
    /// Layer definition file (TOML with a `type` key), replacing the default grid layer.
    #[arg(long, value_name = "PATH")]
    pub layer: Option<PathBuf>,

    /// Override the voxel edge length in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub resolution: Option<f32>,

    /// Override the grid cube edge length in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub dimension: Option<f32>,
}

/// Arguments for the `screen` subcommand.
#[derive(Args, Debug)]
pub struct ScreenArgs {
    // --- Inputs ---
    /// Path to the screening configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Raw little-endian f32 batch of target grids.
    #[arg(short, long, value_name = "PATH")]
    pub targets: Option<PathBuf>,

    /// Multi-molecule SD file of candidate poses.
    #[arg(short, long = "screen", value_name = "PATH")]
    pub screen_file: Option<PathBuf>,

    /// Reference per target: `none`, a `.gninatypes` file, or a molecule file.
    #[arg(short, long = "reference", value_name = "REF", num_args(1..))]
    pub references: Vec<String>,

    /// Score file per target, in target order.
    #[arg(short, long = "output", value_name = "PATH", num_args(1..))]
    pub outputs: Vec<PathBuf>,

    /// Also write every score to one CSV table.
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,

    #[command(flatten)]
    pub layer: LayerArgs,

    // --- Metric Overrides ---
    /// Distance metric: l1, l2, mult, sum, threshold or emd.
    #[arg(short, long, value_name = "NAME")]
    pub method: Option<String>,

    /// Magnitude a positive target voxel must exceed to count for `threshold`.
    #[arg(long, value_name = "FLOAT")]
    pub positive_threshold: Option<f32>,

    /// Magnitude a negative target voxel must exceed to count for `threshold`.
    #[arg(long, value_name = "FLOAT")]
    pub negative_threshold: Option<f32>,

    /// Host normalization: `raw-root` or `match-device`.
    #[arg(long, value_name = "MODE")]
    pub host_root_mode: Option<String>,

    /// Edge length, in grid points, of the sub-cubes pooled for `emd`.
    #[arg(long, value_name = "INT")]
    pub subgrid_dim: Option<usize>,

    /// Run the metric kernels on this CUDA device.
    #[arg(short, long, value_name = "ORDINAL")]
    pub gpu: Option<usize>,

    /// Request the approximate screen instead of the exact one.
    #[arg(long)]
    pub approximate: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S screen.method=l1
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `grid` subcommand.
#[derive(Args, Debug)]
pub struct GridArgs {
    /// SD file of molecules to rasterize, one example each.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the raw f32 target batch.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Reference that positions every grid, as for `screen`.
    #[arg(short, long, value_name = "REF", default_value = "none")]
    pub reference: String,

    #[command(flatten)]
    pub layer: LayerArgs,
}

/// Arguments for the `types` subcommand.
#[derive(Args, Debug)]
pub struct TypesArgs {
    /// SD file whose first molecule is converted.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the gninatypes dump.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}
