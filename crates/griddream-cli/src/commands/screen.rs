use crate::cli::ScreenArgs;
use crate::config::{PartialScreenConfig, ScreenPlan};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use griddream::core::io::targets::TargetBatch;
use griddream::engine::error::EngineError;
use griddream::engine::progress::ProgressReporter;
use griddream::workflows;
use tracing::info;

pub async fn run(args: ScreenArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialScreenConfig::from_file(path)?,
        None => PartialScreenConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let ScreenPlan {
        mut layer,
        targets,
        config,
    } = partial_config.merge_with_cli(&args)?;

    let param = layer.mol_grid().ok_or_else(|| EngineError::WrongLayerKind {
        kind: layer.kind().to_string(),
    })?;
    let example_size = param.layout().map_err(EngineError::from)?.example_size();

    info!("Loading target grids from {:?}", &targets);
    let batch =
        TargetBatch::read_from_path(&targets, example_size).map_err(|e| CliError::FileParsing {
            path: targets.clone(),
            source: e.into(),
        })?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Screening {} against {} target(s) with '{}'...",
        config.screen_file.display(),
        config.num_targets(),
        config.metric.method
    );

    let results = if args.approximate {
        tokio::task::block_in_place(|| {
            workflows::screen::run_approximate(&mut layer, &batch, &config, &reporter)
        })?
    } else {
        tokio::task::block_in_place(|| {
            workflows::screen::run_exact(&mut layer, &batch, &config, &reporter)
        })?
    };

    for (target, path) in results.iter().zip(&config.outputs) {
        println!(
            "✓ Target {}: {} score(s) written to {}",
            target.index + 1,
            target.scores.len(),
            path.display()
        );
    }
    if let Some(path) = &config.summary_path {
        println!("  Summary table written to {}", path.display());
    }
    Ok(())
}
