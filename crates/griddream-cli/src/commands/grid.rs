use crate::cli::GridArgs;
use crate::config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use griddream::core::io::targets::TargetSource;
use griddream::engine::progress::ProgressReporter;
use griddream::engine::reference::Reference;
use griddream::workflows;
use tracing::info;

pub async fn run(args: GridArgs) -> Result<()> {
    let mut layer = config::layer_from_args(&args.layer)?;
    let reference = Reference::parse(&args.reference);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Rasterizing {:?} (reference: {})", &args.input, reference);
    let gridded = tokio::task::block_in_place(|| {
        workflows::grid::run(&mut layer, &args.input, &reference, &reporter)
    })?;

    gridded
        .batch
        .write_to_path(&args.output)
        .map_err(|e| CliError::FileParsing {
            path: args.output.clone(),
            source: e.into(),
        })?;

    println!(
        "✓ {} grid(s) of {} values written to {}",
        gridded.titles.len(),
        gridded.batch.example_size(),
        args.output.display()
    );
    Ok(())
}
