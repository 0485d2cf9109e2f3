use crate::cli::TypesArgs;
use crate::error::{CliError, Result};
use griddream::core::io::gninatypes;
use griddream::core::io::source;
use griddream::engine::error::EngineError;
use tracing::info;

pub async fn run(args: TypesArgs) -> Result<()> {
    let (title, atoms) = source::read_first_molecule(&args.input).map_err(EngineError::from)?;
    info!("Read '{}' with {} typed atom(s).", title, atoms.len());

    gninatypes::write_to_path(&atoms, &args.output).map_err(|e| CliError::FileParsing {
        path: args.output.clone(),
        source: e.into(),
    })?;

    println!(
        "✓ {} atom(s) of '{}' written to {}",
        atoms.len(),
        title,
        args.output.display()
    );
    Ok(())
}
