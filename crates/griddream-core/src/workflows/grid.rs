use crate::core::grid::density::DensityGridder;
use crate::core::grid::gridder::Gridder;
use crate::core::grid::params::LayerParameter;
use crate::core::io::source::SdfMoleculeSource;
use crate::core::io::targets::TargetBatch;
use crate::core::io::traits::MoleculeSource;
use crate::core::models::model::Model;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::reference::Reference;
use crate::engine::screen::load_candidate;
use crate::engine::setup;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Molecules rasterized into one example each.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedTargets {
    pub titles: Vec<String>,
    pub batch: TargetBatch,
}

/// Rasterizes every molecule of `molecules` the way a screen grids its candidates.
///
/// The resulting batch can be written out and screened against directly: screening the
/// same file with the same reference reproduces each example exactly.
#[instrument(skip_all, name = "grid_workflow")]
pub fn run(
    layer: &mut LayerParameter,
    molecules: &Path,
    reference: &Reference,
    reporter: &ProgressReporter,
) -> Result<GriddedTargets, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Rasterizing",
    });
    let param = setup::configure_for_screening(layer)?;
    let mut gridder = DensityGridder::from_params(param)?;
    let layout = gridder.layout();
    info!(
        "Rasterizing '{}' into {}^3 grids (reference: {}).",
        molecules.display(),
        layout.points_per_side,
        reference
    );

    let resolved = reference.resolve()?;
    let mut source = SdfMoleculeSource::new();
    source.set_input_file(molecules)?;
    source.init_model(reference.receptor_file())?;

    let mut model = Model::new();
    let mut titles = Vec::new();
    let mut data = Vec::new();
    while source.read_molecule_into_model(&mut model)? {
        if model.num_movable_atoms() == 0 {
            warn!("Molecule '{}' has no typed atoms; its grid is empty.", model.title);
        }
        load_candidate(&mut gridder, &model, &resolved);
        data.extend_from_slice(gridder.forward()?);
        debug!(example = titles.len(), "Rasterized '{}'.", model.title);
        titles.push(model.title.clone());
    }

    let batch = TargetBatch::new(data, layout.example_size())?;
    reporter.report(Progress::Message(format!(
        "Rasterized {} molecule(s)",
        titles.len()
    )));
    reporter.report(Progress::PhaseFinish);
    Ok(GriddedTargets { titles, batch })
}
