use crate::core::grid::density::DensityGridder;
use crate::core::grid::gridder::Gridder;
use crate::core::grid::params::LayerParameter;
use crate::core::io::scores::{self, ScoreWriteError, SummaryRow};
use crate::core::io::source::SdfMoleculeSource;
use crate::core::io::targets::TargetSource;
use crate::core::io::traits::MoleculeSource;
use crate::engine::backend;
use crate::engine::config::ScreenConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::reference::Reference;
use crate::engine::screen::{ScreenDriver, TargetScores};
use crate::engine::setup;
use itertools::Itertools;
use tracing::{info, instrument, warn};

/// Scores every pose of the screening file against each target grid.
///
/// The layer is switched into screening mode first. Each target's score file is
/// written as soon as all of its candidates have been scored, so a failure part way
/// through leaves only complete files behind.
///
/// # Errors
///
/// Fails on the first error of any kind; see [`EngineError`].
#[instrument(skip_all, name = "screen_workflow")]
pub fn run_exact(
    layer: &mut LayerParameter,
    targets: &dyn TargetSource,
    config: &ScreenConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<TargetScores>, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let param = setup::configure_for_screening(layer)?;
    let gridder = DensityGridder::from_params(param)?;
    let layout = gridder.layout();
    info!(
        points_per_side = layout.points_per_side,
        ligand_types = layout.num_ligand_types,
        "Screening '{}' against {} target(s) with the '{}' metric.",
        config.screen_file.display(),
        config.num_targets(),
        config.metric.method
    );

    let references: Vec<Reference> = config
        .references
        .iter()
        .map(|entry| Reference::parse(entry))
        .collect();

    let mut source = SdfMoleculeSource::new();
    source.set_input_file(&config.screen_file)?;
    let backend = backend::create_backend(
        config.device,
        &config.metric,
        &layout,
        gridder.resolution(),
    )?;
    let mut driver = ScreenDriver::new(gridder, source, backend, targets, reporter)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Screening ===
    reporter.report(Progress::PhaseStart { name: "Screening" });
    let mut results = Vec::with_capacity(references.len());
    driver.run(&references, |target| {
        let path = config.outputs.get(target.index).ok_or_else(|| {
            EngineError::Internal(format!("no output file for target {}", target.index))
        })?;
        scores::write_scores_to_path(&target.scores, path).map_err(|e| {
            EngineError::Output {
                path: path.clone(),
                source: ScoreWriteError::Io(e),
            }
        })?;
        info!(
            "Wrote {} score(s) for target {} to '{}'.",
            target.scores.len(),
            target.index,
            path.display()
        );
        results.push(target);
        Ok(())
    })?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Summary ===
    if let Some(path) = &config.summary_path {
        reporter.report(Progress::PhaseStart { name: "Summary" });
        let rows = summary_rows(&results);
        scores::write_summary_to_path(&rows, path).map_err(|source| EngineError::Output {
            path: path.clone(),
            source,
        })?;
        info!("Wrote {} summary row(s) to '{}'.", rows.len(), path.display());
        reporter.report(Progress::PhaseFinish);
    }

    Ok(results)
}

/// The approximate (variational) screen. Not available.
#[instrument(skip_all, name = "approximate_screen_workflow")]
pub fn run_approximate(
    _layer: &mut LayerParameter,
    _targets: &dyn TargetSource,
    _config: &ScreenConfig,
    _reporter: &ProgressReporter,
) -> Result<Vec<TargetScores>, EngineError> {
    warn!("Approximate virtual screening was requested.");
    Err(EngineError::Unimplemented(
        "approximate virtual screening; use the exact screen instead",
    ))
}

fn summary_rows(results: &[TargetScores]) -> Vec<SummaryRow> {
    results
        .iter()
        .flat_map(|target| {
            target
                .titles
                .iter()
                .zip_eq(&target.scores)
                .enumerate()
                .map(move |(candidate, (title, &score))| SummaryRow {
                    target: target.index,
                    candidate,
                    title: title.clone(),
                    score,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::targets::TargetBatch;
    use crate::core::metrics::method::DistanceMethod;
    use crate::engine::config::ScreenConfigBuilder;
    use std::path::PathBuf;

    fn config(outputs: Vec<PathBuf>) -> ScreenConfig {
        ScreenConfigBuilder::new()
            .method(DistanceMethod::L2)
            .screen_file(PathBuf::from("missing.sdf"))
            .references(outputs.iter().map(|_| "none".to_string()).collect())
            .outputs(outputs)
            .build()
            .unwrap()
    }

    #[test]
    fn approximate_screen_is_never_run() {
        let mut layer = LayerParameter::default();
        let targets = TargetBatch::new(vec![0.0; 4], 4).unwrap();
        let result = run_approximate(
            &mut layer,
            &targets,
            &config(vec![PathBuf::from("a.out")]),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Unimplemented(_))));
    }

    #[test]
    fn non_grid_layers_are_rejected_before_reading_anything() {
        let mut layer = LayerParameter::Other {
            kind: "InnerProduct".into(),
        };
        let targets = TargetBatch::new(vec![0.0; 4], 4).unwrap();
        let result = run_exact(
            &mut layer,
            &targets,
            &config(vec![PathBuf::from("a.out")]),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::WrongLayerKind { .. })));
    }

    #[test]
    fn summary_rows_follow_target_then_candidate_order() {
        let results = vec![
            TargetScores {
                index: 0,
                titles: vec!["a".into(), "b".into()],
                scores: vec![0.5, 0.25],
            },
            TargetScores {
                index: 1,
                titles: vec!["a".into()],
                scores: vec![1.0],
            },
        ];
        let rows = summary_rows(&results);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].title, "b");
        assert_eq!(rows[1].candidate, 1);
        assert_eq!(rows[2].target, 1);
        assert_eq!(rows[2].score, 1.0);
    }
}
