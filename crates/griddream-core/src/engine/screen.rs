use super::backend::MetricBackend;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::reference::{Reference, ReferenceAtoms};
#[cfg(feature = "parallel")]
use super::scratch::ScratchPool;
use crate::core::grid::gridder::Gridder;
use crate::core::grid::layout::GridLayout;
use crate::core::io::targets::TargetSource;
use crate::core::io::traits::MoleculeSource;
use crate::core::models::model::Model;
use nalgebra::Point3;
use tracing::{debug, info, trace};

/// Sentinel labels for screening examples; the network never reads them.
const SCREEN_LABELS: (f32, f32) = (1.0, 10.0);

/// Scores of every candidate against one target, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetScores {
    pub index: usize,
    pub titles: Vec<String>,
    pub scores: Vec<f32>,
}

/// Drives candidates through the gridder and a metric backend, one target at a time.
pub struct ScreenDriver<'a, G, S> {
    gridder: G,
    source: S,
    backend: Box<dyn MetricBackend>,
    targets: &'a dyn TargetSource,
    layout: GridLayout,
    #[cfg(feature = "parallel")]
    pool: ScratchPool<G>,
    reporter: &'a ProgressReporter<'a>,
}

impl<'a, G, S> ScreenDriver<'a, G, S>
where
    G: Gridder + Clone + Send + Sync,
    S: MoleculeSource,
{
    /// Pairs a gridder with the targets it will be compared against.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LayoutMismatch`] if the target examples do not have the
    /// size of the examples the gridder produces.
    pub fn new(
        gridder: G,
        source: S,
        backend: Box<dyn MetricBackend>,
        targets: &'a dyn TargetSource,
        reporter: &'a ProgressReporter<'a>,
    ) -> Result<Self, EngineError> {
        let layout = gridder.layout();
        if targets.example_size() != layout.example_size() {
            return Err(EngineError::LayoutMismatch {
                target_example_size: targets.example_size(),
                grid_example_size: layout.example_size(),
            });
        }
        Ok(Self {
            #[cfg(feature = "parallel")]
            pool: ScratchPool::new(gridder.clone()),
            gridder,
            source,
            backend,
            targets,
            layout,
            reporter,
        })
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The ligand block of target `index`; its receptor block is never compared.
    fn target_block(&self, index: usize) -> Result<&'a [f32], EngineError> {
        let available = self.targets.num_examples();
        if index >= available {
            return Err(EngineError::TargetCount {
                requested: index + 1,
                available,
            });
        }
        let targets: &'a dyn TargetSource = self.targets;
        let offset = self.layout.ligand_offset(index);
        Ok(&targets.top_data()[offset..offset + self.layout.lig_grid_size()])
    }

    /// Screens every candidate of the source against each reference's target in turn,
    /// handing each completed target to `on_target`.
    pub fn run<F>(&mut self, references: &[Reference], mut on_target: F) -> Result<(), EngineError>
    where
        F: FnMut(TargetScores) -> Result<(), EngineError>,
    {
        let available = self.targets.num_examples();
        if references.len() > available {
            return Err(EngineError::TargetCount {
                requested: references.len(),
                available,
            });
        }
        for (index, reference) in references.iter().enumerate() {
            self.reporter.report(Progress::TargetStart {
                index,
                total: references.len(),
            });
            let scores = self.screen_target(index, reference)?;
            self.reporter.report(Progress::TargetFinish {
                index,
                candidates: scores.scores.len(),
            });
            on_target(scores)?;
        }
        Ok(())
    }

    /// Scores every candidate against target `index`.
    pub fn screen_target(
        &mut self,
        index: usize,
        reference: &Reference,
    ) -> Result<TargetScores, EngineError> {
        let target = self.target_block(index)?;
        let resolved = reference.resolve()?;
        self.source.init_model(reference.receptor_file())?;
        self.backend.begin_target(target)?;
        info!(
            target_index = index,
            reference = %reference,
            backend = self.backend.name(),
            "Screening candidates with '{}'.",
            self.backend.method()
        );

        #[cfg(feature = "parallel")]
        {
            if self.backend.as_host().is_some() {
                return self.screen_target_parallel(index, target, &resolved);
            }
        }

        let rec = self.layout.rec_grid_size();
        let lig = self.layout.lig_grid_size();
        let mut model = Model::new();
        let mut titles = Vec::new();
        let mut scores = Vec::new();

        while self.source.read_molecule_into_model(&mut model)? {
            let candidate = scores.len();
            let natoms = model.num_movable_atoms();
            if natoms == 0 {
                return Err(EngineError::EmptyCandidate {
                    target: index,
                    candidate,
                });
            }

            load_candidate(&mut self.gridder, &model, &resolved);
            let grid = self.gridder.forward()?;
            let score = self.backend.score(target, &grid[rec..rec + lig], natoms)?;
            trace!(target_index = index, candidate, natoms, score, "Scored '{}'.", model.title);

            titles.push(model.title.clone());
            scores.push(score);
            self.reporter.report(Progress::CandidateScored);
        }

        debug!(target_index = index, candidates = scores.len(), "Target finished.");
        Ok(TargetScores {
            index,
            titles,
            scores,
        })
    }

    #[cfg(feature = "parallel")]
    fn screen_target_parallel(
        &mut self,
        index: usize,
        target: &[f32],
        resolved: &ReferenceAtoms,
    ) -> Result<TargetScores, EngineError> {
        use rayon::prelude::*;

        let mut models = Vec::new();
        loop {
            let mut model = Model::new();
            if !self.source.read_molecule_into_model(&mut model)? {
                break;
            }
            if model.num_movable_atoms() == 0 {
                return Err(EngineError::EmptyCandidate {
                    target: index,
                    candidate: models.len(),
                });
            }
            models.push(model);
        }

        let host = self
            .backend
            .as_host()
            .ok_or_else(|| EngineError::Internal("parallel screening needs the host backend".into()))?;
        let rec = self.layout.rec_grid_size();
        let lig = self.layout.lig_grid_size();
        let pool = &self.pool;
        let reporter = self.reporter;

        let scores = models
            .par_iter()
            .map_init(
                || pool.checkout(),
                |gridder, model| -> Result<f32, EngineError> {
                    load_candidate(&mut **gridder, model, resolved);
                    let grid = gridder.forward()?;
                    let score = host.evaluate(target, &grid[rec..rec + lig], model.num_movable_atoms())?;
                    reporter.report(Progress::CandidateScored);
                    Ok(score)
                },
            )
            .collect::<Result<Vec<f32>, EngineError>>()?;

        debug!(
            target_index = index,
            candidates = scores.len(),
            "Target finished on the parallel host path."
        );
        Ok(TargetScores {
            index,
            titles: models.into_iter().map(|m| m.title).collect(),
            scores,
        })
    }
}

/// Feeds one candidate, and the reference that positions it, to the gridder.
pub(crate) fn load_candidate<G: Gridder>(gridder: &mut G, model: &Model, reference: &ReferenceAtoms) {
    gridder.set_ligand(model.ligand_atoms());
    match reference {
        ReferenceAtoms::Origin => gridder.set_grid_center(Point3::origin()),
        ReferenceAtoms::Fixed(atoms) => gridder.set_receptor(atoms),
        ReferenceAtoms::FromModel => gridder.set_receptor(model.fixed_atoms()),
    }
    gridder.set_labels(SCREEN_LABELS.0, SCREEN_LABELS.1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::error::GridError;
    use crate::core::io::targets::TargetBatch;
    use crate::core::io::traits::MoleculeSourceError;
    use crate::core::metrics::host::Thresholds;
    use crate::core::metrics::method::{DistanceMethod, HostRootMode};
    use crate::core::models::atom::{Atom, AtomType};
    use crate::engine::backend::HostBackend;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    /// Records the calls it receives and writes the ligand atom count into every
    /// ligand voxel.
    #[derive(Clone)]
    struct RecordingGridder {
        layout: GridLayout,
        buffer: Vec<f32>,
        ligand_atoms: usize,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingGridder {
        fn new(points: usize, log: Arc<Mutex<Vec<String>>>) -> Self {
            let layout = GridLayout::new(points, 1, 1);
            Self {
                layout,
                buffer: vec![0.0; layout.example_size()],
                ligand_atoms: 0,
                log,
            }
        }

        fn record(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    impl Gridder for RecordingGridder {
        fn layout(&self) -> GridLayout {
            self.layout
        }
        fn dimension(&self) -> f32 {
            (self.layout.points_per_side - 1) as f32 * 0.5
        }
        fn resolution(&self) -> f32 {
            0.5
        }
        fn set_ligand(&mut self, atoms: &[Atom]) {
            self.ligand_atoms = atoms.len();
        }
        fn set_receptor(&mut self, atoms: &[Atom]) {
            self.record(format!("receptor:{}", atoms.len()));
        }
        fn set_grid_center(&mut self, center: Point3<f32>) {
            self.record(format!("center:{},{},{}", center.x, center.y, center.z));
        }
        fn set_labels(&mut self, affinity: f32, label: f32) {
            self.record(format!("labels:{},{}", affinity, label));
        }
        fn forward(&mut self) -> Result<&[f32], GridError> {
            let rec = self.layout.rec_grid_size();
            self.buffer[..rec].fill(-100.0);
            self.buffer[rec..].fill(self.ligand_atoms as f32);
            Ok(&self.buffer)
        }
    }

    /// Serves a fixed list of candidates, each a set of carbon atoms, optionally behind
    /// a block of flexible sulfur atoms.
    struct ListSource {
        candidates: Vec<(String, usize)>,
        flexible_atoms: usize,
        receptor_atoms: usize,
        cursor: usize,
        inits: Vec<Option<PathBuf>>,
    }

    impl ListSource {
        fn new(sizes: &[usize]) -> Self {
            Self {
                candidates: sizes
                    .iter()
                    .enumerate()
                    .map(|(i, &n)| (format!("cand-{}", i), n))
                    .collect(),
                flexible_atoms: 0,
                receptor_atoms: 0,
                cursor: 0,
                inits: Vec::new(),
            }
        }

        fn with_flexible(mut self, flexible_atoms: usize) -> Self {
            self.flexible_atoms = flexible_atoms;
            self
        }
    }

    fn carbons(n: usize) -> Vec<Atom> {
        (0..n)
            .map(|i| Atom::new(Point3::new(i as f32, 0.0, 0.0), AtomType::AliphaticCarbonXSHydrophobe))
            .collect()
    }

    impl MoleculeSource for ListSource {
        fn set_input_file(&mut self, _path: &Path) -> Result<(), MoleculeSourceError> {
            Ok(())
        }
        fn init_model(&mut self, receptor: Option<&Path>) -> Result<(), MoleculeSourceError> {
            self.cursor = 0;
            self.receptor_atoms = if receptor.is_some() { 3 } else { 0 };
            self.inits.push(receptor.map(Path::to_path_buf));
            Ok(())
        }
        fn read_molecule_into_model(
            &mut self,
            model: &mut Model,
        ) -> Result<bool, MoleculeSourceError> {
            let Some((title, n)) = self.candidates.get(self.cursor).cloned() else {
                return Ok(false);
            };
            self.cursor += 1;
            if self.flexible_atoms == 0 {
                model.set_ligand(&title, carbons(n));
            } else {
                let flexible = (0..self.flexible_atoms)
                    .map(|i| Atom::new(Point3::new(0.0, i as f32, 0.0), AtomType::Sulfur))
                    .collect();
                model.set_movable(&title, flexible, carbons(n));
            }
            model.set_fixed_atoms(carbons(self.receptor_atoms));
            Ok(true)
        }
    }

    fn host(method: DistanceMethod) -> Box<dyn MetricBackend> {
        Box::new(HostBackend::new(
            method,
            Thresholds::default(),
            HostRootMode::MatchDevice,
            None,
        ))
    }

    /// Two targets of a 2-point grid: receptor block then ligand block, 8 voxels each.
    fn targets(ligand_values: [f32; 2]) -> TargetBatch {
        let mut data = Vec::new();
        for value in ligand_values {
            data.extend(std::iter::repeat_n(99.0, 8));
            data.extend(std::iter::repeat_n(value, 8));
        }
        TargetBatch::new(data, 16).unwrap()
    }

    #[test]
    fn no_reference_centres_every_candidate_at_the_origin() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let batch = targets([0.0, 0.0]);
        let reporter = ProgressReporter::new();
        let mut driver = ScreenDriver::new(
            RecordingGridder::new(2, log.clone()),
            ListSource::new(&[1, 2, 3]),
            host(DistanceMethod::L1),
            &batch,
            &reporter,
        )
        .unwrap();

        let result = driver.screen_target(0, &Reference::None).unwrap();
        assert_eq!(result.scores.len(), 3);
        assert_eq!(result.titles, vec!["cand-0", "cand-1", "cand-2"]);

        let log = log.lock().unwrap();
        let centres = log.iter().filter(|e| e.as_str() == "center:0,0,0").count();
        let labels = log.iter().filter(|e| e.as_str() == "labels:1,10").count();
        assert_eq!(centres, 3);
        assert_eq!(labels, 3);
        assert!(!log.iter().any(|e| e.starts_with("receptor")));
    }

    #[test]
    fn scores_compare_only_ligand_blocks_and_follow_candidate_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let batch = targets([1.0, 2.0]);
        let reporter = ProgressReporter::new();
        let mut driver = ScreenDriver::new(
            RecordingGridder::new(2, log),
            ListSource::new(&[1, 2]),
            host(DistanceMethod::L1),
            &batch,
            &reporter,
        )
        .unwrap();

        // Candidate k has k+1 atoms and fills its ligand block with that count;
        // the l1 sum over 8 voxels is divided by natoms * 8.
        let first = driver.screen_target(0, &Reference::None).unwrap();
        assert_eq!(first.scores, vec![0.0, 0.5]);
        let second = driver.screen_target(1, &Reference::None).unwrap();
        assert_eq!(second.scores, vec![1.0, 0.0]);
    }

    #[test]
    fn flexible_atoms_count_towards_normalization_but_are_not_gridded() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let batch = targets([3.0, 0.0]);
        let reporter = ProgressReporter::new();
        let mut driver = ScreenDriver::new(
            RecordingGridder::new(2, log),
            ListSource::new(&[1]).with_flexible(1),
            host(DistanceMethod::L1),
            &batch,
            &reporter,
        )
        .unwrap();

        // One ligand atom fills the block with 1.0: l1 is 8 * |3 - 1| = 16, divided by
        // two movable atoms times 8 voxels.
        let result = driver.screen_target(0, &Reference::None).unwrap();
        assert_eq!(result.scores, vec![1.0]);
    }

    #[test]
    fn molecule_references_use_the_model_fixed_atoms() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let batch = targets([0.0, 0.0]);
        let reporter = ProgressReporter::new();
        let mut driver = ScreenDriver::new(
            RecordingGridder::new(2, log.clone()),
            ListSource::new(&[1, 1]),
            host(DistanceMethod::L2),
            &batch,
            &reporter,
        )
        .unwrap();

        let reference = Reference::Molecule(PathBuf::from("ref-1.sdf"));
        driver.screen_target(1, &reference).unwrap();
        assert_eq!(
            driver.source().inits,
            vec![Some(PathBuf::from("ref-1.sdf"))]
        );
        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|e| e.as_str() == "receptor:3").count(), 2);
        assert!(!log.iter().any(|e| e.starts_with("center")));
    }

    #[test]
    fn empty_candidates_abort_the_target() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let batch = targets([0.0, 0.0]);
        let reporter = ProgressReporter::new();
        let mut driver = ScreenDriver::new(
            RecordingGridder::new(2, log),
            ListSource::new(&[2, 0, 1]),
            host(DistanceMethod::L1),
            &batch,
            &reporter,
        )
        .unwrap();

        match driver.screen_target(0, &Reference::None) {
            Err(EngineError::EmptyCandidate { target, candidate }) => {
                assert_eq!((target, candidate), (0, 1));
            }
            other => panic!("expected EmptyCandidate, got {:?}", other),
        }
    }

    #[test]
    fn mismatched_layouts_are_rejected_up_front() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let batch = TargetBatch::new(vec![0.0; 32], 32).unwrap();
        let reporter = ProgressReporter::new();
        let result = ScreenDriver::new(
            RecordingGridder::new(2, log),
            ListSource::new(&[1]),
            host(DistanceMethod::L1),
            &batch,
            &reporter,
        );
        assert!(matches!(
            result,
            Err(EngineError::LayoutMismatch {
                target_example_size: 32,
                grid_example_size: 16
            })
        ));
    }

    #[test]
    fn run_rejects_more_references_than_targets() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let batch = targets([0.0, 0.0]);
        let reporter = ProgressReporter::new();
        let mut driver = ScreenDriver::new(
            RecordingGridder::new(2, log),
            ListSource::new(&[1]),
            host(DistanceMethod::L1),
            &batch,
            &reporter,
        )
        .unwrap();

        let references = vec![Reference::None; 3];
        let result = driver.run(&references, |_| Ok(()));
        assert!(matches!(
            result,
            Err(EngineError::TargetCount {
                requested: 3,
                available: 2
            })
        ));
    }

    #[test]
    fn run_hands_over_each_target_when_it_completes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let batch = targets([0.0, 0.0]);
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::TargetFinish { index, candidates } = event {
                events.lock().unwrap().push((index, candidates));
            }
        }));
        let mut driver = ScreenDriver::new(
            RecordingGridder::new(2, log),
            ListSource::new(&[1, 1]),
            host(DistanceMethod::Mult),
            &batch,
            &reporter,
        )
        .unwrap();

        let mut seen = Vec::new();
        driver
            .run(&[Reference::None, Reference::None], |scores| {
                seen.push(scores.index);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![0, 1]);
        drop(driver);
        drop(reporter);
        assert_eq!(events.into_inner().unwrap(), vec![(0, 2), (1, 2)]);
    }
}
