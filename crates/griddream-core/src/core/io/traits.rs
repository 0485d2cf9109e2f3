use super::sdf::SdfError;
use crate::core::models::model::Model;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoleculeSourceError {
    #[error("No input file has been set on the molecule source")]
    NoInputFile,
    #[error("Failed to open '{path}': {source}", path = path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read '{path}': {source}", path = path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: SdfError,
    },
    #[error("Receptor file '{path}' contains no molecule", path = path.display())]
    EmptyReceptor { path: PathBuf },
}

/// A streaming cursor over candidate molecules.
///
/// The cursor is stateful: `init_model` rewinds it to the start of the input file and
/// fixes the receptor atoms every subsequent model will carry, and each call to
/// `read_molecule_into_model` overwrites the model with the next candidate.
///
/// A source that carries flexible atoms alongside the candidate fills the model with
/// [`Model::set_movable`], flexible atoms first. Only the ligand part is rasterized,
/// while score normalization counts every movable atom. The bundled SD and gninatypes
/// sources have no flexible atoms and use [`Model::set_ligand`].
pub trait MoleculeSource {
    /// Sets the file candidates are read from. Takes effect at the next `init_model`.
    fn set_input_file(&mut self, path: &Path) -> Result<(), MoleculeSourceError>;

    /// Rewinds the cursor and loads the optional receptor into every future model.
    ///
    /// # Errors
    ///
    /// Returns an error if no input file is set, or the input or receptor cannot be read.
    fn init_model(&mut self, receptor: Option<&Path>) -> Result<(), MoleculeSourceError>;

    /// Reads the next candidate into `model`.
    ///
    /// # Return
    ///
    /// Returns `Ok(false)` once the input is exhausted; the model is left untouched.
    fn read_molecule_into_model(&mut self, model: &mut Model)
    -> Result<bool, MoleculeSourceError>;
}
