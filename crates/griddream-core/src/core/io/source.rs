use super::sdf::{SdfReader, SdfRecord};
use super::traits::{MoleculeSource, MoleculeSourceError};
use crate::core::models::atom::Atom;
use crate::core::models::model::Model;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads candidates one at a time from a multi-molecule SD file.
#[derive(Default)]
pub struct SdfMoleculeSource {
    input: Option<PathBuf>,
    reader: Option<SdfReader<BufReader<File>>>,
    receptor_atoms: Vec<Atom>,
    molecules_read: usize,
}

impl SdfMoleculeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn molecules_read(&self) -> usize {
        self.molecules_read
    }

    fn open(path: &Path) -> Result<SdfReader<BufReader<File>>, MoleculeSourceError> {
        let file = File::open(path).map_err(|source| MoleculeSourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(SdfReader::new(BufReader::new(file)))
    }
}

/// Loads the first molecule of an SD file as typed atoms.
pub fn read_first_molecule(path: &Path) -> Result<(String, Vec<Atom>), MoleculeSourceError> {
    let mut reader = SdfMoleculeSource::open(path)?;
    let record: SdfRecord = reader
        .read_record()
        .map_err(|source| MoleculeSourceError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| MoleculeSourceError::EmptyReceptor {
            path: path.to_path_buf(),
        })?;
    Ok((record.title.clone(), record.typed_atoms()))
}

impl MoleculeSource for SdfMoleculeSource {
    fn set_input_file(&mut self, path: &Path) -> Result<(), MoleculeSourceError> {
        self.input = Some(path.to_path_buf());
        self.reader = None;
        Ok(())
    }

    fn init_model(&mut self, receptor: Option<&Path>) -> Result<(), MoleculeSourceError> {
        let input = self.input.as_ref().ok_or(MoleculeSourceError::NoInputFile)?;
        self.reader = Some(Self::open(input)?);
        self.molecules_read = 0;

        self.receptor_atoms = match receptor {
            Some(path) => {
                let (title, atoms) = read_first_molecule(path)?;
                debug!(
                    "Loaded receptor '{}' ({} atoms) from {:?}",
                    title,
                    atoms.len(),
                    path
                );
                atoms
            }
            None => Vec::new(),
        };
        Ok(())
    }

    fn read_molecule_into_model(
        &mut self,
        model: &mut Model,
    ) -> Result<bool, MoleculeSourceError> {
        let input = self.input.clone().ok_or(MoleculeSourceError::NoInputFile)?;
        let reader = self.reader.as_mut().ok_or(MoleculeSourceError::NoInputFile)?;

        let record = reader
            .read_record()
            .map_err(|source| MoleculeSourceError::Read {
                path: input,
                source,
            })?;

        match record {
            Some(record) => {
                model.set_ligand(&record.title, record.typed_atoms());
                model.set_fixed_atoms(self.receptor_atoms.clone());
                self.molecules_read += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
