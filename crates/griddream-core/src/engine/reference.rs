use super::error::EngineError;
use crate::core::io::gninatypes;
use crate::core::models::atom::Atom;
use std::fmt;
use std::path::{Path, PathBuf};

/// Literal entry meaning "no reference": the grid stays centred at the origin.
pub const NO_REFERENCE: &str = "none";

/// What positions the grid while candidates are screened against one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    None,
    /// A binary atom dump whose centroid centres the grid.
    GninaTypes(PathBuf),
    /// A molecule file loaded as the fixed atoms of every candidate model.
    Molecule(PathBuf),
}

impl Reference {
    pub fn parse(entry: &str) -> Self {
        if entry == NO_REFERENCE {
            Reference::None
        } else if gninatypes::is_gninatypes_path(Path::new(entry)) {
            Reference::GninaTypes(PathBuf::from(entry))
        } else {
            Reference::Molecule(PathBuf::from(entry))
        }
    }

    /// The file the molecule source should load as receptor, if any.
    pub fn receptor_file(&self) -> Option<&Path> {
        match self {
            Reference::Molecule(path) => Some(path),
            Reference::None | Reference::GninaTypes(_) => None,
        }
    }

    /// Loads what the reference contributes to every candidate of its target.
    pub fn resolve(&self) -> Result<ReferenceAtoms, EngineError> {
        match self {
            Reference::None => Ok(ReferenceAtoms::Origin),
            Reference::GninaTypes(path) => gninatypes::read_from_path(path)
                .map(ReferenceAtoms::Fixed)
                .map_err(|source| EngineError::Reference {
                    path: path.clone(),
                    source,
                }),
            Reference::Molecule(_) => Ok(ReferenceAtoms::FromModel),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::None => f.write_str(NO_REFERENCE),
            Reference::GninaTypes(path) | Reference::Molecule(path) => {
                write!(f, "{}", path.display())
            }
        }
    }
}

/// A reference resolved for the duration of one target.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceAtoms {
    Origin,
    Fixed(Vec<Atom>),
    FromModel,
}
