use nalgebra::Point3;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Atom type code {0} is outside the chemistry type table")]
pub struct InvalidTypeCode(pub i32);

/// The fixed chemistry type table used to label every atom.
///
/// The discriminants are the on-disk type codes of the `gninatypes` format, so the
/// order of the variants must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum AtomType {
    Hydrogen = 0,
    PolarHydrogen,
    AliphaticCarbonXSHydrophobe,
    AliphaticCarbonXSNonHydrophobe,
    AromaticCarbonXSHydrophobe,
    AromaticCarbonXSNonHydrophobe,
    Nitrogen,
    NitrogenXSDonor,
    NitrogenXSDonorAcceptor,
    NitrogenXSAcceptor,
    Oxygen,
    OxygenXSDonor,
    OxygenXSDonorAcceptor,
    OxygenXSAcceptor,
    Sulfur,
    SulfurAcceptor,
    Phosphorus,
    Fluorine,
    Chlorine,
    Bromine,
    Iodine,
    Magnesium,
    Manganese,
    Zinc,
    Calcium,
    Iron,
    GenericMetal,
    Boron,
}

impl AtomType {
    pub const COUNT: usize = 28;

    pub const ALL: [AtomType; Self::COUNT] = [
        AtomType::Hydrogen,
        AtomType::PolarHydrogen,
        AtomType::AliphaticCarbonXSHydrophobe,
        AtomType::AliphaticCarbonXSNonHydrophobe,
        AtomType::AromaticCarbonXSHydrophobe,
        AtomType::AromaticCarbonXSNonHydrophobe,
        AtomType::Nitrogen,
        AtomType::NitrogenXSDonor,
        AtomType::NitrogenXSDonorAcceptor,
        AtomType::NitrogenXSAcceptor,
        AtomType::Oxygen,
        AtomType::OxygenXSDonor,
        AtomType::OxygenXSDonorAcceptor,
        AtomType::OxygenXSAcceptor,
        AtomType::Sulfur,
        AtomType::SulfurAcceptor,
        AtomType::Phosphorus,
        AtomType::Fluorine,
        AtomType::Chlorine,
        AtomType::Bromine,
        AtomType::Iodine,
        AtomType::Magnesium,
        AtomType::Manganese,
        AtomType::Zinc,
        AtomType::Calcium,
        AtomType::Iron,
        AtomType::GenericMetal,
        AtomType::Boron,
    ];

    /// Resolves an on-disk type code into a table entry.
    pub fn from_code(code: i32) -> Result<Self, InvalidTypeCode> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or(InvalidTypeCode(code))
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            AtomType::Hydrogen => "Hydrogen",
            AtomType::PolarHydrogen => "PolarHydrogen",
            AtomType::AliphaticCarbonXSHydrophobe => "AliphaticCarbonXSHydrophobe",
            AtomType::AliphaticCarbonXSNonHydrophobe => "AliphaticCarbonXSNonHydrophobe",
            AtomType::AromaticCarbonXSHydrophobe => "AromaticCarbonXSHydrophobe",
            AtomType::AromaticCarbonXSNonHydrophobe => "AromaticCarbonXSNonHydrophobe",
            AtomType::Nitrogen => "Nitrogen",
            AtomType::NitrogenXSDonor => "NitrogenXSDonor",
            AtomType::NitrogenXSDonorAcceptor => "NitrogenXSDonorAcceptor",
            AtomType::NitrogenXSAcceptor => "NitrogenXSAcceptor",
            AtomType::Oxygen => "Oxygen",
            AtomType::OxygenXSDonor => "OxygenXSDonor",
            AtomType::OxygenXSDonorAcceptor => "OxygenXSDonorAcceptor",
            AtomType::OxygenXSAcceptor => "OxygenXSAcceptor",
            AtomType::Sulfur => "Sulfur",
            AtomType::SulfurAcceptor => "SulfurAcceptor",
            AtomType::Phosphorus => "Phosphorus",
            AtomType::Fluorine => "Fluorine",
            AtomType::Chlorine => "Chlorine",
            AtomType::Bromine => "Bromine",
            AtomType::Iodine => "Iodine",
            AtomType::Magnesium => "Magnesium",
            AtomType::Manganese => "Manganese",
            AtomType::Zinc => "Zinc",
            AtomType::Calcium => "Calcium",
            AtomType::Iron => "Iron",
            AtomType::GenericMetal => "GenericMetal",
            AtomType::Boron => "Boron",
        }
    }

    /// The XS radius in Angstroms, which sets the extent of an atom's density.
    pub fn xs_radius(self) -> f32 {
        match self {
            AtomType::Hydrogen | AtomType::PolarHydrogen => 1.1,
            AtomType::AliphaticCarbonXSHydrophobe
            | AtomType::AliphaticCarbonXSNonHydrophobe
            | AtomType::AromaticCarbonXSHydrophobe
            | AtomType::AromaticCarbonXSNonHydrophobe => 1.9,
            AtomType::Nitrogen
            | AtomType::NitrogenXSDonor
            | AtomType::NitrogenXSDonorAcceptor
            | AtomType::NitrogenXSAcceptor => 1.8,
            AtomType::Oxygen
            | AtomType::OxygenXSDonor
            | AtomType::OxygenXSDonorAcceptor
            | AtomType::OxygenXSAcceptor => 1.7,
            AtomType::Sulfur | AtomType::SulfurAcceptor => 2.0,
            AtomType::Phosphorus => 2.1,
            AtomType::Fluorine => 1.5,
            AtomType::Chlorine => 1.8,
            AtomType::Bromine => 2.0,
            AtomType::Iodine => 2.2,
            AtomType::Boron => 1.92,
            AtomType::Magnesium
            | AtomType::Manganese
            | AtomType::Zinc
            | AtomType::Calcium
            | AtomType::Iron
            | AtomType::GenericMetal => 1.2,
        }
    }

    pub fn is_hydrogen(self) -> bool {
        matches!(self, AtomType::Hydrogen | AtomType::PolarHydrogen)
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed atom position, as handed to the gridder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    pub position: Point3<f32>,
    pub atom_type: AtomType,
}

impl Atom {
    pub fn new(position: Point3<f32>, atom_type: AtomType) -> Self {
        Self {
            position,
            atom_type,
        }
    }
}
