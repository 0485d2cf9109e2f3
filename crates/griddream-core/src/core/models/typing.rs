use super::atom::AtomType;
use phf::{Map, phf_map};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementClass {
    Hydrogen,
    Carbon,
    Nitrogen,
    Oxygen,
    Sulfur,
    Fixed(AtomType),
}

#[rustfmt::skip]
static ELEMENT_CLASSES: Map<&'static str, ElementClass> = phf_map! {
    "H"  => ElementClass::Hydrogen, "D" => ElementClass::Hydrogen,
    "C"  => ElementClass::Carbon,
    "N"  => ElementClass::Nitrogen,
    "O"  => ElementClass::Oxygen,
    "S"  => ElementClass::Sulfur,
    "P"  => ElementClass::Fixed(AtomType::Phosphorus),
    "F"  => ElementClass::Fixed(AtomType::Fluorine),
    "CL" => ElementClass::Fixed(AtomType::Chlorine),
    "BR" => ElementClass::Fixed(AtomType::Bromine),
    "I"  => ElementClass::Fixed(AtomType::Iodine),
    "B"  => ElementClass::Fixed(AtomType::Boron),
    "MG" => ElementClass::Fixed(AtomType::Magnesium),
    "MN" => ElementClass::Fixed(AtomType::Manganese),
    "ZN" => ElementClass::Fixed(AtomType::Zinc),
    "CA" => ElementClass::Fixed(AtomType::Calcium),
    "FE" => ElementClass::Fixed(AtomType::Iron),
    "CU" => ElementClass::Fixed(AtomType::GenericMetal),
    "CO" => ElementClass::Fixed(AtomType::GenericMetal),
    "NI" => ElementClass::Fixed(AtomType::GenericMetal),
    "NA" => ElementClass::Fixed(AtomType::GenericMetal),
    "K"  => ElementClass::Fixed(AtomType::GenericMetal),
    "LI" => ElementClass::Fixed(AtomType::GenericMetal),
    "AL" => ElementClass::Fixed(AtomType::GenericMetal),
    "CD" => ElementClass::Fixed(AtomType::GenericMetal),
    "HG" => ElementClass::Fixed(AtomType::GenericMetal),
};

/// Bonding context of one atom, as far as typing needs it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BondingContext {
    pub bonded_to_hydrogen: bool,
    pub bonded_to_heteroatom: bool,
    pub aromatic: bool,
    pub heavy_neighbors: usize,
}

/// Whether an element is a heteroatom in the XS sense (N or O).
pub fn is_heteroatom(element: &str) -> bool {
    matches!(element.to_ascii_uppercase().as_str(), "N" | "O")
}

/// Assigns a chemistry type from an element symbol and its bonding context.
///
/// Returns `None` for elements absent from the type table.
pub fn assign_type(element: &str, ctx: &BondingContext) -> Option<AtomType> {
    let class = ELEMENT_CLASSES.get(element.trim().to_ascii_uppercase().as_str())?;
    let ty = match *class {
        ElementClass::Hydrogen => {
            if ctx.bonded_to_heteroatom {
                AtomType::PolarHydrogen
            } else {
                AtomType::Hydrogen
            }
        }
        ElementClass::Carbon => match (ctx.aromatic, ctx.bonded_to_heteroatom) {
            (false, false) => AtomType::AliphaticCarbonXSHydrophobe,
            (false, true) => AtomType::AliphaticCarbonXSNonHydrophobe,
            (true, false) => AtomType::AromaticCarbonXSHydrophobe,
            (true, true) => AtomType::AromaticCarbonXSNonHydrophobe,
        },
        ElementClass::Nitrogen => {
            if ctx.bonded_to_hydrogen {
                AtomType::NitrogenXSDonor
            } else if ctx.heavy_neighbors < 3 {
                AtomType::NitrogenXSAcceptor
            } else {
                AtomType::Nitrogen
            }
        }
        ElementClass::Oxygen => {
            if ctx.bonded_to_hydrogen {
                AtomType::OxygenXSDonorAcceptor
            } else {
                AtomType::OxygenXSAcceptor
            }
        }
        ElementClass::Sulfur => AtomType::Sulfur,
        ElementClass::Fixed(ty) => ty,
    };
    Some(ty)
}
