use super::error::GridError;
use crate::core::models::atom::AtomType;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use AtomType::*;

#[rustfmt::skip]
const GNINA_LIGAND_CHANNELS: &[&[AtomType]] = &[
    &[AliphaticCarbonXSHydrophobe],
    &[AliphaticCarbonXSNonHydrophobe],
    &[AromaticCarbonXSHydrophobe],
    &[AromaticCarbonXSNonHydrophobe],
    &[Bromine],
    &[Chlorine],
    &[Fluorine],
    &[Iodine],
    &[Nitrogen, NitrogenXSAcceptor],
    &[NitrogenXSDonor, NitrogenXSDonorAcceptor],
    &[Oxygen, OxygenXSAcceptor],
    &[OxygenXSDonor, OxygenXSDonorAcceptor],
    &[Sulfur, SulfurAcceptor],
    &[Phosphorus],
];

#[rustfmt::skip]
const GNINA_RECEPTOR_CHANNELS: &[&[AtomType]] = &[
    &[AliphaticCarbonXSHydrophobe],
    &[AliphaticCarbonXSNonHydrophobe],
    &[AromaticCarbonXSHydrophobe],
    &[AromaticCarbonXSNonHydrophobe],
    &[Calcium],
    &[Iron],
    &[Magnesium],
    &[Nitrogen, NitrogenXSAcceptor],
    &[NitrogenXSDonor, NitrogenXSDonorAcceptor],
    &[Oxygen, OxygenXSAcceptor],
    &[OxygenXSDonor, OxygenXSDonorAcceptor],
    &[Phosphorus],
    &[Sulfur, SulfurAcceptor],
    &[Zinc],
];

#[rustfmt::skip]
const ELEMENT_CHANNELS: &[&[AtomType]] = &[
    &[AliphaticCarbonXSHydrophobe, AliphaticCarbonXSNonHydrophobe,
      AromaticCarbonXSHydrophobe, AromaticCarbonXSNonHydrophobe],
    &[Nitrogen, NitrogenXSDonor, NitrogenXSDonorAcceptor, NitrogenXSAcceptor],
    &[Oxygen, OxygenXSDonor, OxygenXSDonorAcceptor, OxygenXSAcceptor],
    &[Sulfur, SulfurAcceptor],
    &[Phosphorus],
    &[Fluorine],
    &[Chlorine],
    &[Bromine],
    &[Iodine],
    &[Boron],
    &[Magnesium, Manganese, Zinc, Calcium, Iron, GenericMetal],
];

/// A named assignment of atom types to grid channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeMapKind {
    GninaLigand,
    GninaReceptor,
    Element,
}

impl TypeMapKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeMapKind::GninaLigand => "gnina-ligand",
            TypeMapKind::GninaReceptor => "gnina-receptor",
            TypeMapKind::Element => "element",
        }
    }

    fn channels(self) -> &'static [&'static [AtomType]] {
        match self {
            TypeMapKind::GninaLigand => GNINA_LIGAND_CHANNELS,
            TypeMapKind::GninaReceptor => GNINA_RECEPTOR_CHANNELS,
            TypeMapKind::Element => ELEMENT_CHANNELS,
        }
    }
}

impl FromStr for TypeMapKind {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "gnina-ligand" | "ligand" => Ok(TypeMapKind::GninaLigand),
            "gnina-receptor" | "receptor" => Ok(TypeMapKind::GninaReceptor),
            "element" | "elements" => Ok(TypeMapKind::Element),
            _ => Err(GridError::UnknownTypeMap(s.to_string())),
        }
    }
}

impl fmt::Display for TypeMapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMap {
    kind: TypeMapKind,
    channel_of: [Option<usize>; AtomType::COUNT],
    num_channels: usize,
}

impl TypeMap {
    pub fn new(kind: TypeMapKind) -> Self {
        let mut channel_of = [None; AtomType::COUNT];
        let channels = kind.channels();
        for (channel, types) in channels.iter().enumerate() {
            for ty in *types {
                channel_of[*ty as usize] = Some(channel);
            }
        }
        Self {
            kind,
            channel_of,
            num_channels: channels.len(),
        }
    }

    pub fn kind(&self) -> TypeMapKind {
        self.kind
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// The channel an atom type is drawn into, or `None` if the map ignores it.
    pub fn channel(&self, ty: AtomType) -> Option<usize> {
        self.channel_of[ty as usize]
    }

    pub fn channel_name(&self, channel: usize) -> Option<String> {
        self.kind.channels().get(channel).map(|types| {
            types
                .iter()
                .map(|t| t.name())
                .collect::<Vec<_>>()
                .join("_")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gnina_ligand_map_groups_donors_and_acceptors() {
        let map = TypeMap::new(TypeMapKind::GninaLigand);
        assert_eq!(map.num_channels(), 14);
        assert_eq!(map.channel(Nitrogen), map.channel(NitrogenXSAcceptor));
        assert_ne!(map.channel(NitrogenXSDonor), map.channel(NitrogenXSAcceptor));
        assert_eq!(map.channel(Hydrogen), None);
        assert_eq!(map.channel(PolarHydrogen), None);
        assert_eq!(map.channel(Zinc), None);
    }

    #[test]
    fn receptor_map_covers_metals() {
        let map = TypeMap::new(TypeMapKind::GninaReceptor);
        assert_eq!(map.channel(Zinc), Some(13));
        assert_eq!(map.channel(Iodine), None);
    }

    #[test]
    fn element_map_merges_all_carbons() {
        let map = TypeMap::new(TypeMapKind::Element);
        assert_eq!(map.channel(AromaticCarbonXSNonHydrophobe), Some(0));
        assert_eq!(map.channel(AliphaticCarbonXSHydrophobe), Some(0));
        assert_eq!(map.channel_name(4).as_deref(), Some("Phosphorus"));
    }

    #[test]
    fn names_parse_leniently() {
        assert_eq!(
            "GNINA_LIGAND".parse::<TypeMapKind>().unwrap(),
            TypeMapKind::GninaLigand
        );
        assert_eq!(
            "element".parse::<TypeMapKind>().unwrap(),
            TypeMapKind::Element
        );
        assert!(matches!(
            "smiles".parse::<TypeMapKind>(),
            Err(GridError::UnknownTypeMap(_))
        ));
    }
}
