use super::error::GridError;
use super::layout::GridLayout;
use super::typemap::{TypeMap, TypeMapKind};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayerLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Layer definition in '{path}' has no 'type' key")]
    MissingType { path: String },
}

/// Settings of a molecular grid data layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct MolGridParameter {
    /// Voxel edge length in Angstroms.
    pub resolution: f32,
    /// Cube edge length in Angstroms.
    pub dimension: f32,
    pub radius_multiplier: f32,
    pub ligand_map: TypeMapKind,
    pub receptor_map: TypeMapKind,
    pub ignore_rec: bool,
    pub ignore_ligand: bool,
    pub has_affinity: bool,
    pub inmemory: bool,
    pub use_rec_center: bool,
    pub batch_size: usize,
}

impl Default for MolGridParameter {
    fn default() -> Self {
        Self {
            resolution: 0.5,
            dimension: 23.5,
            radius_multiplier: 1.0,
            ligand_map: TypeMapKind::GninaLigand,
            receptor_map: TypeMapKind::GninaReceptor,
            ignore_rec: false,
            ignore_ligand: false,
            has_affinity: true,
            inmemory: false,
            use_rec_center: false,
            batch_size: 50,
        }
    }
}

impl MolGridParameter {
    /// The shape of the examples a gridder built from these settings produces.
    pub fn layout(&self) -> Result<GridLayout, GridError> {
        Ok(GridLayout::new(
            GridLayout::points_for(self.dimension, self.resolution)?,
            TypeMap::new(self.receptor_map).num_channels(),
            TypeMap::new(self.ligand_map).num_channels(),
        ))
    }
}

/// A generic network layer configuration. Only grid layers can drive a screen.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerParameter {
    MolGridData(MolGridParameter),
    Other { kind: String },
}

impl LayerParameter {
    pub fn kind(&self) -> &str {
        match self {
            LayerParameter::MolGridData(_) => "MolGridData",
            LayerParameter::Other { kind } => kind,
        }
    }

    pub fn mol_grid(&self) -> Option<&MolGridParameter> {
        match self {
            LayerParameter::MolGridData(param) => Some(param),
            LayerParameter::Other { .. } => None,
        }
    }

    pub fn mol_grid_mut(&mut self) -> Option<&mut MolGridParameter> {
        match self {
            LayerParameter::MolGridData(param) => Some(param),
            LayerParameter::Other { .. } => None,
        }
    }
}

impl LayerParameter {
    /// Reads a layer definition: a TOML table with a `type` key and, for
    /// `MolGridData` layers, any grid settings to override.
    pub fn load(path: &Path) -> Result<Self, LayerLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LayerLoadError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Parses a layer definition; `origin` names the source in error messages.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, LayerLoadError> {
        let toml_error = |e| LayerLoadError::Toml {
            path: origin.to_string(),
            source: e,
        };
        let mut table: toml::Table = toml::from_str(content).map_err(toml_error)?;
        let kind = match table.remove("type") {
            Some(toml::Value::String(kind)) => kind,
            _ => {
                return Err(LayerLoadError::MissingType {
                    path: origin.to_string(),
                });
            }
        };
        if kind != "MolGridData" {
            return Ok(LayerParameter::Other { kind });
        }
        let param: MolGridParameter = toml::Value::Table(table).try_into().map_err(toml_error)?;
        Ok(LayerParameter::MolGridData(param))
    }
}

impl Default for LayerParameter {
    fn default() -> Self {
        LayerParameter::MolGridData(MolGridParameter::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layer_is_a_gnina_grid() {
        let layer = LayerParameter::default();
        assert_eq!(layer.kind(), "MolGridData");
        let layout = layer.mol_grid().unwrap().layout().unwrap();
        assert_eq!(layout.points_per_side, 48);
        assert_eq!(layout.num_receptor_types, 14);
        assert_eq!(layout.num_ligand_types, 14);
    }

    #[test]
    fn other_layers_carry_no_grid_settings() {
        let mut layer = LayerParameter::Other {
            kind: "Convolution".into(),
        };
        assert_eq!(layer.kind(), "Convolution");
        assert!(layer.mol_grid().is_none());
        assert!(layer.mol_grid_mut().is_none());
    }

    #[test]
    fn grid_layer_definitions_override_defaults() {
        let content = r#"
            type = "MolGridData"
            resolution = 0.375
            ligand-map = "element"
            batch-size = 10
        "#;
        let layer = LayerParameter::from_toml_str(content, "layer.toml").unwrap();
        let param = layer.mol_grid().unwrap();
        assert_eq!(param.resolution, 0.375);
        assert_eq!(param.ligand_map, TypeMapKind::Element);
        assert_eq!(param.batch_size, 10);
        assert_eq!(param.dimension, 23.5);
        assert_eq!(param.receptor_map, TypeMapKind::GninaReceptor);
    }

    #[test]
    fn non_grid_layer_definitions_keep_their_kind() {
        let layer = LayerParameter::from_toml_str("type = \"Pooling\"\nstride = 2", "l").unwrap();
        assert_eq!(layer, LayerParameter::Other { kind: "Pooling".into() });
    }

    #[test]
    fn layer_definitions_need_a_type_and_known_keys() {
        assert!(matches!(
            LayerParameter::from_toml_str("resolution = 0.5", "l"),
            Err(LayerLoadError::MissingType { .. })
        ));
        assert!(matches!(
            LayerParameter::from_toml_str("type = \"MolGridData\"\nvoxel = 1.0", "l"),
            Err(LayerLoadError::Toml { .. })
        ));
    }
}
