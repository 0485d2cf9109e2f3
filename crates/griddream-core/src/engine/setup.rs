use super::error::EngineError;
use crate::core::grid::params::{LayerParameter, MolGridParameter};
use tracing::debug;

/// Switches a grid layer into single-example, in-memory screening mode.
///
/// Receptor atoms are never rasterized in this mode: a reference only positions the
/// grid through its centroid.
pub fn configure_for_screening(
    layer: &mut LayerParameter,
) -> Result<&mut MolGridParameter, EngineError> {
    let kind = layer.kind().to_string();
    let param = layer
        .mol_grid_mut()
        .ok_or(EngineError::WrongLayerKind { kind })?;

    param.ignore_rec = true;
    param.ignore_ligand = false;
    param.has_affinity = false;
    param.inmemory = true;
    param.use_rec_center = true;
    param.batch_size = 1;
    debug!(
        resolution = param.resolution,
        dimension = param.dimension,
        "Grid layer configured for screening"
    );
    Ok(param)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_layers_are_forced_into_screening_mode() {
        let mut layer = LayerParameter::MolGridData(MolGridParameter {
            ignore_rec: false,
            ignore_ligand: true,
            has_affinity: true,
            inmemory: false,
            use_rec_center: false,
            batch_size: 32,
            resolution: 0.375,
            ..Default::default()
        });
        let param = configure_for_screening(&mut layer).unwrap();
        assert!(param.ignore_rec);
        assert!(!param.ignore_ligand);
        assert!(!param.has_affinity);
        assert!(param.inmemory);
        assert!(param.use_rec_center);
        assert_eq!(param.batch_size, 1);
        assert_eq!(param.resolution, 0.375);
    }

    #[test]
    fn other_layers_are_rejected() {
        let mut layer = LayerParameter::Other {
            kind: "Pooling".into(),
        };
        match configure_for_screening(&mut layer) {
            Err(EngineError::WrongLayerKind { kind }) => assert_eq!(kind, "Pooling"),
            other => panic!("expected WrongLayerKind, got {:?}", other),
        }
    }
}
