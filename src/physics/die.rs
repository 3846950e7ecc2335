use super::floorplan::Floorplan;
use super::layer::Layer;
use crate::error::{ThermalError, ThermalResult};

/// A group of layers, bottom first, one of which dissipates the power
/// described by the die's floorplan.
#[derive(Debug, Clone, PartialEq)]
pub struct Die {
    pub id: String,
    pub layers: Vec<Layer>,
    /// Index into `layers` of the source layer.
    pub source_layer: usize,
    pub floorplan: Floorplan,
}

impl Die {
    pub fn new(
        id: impl Into<String>,
        layers: Vec<Layer>,
        source_layer: &str,
        floorplan: Floorplan,
    ) -> ThermalResult<Self> {
        let id = id.into();
        if layers.is_empty() {
            return Err(ThermalError::InvalidStack(format!("die `{}` has no layers", id)));
        }
        let source_layer = layers
            .iter()
            .position(|l| l.id == source_layer)
            .ok_or_else(|| ThermalError::UnknownElement(format!("{}.{}", id, source_layer)))?;

        Ok(Self {
            id,
            layers,
            source_layer,
            floorplan,
        })
    }
}
