use super::material::{check_positive, Material};
use crate::error::ThermalResult;

/// A solid slab spanning the whole chip footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: String,
    /// µm
    pub height: f64,
    pub material: Material,
}

impl Layer {
    pub fn new(id: impl Into<String>, height: f64, material: Material) -> Self {
        Self {
            id: id.into(),
            height,
            material,
        }
    }

    pub fn validate(&self) -> ThermalResult<()> {
        check_positive(&self.id, "height", self.height)?;
        self.material.validate()
    }
}
