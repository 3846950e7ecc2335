use crate::error::{ThermalError, ThermalResult};

/// Thermal properties of a solid material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: String,
    /// W / (µm K)
    pub thermal_conductivity: f64,
    /// J / (µm³ K)
    pub volumetric_heat_capacity: f64,
}

impl Material {
    pub fn new(
        id: impl Into<String>,
        thermal_conductivity: f64,
        volumetric_heat_capacity: f64,
    ) -> Self {
        Self {
            id: id.into(),
            thermal_conductivity,
            volumetric_heat_capacity,
        }
    }

    pub fn validate(&self) -> ThermalResult<()> {
        check_positive(&self.id, "thermal conductivity", self.thermal_conductivity)?;
        check_positive(&self.id, "volumetric heat capacity", self.volumetric_heat_capacity)
    }
}

/// Fails with `InvalidStack` unless `value` is finite and strictly positive.
pub(crate) fn check_positive(owner: &str, quantity: &str, value: f64) -> ThermalResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ThermalError::InvalidStack(format!(
            "{} of `{}` must be positive, got {}",
            quantity, owner, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Material::new("si", 1.3e-4, 1.6e-12).validate().is_ok());
        assert!(Material::new("si", 0.0, 1.6e-12).validate().is_err());
        assert!(Material::new("si", 1.3e-4, -1.0).validate().is_err());
        assert!(Material::new("si", f64::NAN, 1.6e-12).validate().is_err());
        assert!(Material::new("si", 1.3e-4, f64::INFINITY).validate().is_err());
    }
}
