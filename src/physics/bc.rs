use crate::error::{ThermalError, ThermalResult};

/// Boundary condition applied to the top face of the top-most layer.
///
/// Every other outer face of the stack is adiabatic.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TopBoundary {
    #[default]
    Adiabatic,
    /// Convective exchange with the ambient through a heat sink.
    Ambient {
        /// W / (µm² K)
        heat_transfer_coefficient: f64,
        /// K
        ambient_temperature: f64,
    },
}

impl TopBoundary {
    pub fn is_ambient(&self) -> bool {
        matches!(self, TopBoundary::Ambient { .. })
    }

    /// Conductance between the top face of a cell and the ambient.
    pub fn conductance(&self, top_surface: f64) -> f64 {
        match *self {
            TopBoundary::Adiabatic => 0.0,
            TopBoundary::Ambient {
                heat_transfer_coefficient,
                ..
            } => heat_transfer_coefficient * top_surface,
        }
    }

    /// The heat transfer coefficient must be finite and non-negative, the
    /// ambient temperature finite.
    pub fn validate(&self) -> ThermalResult<()> {
        match *self {
            TopBoundary::Adiabatic => Ok(()),
            TopBoundary::Ambient {
                heat_transfer_coefficient,
                ambient_temperature,
            } => {
                if !heat_transfer_coefficient.is_finite() || heat_transfer_coefficient < 0.0 {
                    return Err(ThermalError::InvalidStack(format!(
                        "top heat transfer coefficient must be non-negative, got {}",
                        heat_transfer_coefficient
                    )));
                }
                if !ambient_temperature.is_finite() {
                    return Err(ThermalError::InvalidStack(format!(
                        "ambient temperature must be finite, got {}",
                        ambient_temperature
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn ambient_temperature(&self) -> Option<f64> {
        match *self {
            TopBoundary::Adiabatic => None,
            TopBoundary::Ambient {
                ambient_temperature,
                ..
            } => Some(ambient_temperature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adiabatic_has_no_exchange() {
        let bc = TopBoundary::default();
        assert!(!bc.is_ambient());
        assert_eq!(bc.conductance(100.0), 0.0);
        assert_eq!(bc.ambient_temperature(), None);
    }

    #[test]
    fn test_ambient_conductance() {
        let bc = TopBoundary::Ambient {
            heat_transfer_coefficient: 1e-7,
            ambient_temperature: 300.0,
        };
        assert!((bc.conductance(1.0e4) - 1e-3).abs() < 1e-15);
        assert_eq!(bc.ambient_temperature(), Some(300.0));
        assert!(bc.validate().is_ok());
    }

    #[test]
    fn test_invalid_ambient() {
        let negative = TopBoundary::Ambient {
            heat_transfer_coefficient: -1e-7,
            ambient_temperature: 300.0,
        };
        let unknown = TopBoundary::Ambient {
            heat_transfer_coefficient: 1e-7,
            ambient_temperature: f64::NAN,
        };
        assert!(negative.validate().is_err());
        assert!(unknown.validate().is_err());
    }
}
