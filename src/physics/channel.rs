use super::material::{check_positive, Material};
use crate::error::{ThermalError, ThermalResult};

/// ml/min to µm³/s.
pub fn flow_rate_from_ml_per_min(flow_rate: f64) -> f64 {
    flow_rate * 1e12 / 60.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coolant {
    /// W / (µm² K)
    pub heat_transfer_coefficient: f64,
    /// J / (µm³ K)
    pub volumetric_heat_capacity: f64,
    /// Temperature of the coolant entering the channel at row 0, in K.
    pub incoming_temperature: f64,
}

/// A microchannel cavity occupying one layer of the grid.
///
/// Even columns are walls made of `wall_material`, odd columns carry the
/// coolant. The coolant flows from row 0 towards the last row.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub id: String,
    /// µm
    pub height: f64,
    pub wall_material: Material,
    pub coolant: Coolant,
    /// Total flow rate through the cavity, in µm³/s.
    pub flow_rate: f64,
}

impl Channel {
    pub fn new(
        id: impl Into<String>,
        height: f64,
        wall_material: Material,
        coolant: Coolant,
        flow_rate_ml_per_min: f64,
    ) -> Self {
        Self {
            id: id.into(),
            height,
            wall_material,
            coolant,
            flow_rate: flow_rate_from_ml_per_min(flow_rate_ml_per_min),
        }
    }

    /// Checks the geometry, the wall material and the coolant properties.
    pub fn validate(&self) -> ThermalResult<()> {
        check_positive(&self.id, "height", self.height)?;
        self.wall_material.validate()?;
        check_positive(
            &self.id,
            "coolant heat transfer coefficient",
            self.coolant.heat_transfer_coefficient,
        )?;
        check_positive(
            &self.id,
            "coolant volumetric heat capacity",
            self.coolant.volumetric_heat_capacity,
        )?;
        if !self.coolant.incoming_temperature.is_finite() {
            return Err(ThermalError::InvalidStack(format!(
                "coolant of `{}` enters at {} K",
                self.id, self.coolant.incoming_temperature
            )));
        }
        if !self.flow_rate.is_finite() || self.flow_rate < 0.0 {
            return Err(ThermalError::InvalidStack(format!(
                "flow rate of `{}` must be non-negative, got {}",
                self.id, self.flow_rate
            )));
        }
        Ok(())
    }

    pub fn is_liquid_column(column: usize) -> bool {
        column % 2 == 1
    }

    /// Advective coefficient `C` of a liquid cell.
    ///
    /// The flow is shared by the `(n_columns - 1) / 2` liquid columns and `C`
    /// is half the heat capacity rate of one of them:
    /// `C = vhc * flow_rate / (n_columns - 1)`.
    pub fn advection_coefficient(&self, n_columns: usize) -> f64 {
        self.coolant.volumetric_heat_capacity * self.flow_rate / (n_columns - 1) as f64
    }

    /// Heat entering a liquid cell of row 0 with the incoming coolant.
    pub fn inlet_source(&self, n_columns: usize) -> f64 {
        2.0 * self.advection_coefficient(n_columns) * self.coolant.incoming_temperature
    }
}
