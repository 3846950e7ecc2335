use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::discretization::dimensions::CellDimensions;
use crate::discretization::non_uniform::LayerGranularity;
use crate::error::{ThermalError, ThermalResult};
use crate::numerics::solver::SolverBackend;
use crate::physics::bc::TopBoundary;
use crate::physics::channel::{Channel, Coolant};
use crate::physics::die::Die;
use crate::physics::floorplan::{Floorplan, FloorplanElement, IcElement};
use crate::physics::layer::Layer;
use crate::physics::material::Material;
use crate::physics::stack::{Stack, StackDescription, StackElementKind};
use crate::simulation::analysis::Analysis;

/// Full description of a simulation run.
///
/// Lengths are in µm except the chip size (mm). Conductivities in W/(µm K),
/// heat capacities in J/(µm³ K), heat transfer coefficients in W/(µm² K),
/// flow rates in ml/min.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub materials: Vec<MaterialConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coolant: Option<CoolantConfig>,
    pub dimensions: DimensionsConfig,
    /// Bottom-most element first.
    pub stack: Vec<StackElementConfig>,
    #[serde(default)]
    pub top_boundary: TopBoundaryConfig,
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub solver: SolverBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialConfig {
    pub id: String,
    pub thermal_conductivity: f64,
    pub volumetric_heat_capacity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoolantConfig {
    pub heat_transfer_coefficient: f64,
    pub volumetric_heat_capacity: f64,
    pub incoming_temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionsConfig {
    pub cell: CellConfig,
    pub chip: ChipConfig,
    /// Per-layer split of the chip, bottom first. Replaces the uniform grid
    /// when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_uniform: Option<Vec<LayerGranularity>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellConfig {
    pub length: f64,
    pub width: f64,
    /// Defaults to `length`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_length: Option<f64>,
    /// Defaults to `length`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_length: Option<f64>,
}

/// Chip footprint in mm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChipConfig {
    pub length: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub id: String,
    pub height: f64,
    pub material: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectangleConfig {
    /// South-west corner, µm.
    pub x: f64,
    pub y: f64,
    pub length: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorplanElementConfig {
    pub id: String,
    pub rectangles: Vec<RectangleConfig>,
    /// Power per slot, in W.
    #[serde(default)]
    pub power_values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StackElementConfig {
    Layer(LayerConfig),
    Channel {
        id: String,
        height: f64,
        wall_material: String,
        flow_rate: f64,
    },
    Die {
        id: String,
        /// Bottom-most layer first.
        layers: Vec<LayerConfig>,
        source_layer: String,
        floorplan: Vec<FloorplanElementConfig>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopBoundaryConfig {
    #[default]
    Adiabatic,
    Ambient {
        heat_transfer_coefficient: f64,
        ambient_temperature: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisConfig {
    Transient {
        step_time: f64,
        slot_time: f64,
        initial_temperature: f64,
    },
    Steady {
        initial_temperature: f64,
    },
}

impl SimulationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ThermalResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> ThermalResult<Self> {
        let config: Self = serde_json::from_str(contents)?;
        Ok(config)
    }

    /// Resolves materials, validates the stack and binds it to the grid.
    pub fn build(&self) -> ThermalResult<(StackDescription, Analysis)> {
        let materials = self.material_table()?;
        let material = |id: &str| -> ThermalResult<Material> {
            materials
                .get(id)
                .cloned()
                .ok_or_else(|| ThermalError::UnknownMaterial(id.to_string()))
        };
        let layer = |l: &LayerConfig| -> ThermalResult<Layer> {
            Ok(Layer::new(&l.id, l.height, material(&l.material)?))
        };

        let mut stack = Stack::new();
        for element in &self.stack {
            match element {
                StackElementConfig::Layer(l) => {
                    stack.push(&l.id, StackElementKind::Layer(layer(l)?))?
                }
                StackElementConfig::Channel {
                    id,
                    height,
                    wall_material,
                    flow_rate,
                } => {
                    let coolant = self.coolant.as_ref().ok_or_else(|| {
                        ThermalError::InvalidStack(format!(
                            "channel `{}` declared without a coolant",
                            id
                        ))
                    })?;
                    let channel = Channel::new(
                        id,
                        *height,
                        material(wall_material)?,
                        Coolant {
                            heat_transfer_coefficient: coolant.heat_transfer_coefficient,
                            volumetric_heat_capacity: coolant.volumetric_heat_capacity,
                            incoming_temperature: coolant.incoming_temperature,
                        },
                        *flow_rate,
                    );
                    stack.push(id, StackElementKind::Channel(channel))?
                }
                StackElementConfig::Die {
                    id,
                    layers,
                    source_layer,
                    floorplan,
                } => {
                    let layers =
                        layers.iter().map(|l| layer(l)).collect::<ThermalResult<Vec<_>>>()?;
                    let elements = floorplan
                        .iter()
                        .map(|e| {
                            let rectangles = e
                                .rectangles
                                .iter()
                                .map(|r| IcElement::new(r.x, r.y, r.length, r.width))
                                .collect();
                            FloorplanElement::new(&e.id, rectangles)
                                .with_power_values(e.power_values.iter().copied())
                        })
                        .collect();
                    let die = Die::new(id, layers, source_layer, Floorplan::new(elements)?)?;
                    stack.push(id, StackElementKind::Die(die))?
                }
            }
        }

        let c = &self.dimensions.cell;
        let cell = CellDimensions {
            first_length: c.first_length.unwrap_or(c.length),
            length: c.length,
            last_length: c.last_length.unwrap_or(c.length),
            width: c.width,
        };
        let top_boundary = match self.top_boundary {
            TopBoundaryConfig::Adiabatic => TopBoundary::Adiabatic,
            TopBoundaryConfig::Ambient {
                heat_transfer_coefficient,
                ambient_temperature,
            } => TopBoundary::Ambient {
                heat_transfer_coefficient,
                ambient_temperature,
            },
        };

        let stkd = StackDescription::from_chip(
            stack,
            cell,
            self.dimensions.chip.length * 1e3,
            self.dimensions.chip.width * 1e3,
            top_boundary,
        )?;
        let stkd = match &self.dimensions.non_uniform {
            Some(granularity) => stkd.with_non_uniform_grid(granularity.clone())?,
            None => stkd,
        };

        let analysis = match self.analysis {
            AnalysisConfig::Transient {
                step_time,
                slot_time,
                initial_temperature,
            } => Analysis::transient(step_time, slot_time, initial_temperature)?,
            AnalysisConfig::Steady { initial_temperature } => Analysis::steady(initial_temperature),
        };

        Ok((stkd, analysis))
    }

    fn material_table(&self) -> ThermalResult<HashMap<&str, Material>> {
        let mut table = HashMap::with_capacity(self.materials.len());
        for m in &self.materials {
            let material = Material::new(&m.id, m.thermal_conductivity, m.volumetric_heat_capacity);
            if table.insert(m.id.as_str(), material).is_some() {
                return Err(ThermalError::DuplicateId(m.id.clone()));
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::analysis::AnalysisKind;

    const TWO_DIES: &str = r#"{
        "materials": [
            { "id": "silicon", "thermal_conductivity": 1.30e-4,
              "volumetric_heat_capacity": 1.628e-12 },
            { "id": "bond", "thermal_conductivity": 2.50e-7,
              "volumetric_heat_capacity": 2.298e-12 }
        ],
        "coolant": {
            "heat_transfer_coefficient": 2.7132e-8,
            "volumetric_heat_capacity": 4.172e-12,
            "incoming_temperature": 300.0
        },
        "dimensions": {
            "cell": { "length": 100, "width": 100 },
            "chip": { "length": 0.5, "width": 0.4 }
        },
        "stack": [
            { "kind": "die", "id": "bottom_die",
              "layers": [
                  { "id": "bulk", "height": 50, "material": "silicon" },
                  { "id": "active", "height": 2, "material": "silicon" }
              ],
              "source_layer": "active",
              "floorplan": [
                  { "id": "core",
                    "rectangles": [ { "x": 0, "y": 0, "length": 500, "width": 400 } ],
                    "power_values": [1.5, 2.0] }
              ] },
            { "kind": "channel", "id": "cavity", "height": 100,
              "wall_material": "silicon", "flow_rate": 0.5 },
            { "kind": "layer", "id": "lid", "height": 10, "material": "bond" }
        ],
        "top_boundary": { "kind": "ambient", "heat_transfer_coefficient": 1e-7,
                          "ambient_temperature": 300.0 },
        "analysis": { "kind": "transient", "step_time": 0.002, "slot_time": 0.02,
                      "initial_temperature": 300.0 }
    }"#;

    #[test]
    fn test_build_from_json() {
        let config = SimulationConfig::from_json(TWO_DIES).unwrap();
        assert_eq!(config.solver, SolverBackend::SparseLu);

        let (stkd, analysis) = config.build().unwrap();
        let dims = &stkd.dimensions;
        assert_eq!((dims.n_layers(), dims.n_rows(), dims.n_columns()), (4, 4, 5));
        assert!(stkd.stack.has_channels());
        assert!(stkd.top_boundary.is_ambient());
        assert_eq!(stkd.total_number_of_floorplan_elements(), 1);
        assert_eq!(analysis.kind(), AnalysisKind::Transient);
        assert_eq!(analysis.slot_length(), 10);
    }

    #[test]
    fn test_unknown_material() {
        let mut config = SimulationConfig::from_json(TWO_DIES).unwrap();
        config.materials.remove(1);
        assert!(matches!(config.build(), Err(ThermalError::UnknownMaterial(id)) if id == "bond"));
    }

    #[test]
    fn test_channel_without_coolant() {
        let mut config = SimulationConfig::from_json(TWO_DIES).unwrap();
        config.coolant = None;
        assert!(matches!(config.build(), Err(ThermalError::InvalidStack(_))));
    }

    #[test]
    fn test_non_uniform_grid() {
        let mut config = SimulationConfig::from_json(TWO_DIES).unwrap();
        config.dimensions.non_uniform = Some(vec![LayerGranularity::new(1, 1); 4]);
        assert!(matches!(config.build(), Err(ThermalError::InvalidStack(_))));

        config.stack.remove(1);
        config.dimensions.non_uniform = Some(vec![LayerGranularity::new(1, 1); 2]);
        assert!(matches!(config.build(), Err(ThermalError::InvalidDimensions(_))));

        let json = r#"[ { "n_rows": 8, "n_columns": 10 },
                        { "n_rows": 4, "n_columns": 5 },
                        { "n_rows": 1, "n_columns": 1 } ]"#;
        config.dimensions.non_uniform = Some(serde_json::from_str(json).unwrap());
        let (stkd, _) = config.build().unwrap();
        assert_eq!(stkd.n_cells(), 80 + 20 + 1);
        assert_eq!(stkd.non_uniform().unwrap().grid().granularity(1), LayerGranularity::new(4, 5));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SimulationConfig::from_json("{ \"materials\": 3 }"),
            Err(ThermalError::Json(_))
        ));
    }
}
