pub mod analysis;
pub mod emulate;
pub mod thermal_data;

pub use analysis::{Analysis, AnalysisKind};
pub use emulate::{emulate_slot, emulate_steady, emulate_step, reset_thermal_state, SimResult};
pub use thermal_data::{ThermalData, ThermalState};
