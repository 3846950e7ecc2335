pub mod csv_writer;
pub mod inspection;
pub mod summary;

pub use inspection::{
    cell_temperature, floorplan_temperatures, source_map, thermal_map, ElementTemperatures,
};
pub use summary::SimulationSummary;
