pub mod dimensions;
pub mod non_uniform;

pub use dimensions::{CellDimensions, ChipDimensions, Dimensions, GridDimensions, LayerPosition};
pub use non_uniform::{Axis, Connection, LayerGranularity, NonUniformCell, NonUniformGrid};
