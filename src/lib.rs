//! Compact thermal model of 3D-stacked integrated circuits with inter-tier
//! liquid cooling.
//!
//! The stack is discretized in a grid of cuboid cells, one layer of cells per
//! material layer. Each time step solves the implicit-Euler system
//! `A T(t+dt) = S + Cap T(t)` built from the conductances between neighboring
//! cells, the heat capacity of every cell and the power dissipated by the
//! floorplan elements of every die.

pub mod config;
pub mod discretization;
pub mod error;
pub mod numerics;
pub mod physics;
pub mod processing;
pub mod simulation;

pub use config::SimulationConfig;
pub use error::{ThermalError, ThermalResult};
