//! Configuration models for the table, delays, and run duration.

pub mod simulation;

pub use simulation::{DelayRange, SimulationConfig};
