//! Simulation coordinator and runtime drivers.

#[cfg(feature = "tokio-runtime")]
pub mod driver;
pub mod simulation;

#[cfg(feature = "tokio-runtime")]
pub use driver::run_until_interrupted;
pub use simulation::{Simulation, SimulationReport};
