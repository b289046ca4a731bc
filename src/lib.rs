//! # Dining Table
//!
//! A deadlock-free dining philosophers simulation built on `parking_lot`
//! primitives.
//!
//! N philosophers sit around a ring of N forks; philosopher `i` needs fork `i`
//! (left) and fork `(i + 1) mod N` (right) to eat. If every philosopher picks
//! up the left fork at the same moment, each waits forever for the right one.
//! This crate prevents that circular wait with an admission gate: at most N−1
//! philosophers may hold a permit (and therefore forks) at once, so at least
//! one philosopher is always outside the contention and the ring cannot close.
//!
//! ## Key Pieces
//!
//! - **[`Fork`](core::Fork)**: binary mutual-exclusion resource with scoped guards
//! - **[`AdmissionGate`](core::AdmissionGate)**: counting permit pool of capacity N−1
//! - **[`Philosopher`](core::Philosopher)**: think → gate → left → right → eat → release
//!   state machine
//! - **[`CancelToken`](core::CancelToken)**: broadcast cooperative cancellation
//!   observed at every blocking point
//! - **[`Simulation`](runtime::Simulation)**: coordinator that starts one thread per
//!   philosopher and shuts them down cleanly
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use dining_table::config::{DelayRange, SimulationConfig};
//! use dining_table::core::{EventSink, InMemoryEventLog};
//! use dining_table::runtime::Simulation;
//!
//! let log = Arc::new(InMemoryEventLog::new(10_000));
//! let config = SimulationConfig::new()
//!     .with_philosophers(5)
//!     .with_run_duration(None)
//!     .with_think(DelayRange::new(1, 5))
//!     .with_eat(DelayRange::new(1, 5));
//!
//! let simulation = Simulation::start(config, Arc::clone(&log) as Arc<dyn EventSink>)?;
//! std::thread::sleep(Duration::from_millis(200));
//! simulation.stop();
//!
//! let report = simulation.await_termination();
//! assert!(simulation.snapshot().is_idle());
//! println!("{} meals in {:?}", report.total_meals, report.elapsed);
//! # Ok::<(), dining_table::core::SimulationError>(())
//! ```
//!
//! Starvation of an individual philosopher is not prevented; the gate only
//! guarantees that the table as a whole keeps making progress.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders that lay out a table from configuration.
pub mod builders;
/// Configuration models for the table, delays, and run duration.
pub mod config;
/// Core primitives: cancellation, forks, gate, philosophers, events.
pub mod core;
/// Simulation coordinator and runtime drivers.
pub mod runtime;
/// Shared utilities.
pub mod util;
