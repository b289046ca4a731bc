//! Error types for table and simulation operations.

use thiserror::Error;

/// The current task has been asked to stop.
///
/// This is the only failure a philosopher can observe. It is raised at every
/// blocking point (gate, forks, think/eat delays) once the table's
/// [`CancelToken`](crate::core::CancelToken) fires, and it never crosses the
/// philosopher's task boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled")]
pub struct Cancelled;

/// Errors produced while setting up or driving a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Startup precondition violated (e.g. fewer than two philosophers).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The operating system refused to start a thread.
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        /// Name of the thread that could not be started.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
