//! Tokio driver: runs a simulation until its duration elapses or Ctrl-C.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::core::{AppResult, EventSink};
use crate::runtime::{Simulation, SimulationReport};

/// Start a simulation and drive it to completion.
///
/// The run ends when the configured duration elapses or when the process
/// receives Ctrl-C, whichever comes first. Philosophers are joined on tokio's
/// blocking pool.
///
/// # Errors
///
/// Returns an error if the simulation cannot be started.
pub async fn run_until_interrupted(
    config: SimulationConfig,
    sink: Arc<dyn EventSink>,
) -> AppResult<SimulationReport> {
    let simulation = Simulation::start(config, sink)?;

    let token = simulation.cancel_token();
    let mut stopped = tokio::task::spawn_blocking(move || token.wait());

    let interrupted = tokio::select! {
        signal = tokio::signal::ctrl_c() => Some(signal),
        _ = &mut stopped => None,
    };
    match interrupted {
        Some(Ok(())) => {
            info!(run_id = %simulation.run_id(), "interrupt received");
            simulation.stop();
        }
        Some(Err(e)) => {
            warn!(error = %e, "cannot listen for Ctrl-C, waiting for the run duration");
            let _ = stopped.await;
        }
        None => {}
    }

    Ok(simulation.await_termination_async().await)
}
