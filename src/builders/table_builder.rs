//! Builders to lay out a table and seat its philosophers from configuration.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SimulationConfig;
use crate::core::{CancelToken, EventSink, Philosopher, SimulationError, Table};

/// Odd constant used to spread one seed across philosophers.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Delay generator for philosopher `id`.
///
/// With a seed, every philosopher gets its own reproducible stream; without
/// one, streams are drawn from the thread-local generator.
#[must_use]
pub fn philosopher_rng(seed: Option<u64>, id: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ (id as u64 + 1).wrapping_mul(SEED_STRIDE)),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// Build the table and one philosopher per seat, all bound to `cancel`.
///
/// # Errors
///
/// Returns [`SimulationError::InvalidConfig`] if the configuration does not
/// validate; nothing is built in that case.
pub fn build_table(
    cfg: &SimulationConfig,
    cancel: &CancelToken,
    sink: &Arc<dyn EventSink>,
) -> Result<(Table, Vec<Philosopher>), SimulationError> {
    cfg.validate().map_err(SimulationError::InvalidConfig)?;

    let table = Table::new(cfg.philosophers, cancel)?;
    let philosophers = (0..cfg.philosophers)
        .map(|id| {
            Philosopher::new(
                table.seat(id),
                cancel.clone(),
                cfg.think,
                cfg.eat,
                philosopher_rng(cfg.seed, id),
                Arc::clone(sink),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((table, philosophers))
}
