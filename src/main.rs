//! Command-line driver for the dining table.
//!
//! Usage: `dining-table [config.json]`
//!
//! Without a config file, settings come from `DINING_*` environment variables
//! (a `.env` file is honoured) over the defaults: 5 philosophers, 30 seconds,
//! 500–2000 ms think and eat phases. Ctrl-C stops the run early.

use std::sync::Arc;

use anyhow::anyhow;
use tracing::info;

use dining_table::config::SimulationConfig;
use dining_table::core::{AppResult, TracingEventSink};
use dining_table::runtime::run_until_interrupted;
use dining_table::util::init_tracing;

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_json_file(&path),
        None => SimulationConfig::from_env(),
    }
    .map_err(|e| anyhow!("invalid configuration: {e}"))?;

    let report = run_until_interrupted(config, Arc::new(TracingEventSink)).await?;

    for (philosopher, meals) in report.meals.iter().enumerate() {
        info!(philosopher, meals, "final tally");
    }
    info!(
        run_id = %report.run_id,
        total_meals = report.total_meals,
        peak_permits = report.peak_permits,
        gate_capacity = report.gate_capacity,
        elapsed = ?report.elapsed,
        "done"
    );
    Ok(())
}
