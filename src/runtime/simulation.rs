//! Simulation coordinator: seats the philosophers, runs them on dedicated OS
//! threads, and shuts the table down.
//!
//! # Lifecycle
//!
//! - [`Simulation::start`] validates the configuration before any thread is
//!   launched, builds the ring, spawns one `philosopher-{i}` thread per seat
//!   and, when a run duration is configured, a `simulation-timer` thread that
//!   cancels the table once it elapses.
//! - [`Simulation::stop`] broadcasts cancellation. It is idempotent.
//! - [`Simulation::await_termination`] joins every thread and returns a
//!   [`SimulationReport`]. After it returns every fork is free and no gate
//!   permit is outstanding.
//!
//! Dropping a running simulation cancels it but does not join its threads.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::builders::build_table;
use crate::config::SimulationConfig;
use crate::core::{
    CancelToken, EventSink, PhilosopherState, PhilosopherStatus, SimulationError, Table,
    TableSnapshot,
};

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Identifier of the run, also attached to the run's log lines.
    pub run_id: Uuid,
    /// Meals eaten by each philosopher, by index.
    pub meals: Vec<u64>,
    /// Sum of `meals`.
    pub total_meals: u64,
    /// Highest number of gate permits issued at once.
    pub peak_permits: usize,
    /// Gate capacity (N−1).
    pub gate_capacity: usize,
    /// Wall time from start until every thread was joined.
    pub elapsed: Duration,
    /// Philosophers whose thread panicked.
    pub panicked: Vec<usize>,
}

struct Workers {
    philosophers: Vec<(usize, JoinHandle<u64>)>,
    timer: Option<JoinHandle<()>>,
}

impl Workers {
    const fn empty() -> Self {
        Self {
            philosophers: Vec::new(),
            timer: None,
        }
    }
}

/// Join bookkeeping shared with the blocking pool.
///
/// The workers mutex is held for the whole join, so any caller that finds it
/// empty knows the threads are gone and `finished` is set.
struct Termination {
    run_id: Uuid,
    started_at: Instant,
    statuses: Vec<Arc<PhilosopherStatus>>,
    workers: Mutex<Workers>,
    panicked: Mutex<Vec<usize>>,
    finished: Mutex<Option<Duration>>,
}

impl Termination {
    fn join(&self) {
        let mut workers = self.workers.lock();
        let taken = std::mem::replace(&mut *workers, Workers::empty());
        let panicked = join_workers(self.run_id, taken);
        self.panicked.lock().extend(panicked);

        let mut finished = self.finished.lock();
        if finished.is_none() {
            let elapsed = self.started_at.elapsed();
            *finished = Some(elapsed);
            info!(
                run_id = %self.run_id,
                total_meals = self.statuses.iter().map(|s| s.meals()).sum::<u64>(),
                ?elapsed,
                "simulation terminated"
            );
        }
        drop(finished);
        drop(workers);
    }
}

/// A running dining table.
pub struct Simulation {
    run_id: Uuid,
    config: SimulationConfig,
    table: Table,
    cancel: CancelToken,
    statuses: Vec<Arc<PhilosopherStatus>>,
    termination: Arc<Termination>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("run_id", &self.run_id)
            .field("philosophers", &self.config.philosophers)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Seat `config.philosophers` philosophers and start them.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::InvalidConfig`] if the configuration is invalid
    ///   (checked before anything is spawned).
    /// - [`SimulationError::Spawn`] if a thread cannot be created; threads
    ///   already started are cancelled and joined first.
    pub fn start(
        config: SimulationConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, SimulationError> {
        let cancel = CancelToken::new();
        let (table, philosophers) = build_table(&config, &cancel, &sink)?;
        let run_id = Uuid::new_v4();
        let statuses = philosophers.iter().map(|p| p.status()).collect();

        let mut workers = Workers::empty();
        for philosopher in philosophers {
            let id = philosopher.id();
            let name = format!("philosopher-{id}");
            let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
                debug!(%run_id, philosopher = id, "philosopher thread started");
                let meals = philosopher.run();
                debug!(%run_id, philosopher = id, meals, "philosopher thread exiting");
                meals
            });
            match spawned {
                Ok(handle) => workers.philosophers.push((id, handle)),
                Err(source) => {
                    error!(
                        %run_id,
                        philosopher = id,
                        error = %source,
                        "failed to spawn philosopher"
                    );
                    cancel.cancel();
                    join_philosophers(workers.philosophers.drain(..));
                    return Err(SimulationError::Spawn { name, source });
                }
            }
        }

        if let Some(duration) = config.run_duration() {
            let timer_cancel = cancel.clone();
            let spawned = thread::Builder::new()
                .name("simulation-timer".into())
                .spawn(move || {
                    if timer_cancel.sleep(duration).is_ok() {
                        info!(%run_id, ?duration, "run duration elapsed, stopping");
                        timer_cancel.cancel();
                    }
                });
            match spawned {
                Ok(handle) => workers.timer = Some(handle),
                Err(source) => {
                    error!(%run_id, error = %source, "failed to spawn simulation timer");
                    cancel.cancel();
                    join_philosophers(workers.philosophers.drain(..));
                    return Err(SimulationError::Spawn {
                        name: "simulation-timer".into(),
                        source,
                    });
                }
            }
        }

        info!(
            %run_id,
            philosophers = config.philosophers,
            gate_capacity = table.gate().capacity(),
            run_duration_ms = ?config.run_duration_ms,
            "simulation started"
        );

        let termination = Arc::new(Termination {
            run_id,
            started_at: Instant::now(),
            statuses: Vec::clone(&statuses),
            workers: Mutex::new(workers),
            panicked: Mutex::new(Vec::new()),
            finished: Mutex::new(None),
        });

        Ok(Self {
            run_id,
            config,
            table,
            cancel,
            statuses,
            termination,
        })
    }

    /// Start, wait for the configured duration to elapse, and return the report.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start), plus [`SimulationError::InvalidConfig`]
    /// when no run duration is configured, since nothing could stop the run.
    pub fn run(
        config: SimulationConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<SimulationReport, SimulationError> {
        if config.run_duration_ms.is_none() {
            return Err(SimulationError::InvalidConfig(
                "Simulation::run needs a run duration".into(),
            ));
        }
        let simulation = Self::start(config, sink)?;
        Ok(simulation.await_termination())
    }

    /// Broadcast cancellation to every philosopher. Returns `true` for the
    /// call that actually stopped the run.
    pub fn stop(&self) -> bool {
        let stopped = self.cancel.cancel();
        if stopped {
            info!(run_id = %self.run_id, "stop requested");
        }
        stopped
    }

    /// Block until every philosopher has left the table and return the report.
    ///
    /// Does not itself stop the run: without a prior [`stop`](Self::stop) it
    /// waits for the run duration to elapse. Calling it again returns the same
    /// report without blocking.
    pub fn await_termination(&self) -> SimulationReport {
        self.termination.join();
        self.report()
    }

    /// Async variant of [`await_termination`](Self::await_termination) that
    /// joins on tokio's blocking pool instead of the calling thread.
    ///
    /// Dropping the future does not abandon the join: it keeps running on the
    /// blocking pool, and a later `await_termination` waits for it.
    #[cfg(feature = "tokio-runtime")]
    pub async fn await_termination_async(&self) -> SimulationReport {
        let termination = Arc::clone(&self.termination);
        if let Err(e) = tokio::task::spawn_blocking(move || termination.join()).await {
            error!(run_id = %self.run_id, error = %e, "join task failed");
            self.termination.join();
        }
        self.report()
    }

    fn report(&self) -> SimulationReport {
        let meals: Vec<u64> = self.statuses.iter().map(|s| s.meals()).collect();
        let finished = *self.termination.finished.lock();
        SimulationReport {
            run_id: self.run_id,
            total_meals: meals.iter().sum(),
            meals,
            peak_permits: self.table.gate().peak_issued(),
            gate_capacity: self.table.gate().capacity(),
            elapsed: finished.unwrap_or_else(|| self.termination.started_at.elapsed()),
            panicked: self.termination.panicked.lock().clone(),
        }
    }

    /// Consistent view of every fork holder and the gate count.
    #[must_use]
    pub fn snapshot(&self) -> TableSnapshot {
        self.table.snapshot()
    }

    /// Published state of each philosopher, by index.
    #[must_use]
    pub fn states(&self) -> Vec<PhilosopherState> {
        self.statuses.iter().map(|s| s.state()).collect()
    }

    /// Published meal count of each philosopher, by index.
    #[must_use]
    pub fn meals(&self) -> Vec<u64> {
        self.statuses.iter().map(|s| s.meals()).collect()
    }

    /// The table's cancellation signal.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether [`stop`](Self::stop) was called or the run duration elapsed.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The table the philosophers sit at.
    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }

    /// Identifier of this run.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Configuration the run was started with.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        // Cancel but don't join; explicit await_termination() is required for
        // graceful cleanup.
        if self.cancel.cancel() {
            debug!(run_id = %self.run_id, "simulation dropped while running, threads detached");
        }
    }
}

/// Join the timer and every philosopher; returns the ids whose thread panicked.
fn join_workers(run_id: Uuid, workers: Workers) -> Vec<usize> {
    if let Some(timer) = workers.timer {
        if timer.join().is_err() {
            warn!(%run_id, "simulation timer panicked");
        }
    }
    let panicked = join_philosophers(workers.philosophers.into_iter());
    for &id in &panicked {
        warn!(%run_id, philosopher = id, "philosopher thread panicked");
    }
    panicked
}

fn join_philosophers(handles: impl Iterator<Item = (usize, JoinHandle<u64>)>) -> Vec<usize> {
    handles
        .filter_map(|(id, handle)| match handle.join() {
            Ok(meals) => {
                info!(philosopher = id, meals, "philosopher left the table");
                None
            }
            Err(_) => Some(id),
        })
        .collect()
}
