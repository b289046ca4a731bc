//! Per-philosopher state machine.
//!
//! Each philosopher runs on its own thread and cycles
//!
//! ```text
//! Thinking -> AwaitingGate -> AwaitingLeftFork -> AwaitingRightFork
//!          -> Eating -> Releasing -> Thinking
//! ```
//!
//! until the table's [`CancelToken`] fires, at which point it moves to
//! `Cancelled` from wherever it is. Everything acquired during a cycle lives in
//! [`Held`] as scoped guards, so whatever path leads to `Cancelled` (including a
//! panic) the forks and the gate permit go back to the table.
//!
//! Forks are always taken left, then right. Deadlock freedom comes from the
//! gate admitting at most N−1 philosophers, not from fork ordering.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DelayRange;
use crate::core::{
    CancelToken, Cancelled, Event, EventKind, EventSink, ForkGuard, ForkSide, GatePermit, Seat,
    SimulationError,
};

/// Where a philosopher is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PhilosopherState {
    /// Working independently; holds nothing.
    Thinking = 0,
    /// Waiting for an admission permit.
    AwaitingGate = 1,
    /// Holding a permit, waiting for the left fork.
    AwaitingLeftFork = 2,
    /// Holding a permit and the left fork, waiting for the right fork.
    AwaitingRightFork = 3,
    /// Holding both forks and a permit.
    Eating = 4,
    /// Putting everything back.
    Releasing = 5,
    /// Terminal: observed cancellation and holds nothing.
    Cancelled = 6,
}

impl PhilosopherState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Thinking,
            1 => Self::AwaitingGate,
            2 => Self::AwaitingLeftFork,
            3 => Self::AwaitingRightFork,
            4 => Self::Eating,
            5 => Self::Releasing,
            _ => Self::Cancelled,
        }
    }
}

impl fmt::Display for PhilosopherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Thinking => "thinking",
            Self::AwaitingGate => "awaiting gate",
            Self::AwaitingLeftFork => "awaiting left fork",
            Self::AwaitingRightFork => "awaiting right fork",
            Self::Eating => "eating",
            Self::Releasing => "releasing",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Read-only view of a philosopher published for observers.
///
/// Only the owning philosopher writes; the meal counter it publishes is a copy
/// of its task-local counter.
#[derive(Debug)]
pub struct PhilosopherStatus {
    state: AtomicU8,
    meals: AtomicU64,
}

impl Default for PhilosopherStatus {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(PhilosopherState::Thinking as u8),
            meals: AtomicU64::new(0),
        }
    }
}

impl PhilosopherStatus {
    /// Last published state.
    #[must_use]
    pub fn state(&self) -> PhilosopherState {
        PhilosopherState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Last published meal count.
    #[must_use]
    pub fn meals(&self) -> u64 {
        self.meals.load(Ordering::Acquire)
    }

    fn set_state(&self, state: PhilosopherState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn set_meals(&self, meals: u64) {
        self.meals.store(meals, Ordering::Release);
    }
}

/// Resources acquired during the current cycle.
///
/// Fields drop in declaration order: right fork, left fork, then the permit,
/// so the gate slot frees only after both forks are back.
#[derive(Default)]
struct Held {
    right: Option<ForkGuard>,
    left: Option<ForkGuard>,
    permit: Option<GatePermit>,
}

impl Held {
    const fn is_empty(&self) -> bool {
        self.right.is_none() && self.left.is_none() && self.permit.is_none()
    }

    fn release_all(mut self) {
        if let Some(right) = self.right.take() {
            right.release();
        }
        if let Some(left) = self.left.take() {
            left.release();
        }
        if let Some(permit) = self.permit.take() {
            permit.leave();
        }
    }
}

/// One agent at the table.
pub struct Philosopher {
    seat: Seat,
    cancel: CancelToken,
    think: DelayRange,
    eat: DelayRange,
    rng: StdRng,
    sink: Arc<dyn EventSink>,
    status: Arc<PhilosopherStatus>,
    meals: u64,
}

impl fmt::Debug for Philosopher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Philosopher")
            .field("id", &self.seat.philosopher)
            .field("left", &self.seat.left.index())
            .field("right", &self.seat.right.index())
            .field("meals", &self.meals)
            .finish_non_exhaustive()
    }
}

impl Philosopher {
    /// Seat a philosopher. `rng` drives the think and eat delays.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] if either delay range is
    /// inverted.
    pub fn new(
        seat: Seat,
        cancel: CancelToken,
        think: DelayRange,
        eat: DelayRange,
        rng: StdRng,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, SimulationError> {
        think
            .validate()
            .map_err(|e| SimulationError::InvalidConfig(format!("think: {e}")))?;
        eat.validate()
            .map_err(|e| SimulationError::InvalidConfig(format!("eat: {e}")))?;
        Ok(Self {
            seat,
            cancel,
            think,
            eat,
            rng,
            sink,
            status: Arc::new(PhilosopherStatus::default()),
            meals: 0,
        })
    }

    /// Philosopher index.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.seat.philosopher
    }

    /// Handle to the published status.
    #[must_use]
    pub fn status(&self) -> Arc<PhilosopherStatus> {
        Arc::clone(&self.status)
    }

    /// Run the cycle until cancelled. Returns the number of meals eaten.
    ///
    /// On return nothing acquired by this philosopher is still held.
    pub fn run(mut self) -> u64 {
        let mut held = Held::default();
        let mut state = PhilosopherState::Thinking;
        while state != PhilosopherState::Cancelled {
            self.status.set_state(state);
            state = self.step(state, &mut held);
        }
        self.unwind(held);
        self.status.set_state(PhilosopherState::Cancelled);
        self.meals
    }

    fn step(&mut self, state: PhilosopherState, held: &mut Held) -> PhilosopherState {
        use PhilosopherState as S;

        let id = self.id();
        match state {
            S::Thinking => {
                if self.cancel.is_cancelled() {
                    return S::Cancelled;
                }
                self.emit(EventKind::ThinkingStarted);
                let delay = self.draw(self.think);
                match self.cancel.sleep(delay) {
                    Ok(()) => S::AwaitingGate,
                    Err(Cancelled) => S::Cancelled,
                }
            }
            S::AwaitingGate => match self.seat.gate.enter(id) {
                Ok(permit) => {
                    held.permit = Some(permit);
                    self.emit(EventKind::Admitted);
                    S::AwaitingLeftFork
                }
                Err(Cancelled) => S::Cancelled,
            },
            S::AwaitingLeftFork => match self.seat.left.acquire(id) {
                Ok(fork) => {
                    let index = fork.index();
                    held.left = Some(fork);
                    self.emit(EventKind::ForkAcquired {
                        side: ForkSide::Left,
                        fork: index,
                    });
                    S::AwaitingRightFork
                }
                Err(Cancelled) => S::Cancelled,
            },
            S::AwaitingRightFork => match self.seat.right.acquire(id) {
                Ok(fork) => {
                    let index = fork.index();
                    held.right = Some(fork);
                    self.emit(EventKind::ForkAcquired {
                        side: ForkSide::Right,
                        fork: index,
                    });
                    S::Eating
                }
                Err(Cancelled) => S::Cancelled,
            },
            S::Eating => {
                self.meals += 1;
                self.status.set_meals(self.meals);
                self.emit(EventKind::EatingStarted { meal: self.meals });
                let delay = self.draw(self.eat);
                if self.cancel.sleep(delay).is_err() {
                    debug!(philosopher = id, meal = self.meals, "cancelled mid-meal");
                }
                S::Releasing
            }
            S::Releasing => {
                self.emit(EventKind::ForksReleased);
                std::mem::take(held).release_all();
                if self.cancel.is_cancelled() {
                    S::Cancelled
                } else {
                    S::Thinking
                }
            }
            S::Cancelled => S::Cancelled,
        }
    }

    fn unwind(&self, held: Held) {
        if !held.is_empty() {
            debug!(
                philosopher = self.id(),
                left = held.left.is_some(),
                right = held.right.is_some(),
                permit = held.permit.is_some(),
                "cancelled mid-acquisition, releasing"
            );
            self.emit(EventKind::ForksReleased);
            held.release_all();
        }
        self.emit(EventKind::Cancelled { meals: self.meals });
    }

    fn draw(&mut self, range: DelayRange) -> Duration {
        Duration::from_millis(self.rng.random_range(range.min_ms..=range.max_ms))
    }

    fn emit(&self, kind: EventKind) {
        self.sink.record(Event::now(self.id(), kind));
    }
}
