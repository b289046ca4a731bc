//! Event sinks for the philosopher event log.
//!
//! Philosophers report every state transition to an [`EventSink`]. Sinks are
//! shared by all philosophers, so `record` takes `&self` and implementations
//! serialize internally. The order in which a sink receives events is the
//! order of the log.

use std::collections::VecDeque;
use std::fmt;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;

/// Which of a philosopher's two forks an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForkSide {
    /// Fork `i` for philosopher `i`.
    Left,
    /// Fork `(i + 1) mod N` for philosopher `i`.
    Right,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EventKind {
    /// Started a think phase.
    ThinkingStarted,
    /// Received a permit from the admission gate.
    Admitted,
    /// Took a fork.
    ForkAcquired {
        /// Left or right fork.
        side: ForkSide,
        /// Ring index of the fork.
        fork: usize,
    },
    /// Started eating; `meal` is the philosopher's meal counter after increment.
    EatingStarted {
        /// Meal number, starting at 1.
        meal: u64,
    },
    /// About to put down every held fork and return the gate permit.
    ForksReleased,
    /// Observed cancellation and left the table holding nothing.
    Cancelled {
        /// Meals eaten over the whole run.
        meals: u64,
    },
}

/// A timestamped event from one philosopher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Philosopher index.
    pub philosopher: usize,
    /// What happened.
    #[serde(flatten)]
    pub kind: EventKind,
    /// Milliseconds since the Unix epoch, taken when the event happened.
    ///
    /// Events are stamped before they reach a sink, so across philosophers
    /// raw stamps may run slightly backwards in sink order.
    /// [`InMemoryEventLog`] clamps them so its log is non-decreasing.
    pub at_ms: u64,
}

impl Event {
    /// Build an event stamped with the current time.
    #[must_use]
    pub fn now(philosopher: usize, kind: EventKind) -> Self {
        Self {
            philosopher,
            kind,
            at_ms: now_ms(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.philosopher;
        match self.kind {
            EventKind::ThinkingStarted => write!(f, "philosopher {p} is thinking"),
            EventKind::Admitted => write!(f, "philosopher {p} was admitted to the table"),
            EventKind::ForkAcquired { side, fork } => {
                let side = match side {
                    ForkSide::Left => "left",
                    ForkSide::Right => "right",
                };
                write!(f, "philosopher {p} picked up the {side} fork ({fork})")
            }
            EventKind::EatingStarted { meal } => {
                write!(f, "philosopher {p} is eating (meal #{meal})")
            }
            EventKind::ForksReleased => write!(f, "philosopher {p} put down the forks"),
            EventKind::Cancelled { meals } => {
                write!(f, "philosopher {p} stopped after {meals} meals")
            }
        }
    }
}

/// Event sink abstraction.
pub trait EventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: Event);
}

/// Bounded in-memory event log for tests and inspection.
///
/// Timestamps are non-decreasing in log order. When full, the oldest events
/// are evicted and counted in [`evicted`](Self::evicted).
pub struct InMemoryEventLog {
    inner: Mutex<LogBuffer>,
    max_events: usize,
}

struct LogBuffer {
    events: VecDeque<Event>,
    evicted: u64,
    last_at_ms: u64,
}

impl InMemoryEventLog {
    /// Create a log that keeps at most `max_events` events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            inner: Mutex::new(LogBuffer {
                events: VecDeque::with_capacity(max_events.min(4096)),
                evicted: 0,
                last_at_ms: 0,
            }),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.iter().cloned().collect()
    }

    /// Events dropped because the buffer was full.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.inner.lock().evicted
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for InMemoryEventLog {
    fn record(&self, mut event: Event) {
        let mut inner = self.inner.lock();
        event.at_ms = event.at_ms.max(inner.last_at_ms);
        inner.last_at_ms = event.at_ms;
        if self.max_events == 0 {
            inner.evicted += 1;
            return;
        }
        if inner.events.len() >= self.max_events {
            inner.events.pop_front();
            inner.evicted += 1;
        }
        inner.events.push_back(event);
    }
}

/// Console presentation of the event log through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: Event) {
        tracing::info!(
            philosopher = event.philosopher,
            at_ms = event.at_ms,
            "{event}"
        );
    }
}

/// Streams events over a crossbeam channel to a separate consumer.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: Sender<Event>,
}

impl ChannelEventSink {
    /// Create an unbounded sink and the receiver that drains it.
    #[must_use]
    pub fn unbounded() -> (Self, Receiver<Event>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn record(&self, event: Event) {
        // A dropped receiver means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn record(&self, _event: Event) {}
}
