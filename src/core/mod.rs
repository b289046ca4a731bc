//! Core table primitives: cancellation, forks, the admission gate, and philosophers.

pub mod cancel;
pub mod error;
pub mod events;
pub mod fork;
pub mod gate;
pub mod philosopher;
pub mod table;

pub use cancel::{CancelToken, Interrupt};
pub use error::{AppResult, Cancelled, SimulationError};
pub use events::{
    ChannelEventSink, Event, EventKind, EventSink, ForkSide, InMemoryEventLog, NullEventSink,
    TracingEventSink,
};
pub use fork::{Fork, ForkGuard};
pub use gate::{AdmissionGate, GatePermit};
pub use philosopher::{Philosopher, PhilosopherState, PhilosopherStatus};
pub use table::{Seat, Table, TableSnapshot};
