//! Counting admission gate bounding how many philosophers may contend for forks.
//!
//! With N philosophers on a ring and capacity N−1, at least one philosopher
//! is always outside the gate holding no fork, so the circular wait needed
//! for deadlock cannot form.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::core::{CancelToken, Cancelled, Interrupt, SimulationError};

/// Permit accounting protected by the gate mutex.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct GateState {
    /// Permits currently handed out.
    pub(crate) issued: usize,
    /// Highest value `issued` has ever reached.
    pub(crate) peak: usize,
    /// Total permits granted since creation.
    pub(crate) admissions: u64,
}

/// Bounded permit pool shared by every philosopher at the table.
pub struct AdmissionGate {
    capacity: usize,
    state: Mutex<GateState>,
    /// Signaled when a permit is returned.
    permit_returned: Condvar,
    cancel: CancelToken,
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = *self.state.lock();
        f.debug_struct("AdmissionGate")
            .field("capacity", &self.capacity)
            .field("issued", &state.issued)
            .field("peak", &state.peak)
            .finish_non_exhaustive()
    }
}

impl AdmissionGate {
    /// Create a gate issuing at most `capacity` concurrent permits.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] when `capacity` is zero,
    /// since nobody could ever enter.
    pub fn new(capacity: usize, cancel: &CancelToken) -> Result<Arc<Self>, SimulationError> {
        if capacity == 0 {
            return Err(SimulationError::InvalidConfig(
                "admission gate capacity must be greater than 0".into(),
            ));
        }
        let gate = Arc::new(Self {
            capacity,
            state: Mutex::new(GateState::default()),
            permit_returned: Condvar::new(),
            cancel: cancel.clone(),
        });
        cancel.register(&gate);
        Ok(gate)
    }

    /// Block until a permit is available and issue it to `philosopher`.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the table is cancelled first. No permit is
    /// issued in that case.
    pub fn enter(self: &Arc<Self>, philosopher: usize) -> Result<GatePermit, Cancelled> {
        let mut state = self.state.lock();
        loop {
            self.cancel.check()?;
            if state.issued < self.capacity {
                break;
            }
            self.permit_returned.wait(&mut state);
        }
        Ok(self.issue(&mut state, philosopher))
    }

    /// Issue a permit only if one is free right now.
    pub fn try_enter(self: &Arc<Self>, philosopher: usize) -> Option<GatePermit> {
        let mut state = self.state.lock();
        if state.issued >= self.capacity {
            return None;
        }
        Some(self.issue(&mut state, philosopher))
    }

    fn issue(self: &Arc<Self>, state: &mut GateState, philosopher: usize) -> GatePermit {
        state.issued += 1;
        state.peak = state.peak.max(state.issued);
        state.admissions += 1;
        GatePermit {
            gate: Arc::clone(self),
            philosopher,
        }
    }

    fn leave(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.issued > 0, "permit returned to an empty gate");
        state.issued = state.issued.saturating_sub(1);
        drop(state);
        self.permit_returned.notify_one();
    }

    /// Fixed number of permits.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently issued.
    #[must_use]
    pub fn issued(&self) -> usize {
        self.state.lock().issued
    }

    /// Highest number of permits ever issued at once.
    #[must_use]
    pub fn peak_issued(&self) -> usize {
        self.state.lock().peak
    }

    /// Total permits granted since creation.
    #[must_use]
    pub fn admissions(&self) -> u64 {
        self.state.lock().admissions
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock()
    }
}

impl Interrupt for AdmissionGate {
    fn interrupt(&self) {
        let _state = self.state.lock();
        self.permit_returned.notify_all();
    }
}

/// A permit issued by the [`AdmissionGate`]. Dropping it returns the permit.
#[must_use = "dropping the permit leaves the gate immediately"]
pub struct GatePermit {
    gate: Arc<AdmissionGate>,
    philosopher: usize,
}

impl GatePermit {
    /// Philosopher holding this permit.
    #[must_use]
    pub const fn philosopher(&self) -> usize {
        self.philosopher
    }

    /// Return the permit to the gate.
    pub fn leave(self) {
        drop(self);
    }
}

impl std::fmt::Debug for GatePermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatePermit")
            .field("philosopher", &self.philosopher)
            .finish_non_exhaustive()
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.leave();
    }
}
