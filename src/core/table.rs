//! The ring of forks and the admission gate shared by every philosopher.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{AdmissionGate, CancelToken, Fork, SimulationError};

/// The resources one philosopher is bound to.
#[derive(Debug, Clone)]
pub struct Seat {
    /// Philosopher index.
    pub philosopher: usize,
    /// Fork `philosopher`.
    pub left: Arc<Fork>,
    /// Fork `(philosopher + 1) mod N`.
    pub right: Arc<Fork>,
    /// Shared admission gate.
    pub gate: Arc<AdmissionGate>,
}

/// Resource state read at a single instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Holder of each fork, by ring index.
    pub fork_holders: Vec<Option<usize>>,
    /// Gate permits issued at the instant of the snapshot.
    pub permits_issued: usize,
    /// Gate capacity.
    pub gate_capacity: usize,
}

impl TableSnapshot {
    /// Whether every fork is free and no permit is outstanding.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.permits_issued == 0 && self.fork_holders.iter().all(Option::is_none)
    }

    /// Distinct philosophers holding at least one fork.
    #[must_use]
    pub fn fork_holding_philosophers(&self) -> usize {
        let mut holders: Vec<usize> = self.fork_holders.iter().flatten().copied().collect();
        holders.sort_unstable();
        holders.dedup();
        holders.len()
    }
}

/// N forks arranged in a ring plus one gate of capacity N−1.
#[derive(Debug)]
pub struct Table {
    forks: Vec<Arc<Fork>>,
    gate: Arc<AdmissionGate>,
    cancel: CancelToken,
}

impl Table {
    /// Lay out `philosophers` forks and a gate of capacity `philosophers - 1`,
    /// all bound to `cancel`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] for fewer than two seats.
    pub fn new(philosophers: usize, cancel: &CancelToken) -> Result<Self, SimulationError> {
        if philosophers < 2 {
            return Err(SimulationError::InvalidConfig(format!(
                "a table needs at least 2 philosophers, got {philosophers}"
            )));
        }
        let forks = (0..philosophers).map(|i| Fork::new(i, cancel)).collect();
        let gate = AdmissionGate::new(philosophers - 1, cancel)?;
        Ok(Self {
            forks,
            gate,
            cancel: cancel.clone(),
        })
    }

    /// Number of seats (and forks).
    #[must_use]
    pub fn len(&self) -> usize {
        self.forks.len()
    }

    /// Always false: a table has at least two seats.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forks.is_empty()
    }

    /// Fork `index`.
    #[must_use]
    pub fn fork(&self, index: usize) -> Option<&Arc<Fork>> {
        self.forks.get(index)
    }

    /// All forks in ring order.
    #[must_use]
    pub fn forks(&self) -> &[Arc<Fork>] {
        &self.forks
    }

    /// The shared admission gate.
    #[must_use]
    pub const fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    /// The token every resource at this table observes.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Seat for `philosopher`: left fork `i`, right fork `(i + 1) mod N`.
    ///
    /// # Panics
    ///
    /// Panics if `philosopher` is not a seat at this table.
    #[must_use]
    pub fn seat(&self, philosopher: usize) -> Seat {
        let n = self.forks.len();
        assert!(philosopher < n, "no seat {philosopher} at a table of {n}");
        Seat {
            philosopher,
            left: Arc::clone(&self.forks[philosopher]),
            right: Arc::clone(&self.forks[(philosopher + 1) % n]),
            gate: Arc::clone(&self.gate),
        }
    }

    /// Read every fork holder and the gate count at one instant.
    ///
    /// All fork locks are taken in ring order, then the gate lock. No
    /// philosopher ever holds one of these locks while waiting for another,
    /// so this cannot deadlock with the table.
    #[must_use]
    pub fn snapshot(&self) -> TableSnapshot {
        let holders: Vec<_> = self.forks.iter().map(|f| f.lock_holder()).collect();
        let gate = self.gate.lock_state();
        TableSnapshot {
            fork_holders: holders.iter().map(|h| **h).collect(),
            permits_issued: gate.issued,
            gate_capacity: self.gate.capacity(),
        }
    }
}
