//! Binary mutual-exclusion resource shared by two neighbouring philosophers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::core::{CancelToken, Cancelled, Interrupt};

/// A fork on the table.
///
/// At most one philosopher holds a fork at a time. [`Fork::acquire`] parks the
/// caller until the fork is free and hands back a [`ForkGuard`]; the fork is
/// released when the guard is released or dropped, on every exit path.
pub struct Fork {
    index: usize,
    /// Current holder, `None` when the fork is on the table.
    holder: Mutex<Option<usize>>,
    available: Condvar,
    acquisitions: AtomicU64,
    cancel: CancelToken,
}

impl std::fmt::Debug for Fork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fork")
            .field("index", &self.index)
            .field("holder", &self.holder())
            .finish_non_exhaustive()
    }
}

impl Fork {
    /// Create fork `index`, bound to `cancel` so that waiting acquirers wake
    /// up when the table shuts down.
    #[must_use]
    pub fn new(index: usize, cancel: &CancelToken) -> Arc<Self> {
        let fork = Arc::new(Self {
            index,
            holder: Mutex::new(None),
            available: Condvar::new(),
            acquisitions: AtomicU64::new(0),
            cancel: cancel.clone(),
        });
        cancel.register(&fork);
        fork
    }

    /// Position of this fork on the ring.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Block until the fork is free, then take it on behalf of `philosopher`.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the table is cancelled before the fork could
    /// be taken. The fork state is left untouched in that case.
    pub fn acquire(self: &Arc<Self>, philosopher: usize) -> Result<ForkGuard, Cancelled> {
        let mut holder = self.holder.lock();
        loop {
            self.cancel.check()?;
            if holder.is_none() {
                break;
            }
            self.available.wait(&mut holder);
        }
        *holder = Some(philosopher);
        drop(holder);

        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        Ok(ForkGuard {
            fork: Arc::clone(self),
            philosopher,
        })
    }

    /// Take the fork only if it is free right now.
    pub fn try_acquire(self: &Arc<Self>, philosopher: usize) -> Option<ForkGuard> {
        let mut holder = self.holder.lock();
        if holder.is_some() {
            return None;
        }
        *holder = Some(philosopher);
        drop(holder);

        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        Some(ForkGuard {
            fork: Arc::clone(self),
            philosopher,
        })
    }

    /// Philosopher currently holding the fork.
    #[must_use]
    pub fn holder(&self) -> Option<usize> {
        *self.holder.lock()
    }

    /// Whether someone holds the fork.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.holder.lock().is_some()
    }

    /// Total successful acquisitions since creation.
    #[must_use]
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Lock the holder slot; used to take consistent multi-resource snapshots.
    pub(crate) fn lock_holder(&self) -> MutexGuard<'_, Option<usize>> {
        self.holder.lock()
    }

    fn release(&self, philosopher: usize) {
        let mut holder = self.holder.lock();
        debug_assert_eq!(*holder, Some(philosopher), "fork released by non-holder");
        *holder = None;
        drop(holder);
        self.available.notify_one();
    }
}

impl Interrupt for Fork {
    fn interrupt(&self) {
        let _holder = self.holder.lock();
        self.available.notify_all();
    }
}

/// Proof of holding a fork. Dropping it puts the fork back on the table.
#[must_use = "dropping the guard releases the fork immediately"]
pub struct ForkGuard {
    fork: Arc<Fork>,
    philosopher: usize,
}

impl ForkGuard {
    /// Index of the held fork.
    #[must_use]
    pub fn index(&self) -> usize {
        self.fork.index
    }

    /// Philosopher holding the fork.
    #[must_use]
    pub const fn philosopher(&self) -> usize {
        self.philosopher
    }

    /// Put the fork back on the table.
    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for ForkGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForkGuard")
            .field("fork", &self.fork.index)
            .field("philosopher", &self.philosopher)
            .finish()
    }
}

impl Drop for ForkGuard {
    fn drop(&mut self) {
        self.fork.release(self.philosopher);
    }
}
