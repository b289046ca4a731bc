//! Cooperative, broadcast cancellation.
//!
//! A [`CancelToken`] is shared by every philosopher and every resource of a
//! table. Cancelling it:
//!
//! 1. sets the flag (visible to all later checks),
//! 2. wakes threads sleeping in [`CancelToken::sleep`] / [`CancelToken::wait`],
//! 3. interrupts every registered resource so threads parked on a fork or on
//!    the admission gate re-check the flag.
//!
//! Resources check the flag while holding the same mutex their
//! [`Interrupt::interrupt`] implementation takes before notifying, so a waiter
//! can never miss the wake-up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::Cancelled;

/// A resource that parks threads and must wake them on cancellation.
pub trait Interrupt: Send + Sync {
    /// Wake every thread currently parked on this resource.
    fn interrupt(&self);
}

struct Inner {
    cancelled: AtomicBool,
    sleep_lock: Mutex<()>,
    sleepers: Condvar,
    listeners: Mutex<Vec<Weak<dyn Interrupt>>>,
}

/// Shared cancellation signal. Cloning yields another handle to the same signal.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                sleep_lock: Mutex::new(()),
                sleepers: Condvar::new(),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether the signal has been broadcast.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(Cancelled)` if the signal has been broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once [`cancel`](Self::cancel) has been called.
    #[inline]
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Broadcast cancellation. Returns `true` only for the call that actually
    /// flipped the flag; later calls are no-ops.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }

        {
            let _guard = self.inner.sleep_lock.lock();
            self.inner.sleepers.notify_all();
        }

        let listeners = std::mem::take(&mut *self.inner.listeners.lock());
        for listener in listeners.iter().filter_map(Weak::upgrade) {
            listener.interrupt();
        }
        true
    }

    /// Register a resource whose waiters must be woken on cancellation.
    ///
    /// The token only keeps a weak reference, so resources are free to hold a
    /// clone of the token without creating a cycle.
    pub fn register<T>(&self, listener: &Arc<T>)
    where
        T: Interrupt + 'static,
    {
        let weak: Weak<dyn Interrupt> = Arc::downgrade(listener) as Weak<dyn Interrupt>;
        let mut listeners = self.inner.listeners.lock();
        if self.is_cancelled() {
            drop(listeners);
            listener.interrupt();
            return;
        }
        listeners.retain(|l| l.strong_count() > 0);
        listeners.push(weak);
    }

    /// Sleep for `duration`, returning early with `Err(Cancelled)` if the
    /// signal is broadcast before or during the wait.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the token is or becomes cancelled.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        let deadline = Instant::now() + duration;
        let mut guard = self.inner.sleep_lock.lock();
        while !self.is_cancelled() {
            if self
                .inner
                .sleepers
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                break;
            }
        }
        drop(guard);
        self.check()
    }

    /// Block until the signal is broadcast.
    pub fn wait(&self) {
        let mut guard = self.inner.sleep_lock.lock();
        while !self.is_cancelled() {
            self.inner.sleepers.wait(&mut guard);
        }
    }
}
