//! One-shot thread notification.

use core::fmt;

use crate::sys::native;
use crate::time::{now, Duration, Instant};

/// A binary, edge-triggered, auto-clearing signal between two threads.
///
/// [`release`] records the event and wakes at most one blocked waiter;
/// [`acquire`] blocks until the event is recorded and consumes it as part of
/// waking.  Single-producer/single-consumer usage is assumed and required:
/// at most one thread may wait on a given notification at a time.
///
/// Suspending and resuming a blocked waiter does not fabricate a release;
/// the wait completes only on an actual [`release`].
///
/// This is the same primitive the thread layer uses for its join handshake,
/// exposed for general handoff patterns (a drain thread waking on "new entry
/// available", and the like).
///
/// [`release`]: Notification::release
/// [`acquire`]: Notification::acquire
pub struct Notification {
    signal: native::Signal,
}

impl Notification {
    /// Construct a new, unsignaled notification.
    pub const fn new() -> Notification {
        Notification {
            signal: native::Signal::new(),
        }
    }

    /// Record the event, waking the waiter if there is one.
    ///
    /// Releasing an already released notification is allowed and has no
    /// additional effect; the event is binary.
    pub fn release(&self) {
        self.signal.set();
    }

    /// Block until the event is recorded, consuming it.
    pub fn acquire(&self) {
        self.signal.wait();
    }

    /// Consume the event if it is already recorded, without blocking.
    pub fn try_acquire(&self) -> bool {
        self.signal.wait_for(0)
    }

    /// Block until the event is recorded or `timeout` elapses.
    ///
    /// Returns true if the event was consumed.  A timeout does not consume a
    /// future release.
    pub fn try_acquire_for(&self, timeout: Duration) -> bool {
        self.signal.wait_for(timeout.ticks())
    }

    /// Block until the event is recorded or `deadline` passes.
    ///
    /// A deadline that is not in the future degenerates to [`try_acquire`].
    ///
    /// [`try_acquire`]: Notification::try_acquire
    pub fn try_acquire_until(&self, deadline: Instant) -> bool {
        let current = now();
        if deadline <= current {
            self.try_acquire()
        } else {
            self.try_acquire_for(deadline - current)
        }
    }
}

impl Default for Notification {
    fn default() -> Notification {
        Notification::new()
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sync::Notification")
    }
}
