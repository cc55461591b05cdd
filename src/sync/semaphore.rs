// SPDX-License-Identifier: Apache-2.0

//! Counting semaphore support.
//!
//! A thin portable wrapper over the backend's counting semaphore.  These are
//! counting semaphores with both an upper and a lower bound on the count;
//! note that a `give` at the maximum count is discarded, which in situations
//! where exact counting matters will make the count come out wrong.

use core::fmt;

use crate::error::Result;
use crate::sys::native;
use crate::time::Timeout;

/// A count limit that is effectively "no limit".
pub const MAX_LIMIT: u32 = u32::MAX;

/// A counting semaphore.
pub struct Semaphore {
    inner: native::Semaphore,
}

impl Semaphore {
    /// Construct a semaphore with the given initial count and count limit.
    ///
    /// Panics if `initial` exceeds `limit`.
    pub const fn new(initial: u32, limit: u32) -> Semaphore {
        Semaphore {
            inner: native::Semaphore::new(initial, limit),
        }
    }

    /// Take the semaphore.
    ///
    /// Blocks per `timeout`: a [`Duration`] bounds the wait, [`Forever`]
    /// waits indefinitely, and [`NoWait`] fails immediately with
    /// [`Error::WouldBlock`] when the count is zero.  A bounded wait that
    /// expires returns [`Error::TimedOut`].
    ///
    /// [`Duration`]: crate::time::Duration
    /// [`Forever`]: crate::time::Forever
    /// [`NoWait`]: crate::time::NoWait
    /// [`Error::WouldBlock`]: crate::Error::WouldBlock
    /// [`Error::TimedOut`]: crate::Error::TimedOut
    pub fn take<T>(&self, timeout: T) -> Result<()>
    where
        T: Into<Timeout>,
    {
        let timeout: Timeout = timeout.into();
        self.inner.take(timeout.0)
    }

    /// Give the semaphore, unless it is already at its maximum permitted
    /// count.
    pub fn give(&self) {
        self.inner.give();
    }

    /// Reset the count to zero.
    ///
    /// Any outstanding [`take`] calls are aborted with [`Error::Reset`].
    ///
    /// [`take`]: Semaphore::take
    /// [`Error::Reset`]: crate::Error::Reset
    pub fn reset(&self) {
        self.inner.reset();
    }

    /// The current count.
    pub fn count(&self) -> u32 {
        self.inner.count()
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sync::Semaphore")
    }
}
