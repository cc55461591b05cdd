// SPDX-License-Identifier: Apache-2.0

//! Time types for the thread and synchronization layers.
//!
//! Time in this crate is tick based, with the tick rate fixed by the selected
//! backend ([`TICK_HZ`]).  The [`Duration`] and [`Instant`] types come from
//! the `fugit` crate, which gives unit-safe arithmetic over ticks without
//! pulling in a clock of its own; [`now`] reads the backend's uptime counter.
//!
//! Blocking operations take an `impl Into<Timeout>` argument.  [`Timeout`]
//! carries a tick count with two reserved values, which can be given by the
//! [`Forever`] and [`NoWait`] markers the way the native kernels spell their
//! sentinel timeouts.

use crate::sys;
pub use crate::sys::native::TICK_HZ;

/// The underlying tick count type.
pub type Tick = u64;

/// A tick-based duration, at the backend's tick rate.
pub type Duration = fugit::Duration<Tick, 1, TICK_HZ>;

/// A tick-based point in time, measured against the backend's uptime counter.
pub type Instant = fugit::Instant<Tick, 1, TICK_HZ>;

/// Return the current uptime.
///
/// Precision is limited by the backend's tick timer.
pub fn now() -> Instant {
    Instant::from_ticks(sys::uptime_get())
}

/// A timeout for blocking operations.
///
/// Negative values mean "wait forever", zero means "do not wait"; anything
/// else is a tick count.  Build these from a [`Duration`], [`Forever`], or
/// [`NoWait`] via `Into`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Timeout(pub(crate) i64);

/// A timeout that waits as long as necessary for the operation to complete.
pub struct Forever;

/// A null timeout; the operation fails immediately if it cannot complete.
pub struct NoWait;

impl From<Forever> for Timeout {
    fn from(_: Forever) -> Timeout {
        Timeout(-1)
    }
}

impl From<NoWait> for Timeout {
    fn from(_: NoWait) -> Timeout {
        Timeout(0)
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Timeout {
        Timeout(duration.ticks() as i64)
    }
}
