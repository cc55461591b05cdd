// SPDX-License-Identifier: Apache-2.0

//! The native backend seam.
//!
//! Everything this crate needs from the kernel underneath it goes through
//! this module, and nothing else in the crate knows which kernel that is.
//! A backend is selected at compile time through a cargo feature; there is
//! deliberately no runtime dispatch, since a target fixes its kernel at
//! build time.
//!
//! A backend module must export:
//!
//! - `TICK_HZ` and `DELAY_MAX_TICKS`: the tick rate behind [`crate::time`],
//!   and the largest single delay the kernel accepts in one call.
//! - `TaskId`: a trivially copyable, comparable task identity.
//! - `TaskSpec` and `Task`: creation parameters and the native task handle,
//!   with `spawn`/`id`/`join`/`detach`.  `join` may only be called once the
//!   task has signaled completion; `detach` relinquishes the handle while
//!   the task keeps running.  In either case the task itself never frees its
//!   own control block or stack; the holder of the `Task` does.
//! - `Signal`: a binary, edge-triggered, auto-clearing event.  A wait must
//!   complete only on an actual `set`; wakeups without one (spurious wakes,
//!   or a suspend/resume cycle of the waiting task) must leave the wait
//!   pending.
//! - `Semaphore`: a counting semaphore with an upper limit.
//! - `current`, `yield_now`, `delay`, `uptime_ticks`.

use crate::time::Tick;

cfg_if::cfg_if! {
    if #[cfg(feature = "backend-host")] {
        pub mod host;

        /// The selected backend.
        pub use self::host as native;
    } else {
        compile_error!("no native backend selected: enable one of the `backend-*` features");
    }
}

/// Return the current uptime of the system in ticks.
///
/// Precision is limited by the backend's tick timer.
#[inline]
pub fn uptime_get() -> Tick {
    native::uptime_ticks()
}
