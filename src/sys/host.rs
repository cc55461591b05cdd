// SPDX-License-Identifier: Apache-2.0

//! The host backend.
//!
//! Maps the backend contract onto `std::thread` and the std synchronization
//! primitives, so the portable layer can be exercised anywhere a hosted Rust
//! target exists.  Threads are created named and with the requested stack
//! size; the scheduler knobs in [`TaskSpec`] have no host equivalent (the OS
//! schedules std threads) and are accepted only so that creation options are
//! uniform across backends.
//!
//! The "finished task parks itself and is deleted by the joining party"
//! dance that RTOS backends need collapses here into std's own join
//! semantics, which preserve the governing rule: a finishing thread never
//! frees its own control block or stack.

use std::sync::{Condvar, Mutex, OnceLock};
use std::thread;
use std::time::{Duration as StdDuration, Instant as StdInstant};

use crate::error::{Error, Result};

/// Tick frequency of this backend.  One tick per millisecond.
pub const TICK_HZ: u32 = 1000;

/// The largest single delay accepted in one `delay` call.
///
/// The host could sleep arbitrarily long, but the portable sleep loop is
/// written against kernels with a 32-bit tick argument, so the same bound is
/// used here.
pub const DELAY_MAX_TICKS: u64 = u32::MAX as u64;

const US_PER_TICK: u64 = 1_000_000 / TICK_HZ as u64;

fn ticks_to_std(ticks: u64) -> StdDuration {
    StdDuration::from_micros(ticks.saturating_mul(US_PER_TICK))
}

/// The native task identity.  Trivially copyable and comparable.
pub type TaskId = thread::ThreadId;

/// Creation parameters for a native task, built from `thread::Options`.
pub struct TaskSpec<'a> {
    /// Name given to the native thread.
    pub name: &'a str,
    /// Requested stack size in bytes; zero means the backend default.
    pub stack_size: usize,
    /// Scheduling priority, in backend-native terms.  Ignored on the host.
    pub priority: i32,
    /// Round-robin time slice in ticks, where the kernel supports one.
    /// Ignored on the host.
    pub time_slice_ticks: Option<u64>,
    /// Preemption-threshold ceiling, where the kernel supports one.  Ignored
    /// on the host.
    pub preempt_threshold: Option<i32>,
}

/// A handle to a live native task.
pub struct Task {
    handle: thread::JoinHandle<()>,
    id: TaskId,
}

impl Task {
    /// Create and start a native task running `entry`.
    pub fn spawn(spec: &TaskSpec<'_>, entry: Box<dyn FnOnce() + Send + 'static>) -> Result<Task> {
        let _ = (spec.priority, spec.time_slice_ticks, spec.preempt_threshold);
        let mut builder = thread::Builder::new().name(spec.name.to_string());
        if spec.stack_size > 0 {
            builder = builder.stack_size(spec.stack_size);
        }
        let handle = builder.spawn(entry).map_err(|_| Error::NoResources)?;
        let id = handle.thread().id();
        Ok(Task { handle, id })
    }

    /// The identity of this task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Wait for the task to exit and release its native resources.
    pub fn join(self) {
        // Entry panics are contained by the portable layer's trampoline; a
        // residual Err here means the thread died outside of it.
        let _ = self.handle.join();
    }

    /// Relinquish the handle, leaving the task to run to completion on its
    /// own.
    pub fn detach(self) {
        drop(self.handle);
    }
}

/// The identity of the calling task.
pub fn current() -> TaskId {
    thread::current().id()
}

/// Give up the remainder of the current time slice.
pub fn yield_now() {
    thread::yield_now();
}

/// Block the calling task for `ticks` ticks.
pub fn delay(ticks: u64) {
    thread::sleep(ticks_to_std(ticks));
}

/// Ticks elapsed since the backend clock started.
///
/// On the host the clock starts at first use, which is no later than the
/// first thing in the process that asks for the time.
pub fn uptime_ticks() -> u64 {
    static EPOCH: OnceLock<StdInstant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(StdInstant::now);
    epoch.elapsed().as_micros() as u64 / US_PER_TICK
}

/// A binary, edge-triggered, auto-clearing event.
///
/// `set` records the event and wakes at most one waiter; a wait consumes the
/// event as part of waking.  Single-consumer usage is assumed: at most one
/// task may wait on a given signal at a time.
pub struct Signal {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    /// Construct a new, clear signal.
    pub const fn new() -> Signal {
        Signal {
            flag: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Record the event and wake at most one waiter.
    pub fn set(&self) {
        // The lock scopes in here are tiny and panic-free, so poisoning
        // cannot be observed.
        let mut flag = self.flag.lock().unwrap();
        *flag = true;
        self.cond.notify_one();
    }

    /// Clear the event without waking anyone.
    pub fn reset(&self) {
        *self.flag.lock().unwrap() = false;
    }

    /// Block until the event is recorded, consuming it.
    pub fn wait(&self) {
        let mut flag = self.flag.lock().unwrap();
        // Re-check on every wake: a wakeup with the flag still clear (a
        // spurious wake, or a suspend/resume cycle of this task) must not
        // complete the wait.
        while !*flag {
            flag = self.cond.wait(flag).unwrap();
        }
        *flag = false;
    }

    /// Block until the event is recorded or `ticks` ticks elapse.
    ///
    /// Returns true if the event was consumed.  On timeout no future `set`
    /// is consumed.
    pub fn wait_for(&self, ticks: u64) -> bool {
        let deadline = StdInstant::now() + ticks_to_std(ticks);
        let mut flag = self.flag.lock().unwrap();
        while !*flag {
            let now = StdInstant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.cond.wait_timeout(flag, deadline - now).unwrap();
            flag = guard;
        }
        *flag = false;
        true
    }

    /// Wake any waiters without recording the event.  This models what a
    /// low-power suspend/resume cycle does to a blocked task, and exists so
    /// tests can prove the wait does not complete on it.
    #[cfg(test)]
    fn wake_without_set(&self) {
        let _guard = self.flag.lock().unwrap();
        self.cond.notify_all();
    }
}

impl Default for Signal {
    fn default() -> Signal {
        Signal::new()
    }
}

struct SemState {
    count: u32,
    generation: u64,
}

/// A counting semaphore with an upper limit.
///
/// A `give` while the count is at the limit is discarded.  A `reset` zeroes
/// the count and aborts any pending `take` with [`Error::Reset`].
pub struct Semaphore {
    state: Mutex<SemState>,
    limit: u32,
    cond: Condvar,
}

impl Semaphore {
    /// Construct a semaphore with the given initial count and limit.
    pub const fn new(initial: u32, limit: u32) -> Semaphore {
        assert!(initial <= limit);
        Semaphore {
            state: Mutex::new(SemState {
                count: initial,
                generation: 0,
            }),
            limit,
            cond: Condvar::new(),
        }
    }

    /// Take the semaphore, waiting up to `timeout_ticks` (negative: forever,
    /// zero: do not wait).
    pub fn take(&self, timeout_ticks: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.count > 0 {
            state.count -= 1;
            return Ok(());
        }
        if timeout_ticks == 0 {
            return Err(Error::WouldBlock);
        }
        let start_generation = state.generation;
        if timeout_ticks < 0 {
            loop {
                state = self.cond.wait(state).unwrap();
                if state.generation != start_generation {
                    return Err(Error::Reset);
                }
                if state.count > 0 {
                    state.count -= 1;
                    return Ok(());
                }
            }
        } else {
            let deadline = StdInstant::now() + ticks_to_std(timeout_ticks as u64);
            loop {
                let now = StdInstant::now();
                if now >= deadline {
                    return Err(Error::TimedOut);
                }
                let (guard, _) = self.cond.wait_timeout(state, deadline - now).unwrap();
                state = guard;
                if state.generation != start_generation {
                    return Err(Error::Reset);
                }
                if state.count > 0 {
                    state.count -= 1;
                    return Ok(());
                }
            }
        }
    }

    /// Give the semaphore, unless the count is already at the limit.
    pub fn give(&self) {
        let mut state = self.state.lock().unwrap();
        if state.count < self.limit {
            state.count += 1;
            self.cond.notify_one();
        }
    }

    /// Zero the count, aborting any pending `take`.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.count = 0;
        state.generation += 1;
        self.cond.notify_all();
    }

    /// The current count.
    pub fn count(&self) -> u32 {
        self.state.lock().unwrap().count
    }
}
