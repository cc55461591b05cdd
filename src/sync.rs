//! Higher level synchronization primitives.
//!
//! These are the portable wait/release primitives this layer offers on top
//! of the backend's raw events: a binary [`Notification`] for one-shot
//! handoff between a single producer and a single consumer, and a counting
//! [`Semaphore`] modeled loosely on the semaphores of the native kernels.

pub mod atomic {
    //! Re-export portable atomics.
    //!
    //! `core::sync::atomic` is missing types on targets without atomic
    //! instructions; the `portable-atomic` crate either re-exports the core
    //! types or substitutes lock-based ones, so code written against this
    //! module works on every backend's targets.

    pub use portable_atomic::*;
}

mod notify;
mod semaphore;

pub use notify::Notification;
pub use semaphore::Semaphore;
