// SPDX-License-Identifier: Apache-2.0

//! Portable threads over a native kernel backend.
//!
//! This crate provides one uniform contract for creating, starting, joining,
//! and detaching threads of execution, together with sleep/yield facades and
//! a pair of wait/release primitives, independent of which native kernel is
//! actually underneath.  The kernel is consumed as an opaque capability
//! through the [`sys`] module, which is selected at compile time; the crate
//! ships a host backend built on `std::thread`, and an RTOS port provides a
//! sibling module with the same surface.
//!
//! The core of the crate is the [`thread`] module: a [`Context`] is the fixed
//! memory block backing one thread slot, an [`Options`] value configures a
//! creation, and a [`Thread`] is the move-only handle that must reach exactly
//! one of its terminal dispositions, [`join`] or [`detach`], before it is
//! dropped.  Dropping a handle that still represents a thread is a fatal
//! error by design; this layer deliberately forbids silent thread leaks.
//!
//! ## Error policy
//!
//! Almost nothing in this layer is recoverable.  Precondition violations
//! (joining yourself, reusing a live context, dropping a joinable handle)
//! and kernel resource exhaustion at creation time are programmer or
//! configuration errors, and panic at the point of misuse.  The only errors
//! surfaced as values are the timeout family on the timed waits, see
//! [`error`].
//!
//! [`Context`]: thread::Context
//! [`Options`]: thread::Options
//! [`Thread`]: thread::Thread
//! [`join`]: thread::Thread::join
//! [`detach`]: thread::Thread::detach

#![deny(missing_docs)]

pub mod error;
pub mod sync;
pub mod sys;
pub mod thread;
pub mod time;

pub use error::{Error, Result};
