// SPDX-License-Identifier: Apache-2.0

//! # Errors
//!
//! This module contains an `Error` and `Result` type for the few operations
//! in this layer that can fail recoverably.  Most misuse here is fatal by
//! design (see the error policy in the crate docs): what remains are the
//! timeout family on timed waits, and task creation, which callers are
//! expected to treat as fatal anyway on statically sized targets.

use core::fmt;

/// An error from a native backend operation.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A timed wait expired before the primitive was signaled.
    TimedOut,
    /// A no-wait operation could not complete immediately.
    WouldBlock,
    /// The primitive was reset while the caller was waiting on it.
    Reset,
    /// The native backend refused to create a task.
    NoResources,
}

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            Error::TimedOut => "timed out",
            Error::WouldBlock => "would block",
            Error::Reset => "reset while waiting",
            Error::NoResources => "out of native resources",
        };
        write!(f, "{}", desc)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Wraps a value with a possible backend error.
pub type Result<T> = core::result::Result<T, Error>;
