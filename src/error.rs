// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error kinds.
//!
//! Every public operation returns one of these kinds by value; the core
//! never raises exceptions (there are none in Rust) or panics except for the
//! one documented fatal-abort path in the byte-code interpreter, which
//! indicates a malformed type program that should have been rejected at
//! topic registration.

use std::fmt;

/// Error kinds returned by core operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DdsError {
    /// Caller-supplied inputs violated the operation's contract (null
    /// pointer, negative size, out-of-range enum value).
    BadParameter(String),
    /// The entity targeted by this call was deleted concurrently.
    AlreadyDeleted,
    /// A bounded wait elapsed (write backpressure, wait-for-acknowledgments).
    Timeout,
    /// The operation is invalid in the entity's current state (e.g.
    /// returning a loan that was never taken).
    PreconditionNotMet(String),
    /// An allocator refused an allocation, or a `KeepAll` history cache is
    /// at capacity.
    OutOfResources,
    /// The operation is not implemented for this entity type.
    Unsupported,
    /// The operation was invoked on the wrong kind of entity.
    IllegalOperation,
    /// Any other unexpected failure (I/O, plugin refusal).
    Error(String),
}

impl fmt::Display for DdsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadParameter(reason) => write!(f, "bad parameter: {reason}"),
            Self::AlreadyDeleted => write!(f, "entity already deleted"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::PreconditionNotMet(reason) => write!(f, "precondition not met: {reason}"),
            Self::OutOfResources => write!(f, "out of resources"),
            Self::Unsupported => write!(f, "operation unsupported"),
            Self::IllegalOperation => write!(f, "illegal operation for this entity kind"),
            Self::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

impl std::error::Error for DdsError {}

/// Result alias used throughout the crate's public surface.
pub type DdsResult<T> = Result<T, DdsError>;
