// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors local to the CDR stream and serializer/deserializer engine.

use std::fmt;

use crate::error::DdsError;

/// Errors raised by the CDR stream layer (C2) and the byte-code
/// interpreter (C1/C3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SerError {
    /// A write ran past the end of the output buffer.
    WriteFailed {
        /// Byte offset the write was attempted at.
        offset: usize,
        /// Human-readable reason.
        reason: String,
    },
    /// A read ran past the end of the input buffer.
    ReadFailed {
        /// Byte offset the read was attempted at.
        offset: usize,
        /// Human-readable reason.
        reason: String,
    },
    /// Normalization rejected the input as malformed or hostile.
    InvalidData {
        /// Human-readable reason, including the offending member path where known.
        reason: String,
    },
    /// The key-extraction or encoding path failed for a reason not covered above.
    EncoderFailed {
        /// Human-readable reason.
        reason: String,
    },
}

impl fmt::Display for SerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed { offset, reason } => {
                write!(f, "write failed at offset {offset}: {reason}")
            }
            Self::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {offset}: {reason}")
            }
            Self::InvalidData { reason } => write!(f, "invalid data: {reason}"),
            Self::EncoderFailed { reason } => write!(f, "encoder failed: {reason}"),
        }
    }
}

impl std::error::Error for SerError {}

impl From<SerError> for DdsError {
    fn from(err: SerError) -> Self {
        match err {
            SerError::InvalidData { reason } => DdsError::BadParameter(reason),
            other => DdsError::Error(other.to_string()),
        }
    }
}

/// Result alias used throughout the CDR engine.
pub type SerResult<T> = Result<T, SerError>;
