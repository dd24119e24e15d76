// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-program byte-code, CDR stream I/O, and the serializer/deserializer
//! built on top of them (C1-C3).
//!
//! | Component              | Module       |
//! |-------------------------|--------------|
//! | Type-program byte-code  | [`program`]  |
//! | Sample representation   | [`value`]    |
//! | CDR stream I/O           | [`stream`]   |
//! | Write path                | [`ser`]      |
//! | Read path / normalize     | [`de`]       |
//! | Key extraction / keyhash  | [`key`]      |
//! | Sample freeing             | [`free`]    |

pub mod error;
pub mod program;
pub mod value;
pub mod stream;
pub mod ser;
pub mod de;
pub mod free;
#[cfg(feature = "xtypes")]
pub mod key;

pub use error::{SerError, SerResult};
pub use program::{Flags, Instr, Program, TypeCode, ROOT};
pub use value::Value;
pub use stream::{CdrInputStream, CdrOutputStream};
pub use ser::serialize;
pub use de::{deserialize, normalize};
pub use free::free_sample;
#[cfg(feature = "xtypes")]
pub use key::{from_sample, from_serialized_data, KeyHash};
