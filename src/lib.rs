// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # ddscore - DDS/RTPS middleware core
//!
//! Serialization, reliability, and writer-addressing building blocks for a
//! DDS (Data Distribution Service) / RTPS (Real-Time Publish-Subscribe)
//! middleware implementation. This crate does not implement a user-facing
//! `Participant`/`DataWriter`/`DataReader` API, discovery protocol, or
//! transport driver; it provides the pieces a middleware builds those on
//! top of.
//!
//! ## Modules Overview
//!
//! - [`xtypes`] - type-program byte-code, CDR stream I/O, serializer/
//!   deserializer, key extraction and sample freeing
//! - [`reliability`] - defragmenter, reorder buffer, bounded delivery
//!   queue, and the supporting gap-tracking/NACK-scheduling machinery
//! - [`addressing`] - writer locator-set computation (set-cover over
//!   matched readers, MCGEN multicast addressing, redundant-networking
//!   virtual-reader expansion)
//! - [`qos`] - the Quality of Service value types the other modules
//!   consult (reliability kind, history, durability, ownership, ...)
//! - [`config`] - per-domain tuning knobs (`DomainConfig`) for
//!   reliability and addressing
//! - [`error`] - the crate-wide `DdsError` / `DdsResult` types

pub mod addressing;
pub mod config;
pub mod error;
pub mod qos;
pub mod reliability;
pub mod xtypes;

pub use error::{DdsError, DdsResult};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
