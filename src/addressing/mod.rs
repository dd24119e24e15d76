// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer locator-set addressing engine (C5).
//!
//! | Component                          | Module         |
//! |-------------------------------------|----------------|
//! | Locator / MCGEN template             | [`locator`]    |
//! | Matched-reader info / redundant split | [`reader_info`]|
//! | Greedy weighted set cover              | [`cover`]      |

pub mod cover;
pub mod locator;
pub mod reader_info;

pub use cover::{compute_address_set, update_address_set, AddrSetChanged, WriterAddressSet};
pub use locator::{Locator, LocatorKind, McgenTemplate};
pub use reader_info::{expand_redundant, CoverRow, ReaderInfo};
