// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Matched-proxy-reader addressing info (C5).

use crate::addressing::locator::{Locator, McgenTemplate};

/// What a writer knows about one matched proxy reader for addressing
/// purposes.
#[derive(Clone, Debug, PartialEq)]
pub struct ReaderInfo {
    /// Opaque reader identity, used to label virtual readers created by
    /// [`expand_redundant`] for diagnostics and to detect a reader
    /// unmatching mid-computation.
    pub id: u32,
    pub locators: Vec<Locator>,
    /// When set, the writer should prefer multicast locators over
    /// unicast ones that reach the same reader.
    pub prefers_multicast: bool,
    /// Redundant-networking QoS: the writer must deliver over every
    /// remote-interface connection of this reader independently rather
    /// than picking the cheapest locator that reaches it.
    pub redundant_networking: bool,
    /// MCGEN multicast-generator eligibility: the template this reader
    /// can be folded into, and the bit index it occupies within it.
    pub mcgen: Option<(McgenTemplate, u32)>,
}

/// One row of the cover matrix: either an ordinary reader or one leg of
/// a redundant-networking reader split into per-interface virtual readers.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverRow {
    /// Diagnostic label; redundant legs are suffixed `a0`, `a1`, ...
    pub label: String,
    /// The reader this row originated from, used to detect it unmatching
    /// mid-computation even after splitting.
    pub reader_id: u32,
    pub locators: Vec<Locator>,
    pub prefers_multicast: bool,
    pub mcgen: Option<(McgenTemplate, u32)>,
}

/// Expands every redundant-networking reader into one virtual row per
/// remote-interface connection (locators sharing an `interface_id`
/// collapse into one row, so the cover algorithm is forced to select a
/// path for each distinct connection rather than each individual
/// locator), leaving ordinary readers as a single row.
#[must_use]
pub fn expand_redundant(readers: &[ReaderInfo]) -> Vec<CoverRow> {
    let mut rows = Vec::new();
    for reader in readers {
        if reader.redundant_networking {
            let mut by_iface: Vec<(u32, Vec<Locator>)> = Vec::new();
            for locator in &reader.locators {
                match by_iface.iter_mut().find(|(iface, _)| *iface == locator.interface_id) {
                    Some((_, locs)) => locs.push(locator.clone()),
                    None => by_iface.push((locator.interface_id, vec![locator.clone()])),
                }
            }
            if by_iface.len() > 1 {
                for (i, (_, locators)) in by_iface.into_iter().enumerate() {
                    rows.push(CoverRow {
                        label: format!("{}a{i}", reader.id),
                        reader_id: reader.id,
                        locators,
                        prefers_multicast: reader.prefers_multicast,
                        mcgen: None,
                    });
                }
                continue;
            }
        }
        rows.push(CoverRow {
            label: reader.id.to_string(),
            reader_id: reader.id,
            locators: reader.locators.clone(),
            prefers_multicast: reader.prefers_multicast,
            mcgen: reader.mcgen.clone(),
        });
    }
    rows
}
