// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Weighted greedy set-cover over matched readers' locators (C5).
//!
//! Builds one row per reader (splitting redundant-networking readers
//! into per-interface virtual rows via
//! [`crate::addressing::reader_info::expand_redundant`]), synthesizes one
//! MCGEN candidate locator per distinct multicast-generator template in
//! play via [`McgenTemplate::synthesize`], then greedily selects the
//! locator with the lowest accumulated cost until every row is reached.
//! Cost accumulates a per-kind base (`cost_unicast`, `cost_multicast`,
//! `cost_ssm`) plus `cost_delivered` (negative) for each newly-reached row
//! and `cost_discarded` for each row the locator would reach redundantly,
//! mirroring the reference engine's `calc_locator_cost`. Loopback
//! locators are moved to the front of the candidate list so they are
//! picked first when they tie on cost, matching the reference engine's
//! preference for same-host delivery.
//!
//! The computation re-checks reader liveness every round via a caller
//! supplied predicate. A reader unmatching mid-computation is a race
//! between the addressing engine and the discovery thread that owns the
//! matched-reader set; rather than risk producing an address set that is
//! missing a locator a still-matched reader needs (or that wastefully
//! keeps one for a reader that is already gone), the computation is
//! abandoned and the writer's previous address set is retained.

use std::collections::BTreeSet;

use crate::config::AddressingCostConfig;

use super::locator::{Locator, LocatorKind, McgenTemplate};
use super::reader_info::{expand_redundant, ReaderInfo};

/// The computed set of locators a writer should send to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriterAddressSet {
    pub locators: Vec<Locator>,
}

impl WriterAddressSet {
    /// An address set reaching no readers.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

/// Signals that address-set computation was abandoned because a reader
/// was detected to have unmatched mid-computation. The writer's previous
/// address set is left untouched; the caller should retry once the
/// matched-reader set has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrSetChanged;

fn base_cost(kind: LocatorKind, cost: &AddressingCostConfig) -> i64 {
    match kind {
        LocatorKind::Unicast => cost.cost_unicast,
        LocatorKind::Multicast => cost.cost_multicast,
        LocatorKind::Ssm => cost.cost_ssm,
        LocatorKind::Iceoryx => cost.cost_iceoryx,
    }
}

/// Computes the address set reaching every reader in `readers` at
/// minimum total weighted cost, by greedy set cover.
///
/// `still_matched(reader_id)` is consulted once per greedy round for
/// every reader that fed into this computation; if it ever reports a
/// reader as no longer matched, the computation is abandoned and
/// `Err(AddrSetChanged)` is returned instead of a (possibly
/// inconsistent) address set.
pub fn compute_address_set(
    readers: &[ReaderInfo],
    cost: &AddressingCostConfig,
    still_matched: &dyn Fn(u32) -> bool,
) -> Result<WriterAddressSet, AddrSetChanged> {
    let rows = expand_redundant(readers);
    if rows.is_empty() {
        return Ok(WriterAddressSet::empty());
    }
    let reader_ids: BTreeSet<u32> = rows.iter().map(|row| row.reader_id).collect();
    let all_still_matched = || reader_ids.iter().all(|id| still_matched(*id));

    // Candidate locators, deduplicated, each remembering which rows it reaches.
    let mut candidates: Vec<(Locator, BTreeSet<usize>)> = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        for locator in &row.locators {
            if locator.is_loopback && locator.kind == LocatorKind::Iceoryx {
                // Iceoryx/loopback paths never enter the wire address set;
                // they are handled out-of-band by the shared-memory loan
                // path, which this crate does not implement.
                continue;
            }
            match candidates.iter_mut().find(|(l, _)| l.dedup_key() == locator.dedup_key()) {
                Some((_, reached)) => {
                    reached.insert(row_idx);
                }
                None => candidates.push((locator.clone(), BTreeSet::from([row_idx]))),
            }
        }
    }

    // Synthesize one MCGEN candidate per distinct template in play,
    // covering every row whose reader was assigned a bit in it.
    let mut mcgen_groups: Vec<(McgenTemplate, Vec<u32>, BTreeSet<usize>)> = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        if let Some((template, bit)) = &row.mcgen {
            match mcgen_groups.iter_mut().find(|(t, _, _)| t == template) {
                Some((_, bits, reached)) => {
                    bits.push(*bit);
                    reached.insert(row_idx);
                }
                None => mcgen_groups.push((template.clone(), vec![*bit], BTreeSet::from([row_idx]))),
            }
        }
    }
    for (template, bits, reached) in mcgen_groups {
        let locator = template.synthesize(&bits);
        candidates.push((locator, reached));
    }

    // Loopback first, then by declared interface id for determinism.
    candidates.sort_by(|(a, _), (b, _)| {
        b.is_loopback
            .cmp(&a.is_loopback)
            .then(a.interface_id.cmp(&b.interface_id))
    });

    let mut remaining: BTreeSet<usize> = (0..rows.len()).collect();
    let mut selected = Vec::new();

    while !remaining.is_empty() {
        if !all_still_matched() {
            return Err(AddrSetChanged);
        }

        let mut best: Option<(usize, usize, i64)> = None; // (candidate idx, newly covered, cost)
        for (idx, (locator, reached)) in candidates.iter().enumerate() {
            let newly = reached.intersection(&remaining).count();
            if newly == 0 {
                continue;
            }
            let mut c = base_cost(locator.kind, cost);
            for r in reached.intersection(&remaining) {
                // A reader that wants multicast but would be served by a
                // non-multicast locator is charged as if redundantly
                // covered, pushing the greedy choice toward multicast.
                let per_reader = if rows[*r].prefers_multicast && locator.kind != LocatorKind::Multicast {
                    cost.cost_discarded
                } else {
                    cost.cost_delivered
                };
                c = c.saturating_add(per_reader);
            }
            let already_covered = reached.difference(&remaining).count();
            c = c.saturating_add(cost.cost_discarded.saturating_mul(already_covered as i64));

            let better = match best {
                None => true,
                Some((_, best_newly, best_cost)) => c < best_cost || (c == best_cost && newly > best_newly),
            };
            if better {
                best = Some((idx, newly, c));
            }
        }

        match best {
            Some((idx, _, _)) => {
                let (locator, reached) = &candidates[idx];
                selected.push(locator.clone());
                for r in reached {
                    remaining.remove(r);
                }
            }
            None => break, // no remaining reader is reachable by any candidate
        }
    }

    if !all_still_matched() {
        return Err(AddrSetChanged);
    }

    Ok(WriterAddressSet { locators: selected })
}

/// Recomputes the address set against the current reader list.
///
/// Returns `Ok(true)` if the address set changed and `cached` was
/// updated, `Ok(false)` if it is unchanged (`cached` left as-is), or
/// `Err(AddrSetChanged)` if [`compute_address_set`] detected a reader
/// unmatching mid-computation: the computation is abandoned and `cached`
/// retains whatever value it held before this call.
pub fn update_address_set(
    cached: &mut WriterAddressSet,
    readers: &[ReaderInfo],
    cost: &AddressingCostConfig,
    still_matched: &dyn Fn(u32) -> bool,
) -> Result<bool, AddrSetChanged> {
    let next = compute_address_set(readers, cost, still_matched)?;
    if next == *cached {
        Ok(false)
    } else {
        *cached = next;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn unicast(octets: [u8; 4], port: u32, iface: u32) -> Locator {
        Locator::ipv4(LocatorKind::Unicast, octets, port, iface, false)
    }

    fn multicast(octets: [u8; 4], port: u32) -> Locator {
        Locator::ipv4(LocatorKind::Multicast, octets, port, 0, false)
    }

    fn always_matched(_: u32) -> bool {
        true
    }

    #[test]
    fn scenario_f_multicast_beats_two_unicasts() {
        let mc = multicast([239, 0, 0, 1], 7400);
        let readers = vec![
            ReaderInfo {
                id: 1,
                locators: vec![unicast([10, 0, 0, 1], 7410, 0), mc.clone()],
                prefers_multicast: false,
                redundant_networking: false,
                mcgen: None,
            },
            ReaderInfo {
                id: 2,
                locators: vec![unicast([10, 0, 0, 2], 7410, 0), mc.clone()],
                prefers_multicast: false,
                redundant_networking: false,
                mcgen: None,
            },
        ];
        let cost = AddressingCostConfig::default();
        let addr_set = compute_address_set(&readers, &cost, &always_matched).unwrap();
        assert_eq!(addr_set.locators, vec![mc]);
    }

    #[test]
    fn disjoint_unicast_only_readers_both_get_covered() {
        let readers = vec![
            ReaderInfo {
                id: 1,
                locators: vec![unicast([10, 0, 0, 1], 7410, 0)],
                prefers_multicast: false,
                redundant_networking: false,
                mcgen: None,
            },
            ReaderInfo {
                id: 2,
                locators: vec![unicast([10, 0, 0, 2], 7410, 0)],
                prefers_multicast: false,
                redundant_networking: false,
                mcgen: None,
            },
        ];
        let cost = AddressingCostConfig::default();
        let addr_set = compute_address_set(&readers, &cost, &always_matched).unwrap();
        assert_eq!(addr_set.locators.len(), 2);
    }

    #[test]
    fn loopback_locator_is_preferred_when_present() {
        let mut loopback = unicast([127, 0, 0, 1], 7410, 99);
        loopback.is_loopback = true;
        let remote = unicast([10, 0, 0, 1], 7410, 0);
        let readers = vec![ReaderInfo {
            id: 1,
            locators: vec![remote, loopback.clone()],
            prefers_multicast: false,
            redundant_networking: false,
            mcgen: None,
        }];
        let cost = AddressingCostConfig::default();
        let addr_set = compute_address_set(&readers, &cost, &always_matched).unwrap();
        assert_eq!(addr_set.locators, vec![loopback]);
    }

    #[test]
    fn redundant_networking_reader_requires_every_path_selected() {
        let a = unicast([10, 0, 0, 1], 7410, 0);
        let b = unicast([10, 0, 1, 1], 7410, 1);
        let readers = vec![ReaderInfo {
            id: 1,
            locators: vec![a.clone(), b.clone()],
            prefers_multicast: false,
            redundant_networking: true,
            mcgen: None,
        }];
        let cost = AddressingCostConfig::default();
        let addr_set = compute_address_set(&readers, &cost, &always_matched).unwrap();
        assert_eq!(addr_set.locators.len(), 2);
        assert!(addr_set.locators.contains(&a));
        assert!(addr_set.locators.contains(&b));
    }

    #[test]
    fn multicast_preferring_reader_biases_away_from_unicast() {
        let u = unicast([10, 0, 0, 1], 7410, 0);
        let mc = multicast([239, 0, 0, 5], 7400);
        let readers = vec![ReaderInfo {
            id: 1,
            locators: vec![u, mc.clone()],
            prefers_multicast: true,
            redundant_networking: false,
            mcgen: None,
        }];
        let cost = AddressingCostConfig::default();
        let addr_set = compute_address_set(&readers, &cost, &always_matched).unwrap();
        assert_eq!(addr_set.locators, vec![mc]);
    }

    #[test]
    fn mcgen_template_is_synthesized_and_covers_its_readers() {
        let template = McgenTemplate {
            base_address: {
                let mut a = [0u8; 16];
                a[12..16].copy_from_slice(&[239, 0, 0, 0]);
                a
            },
            port: 7401,
            interface_id: 0,
            bit_width: 8,
        };
        let readers = vec![
            ReaderInfo {
                id: 1,
                locators: vec![unicast([10, 0, 0, 1], 7410, 0)],
                prefers_multicast: false,
                redundant_networking: false,
                mcgen: Some((template.clone(), 0)),
            },
            ReaderInfo {
                id: 2,
                locators: vec![unicast([10, 0, 0, 2], 7410, 0)],
                prefers_multicast: false,
                redundant_networking: false,
                mcgen: Some((template.clone(), 1)),
            },
        ];
        let mut cost = AddressingCostConfig::default();
        // Make multicast decisively cheaper than paying two unicast
        // base costs so the synthesized MCGEN candidate wins.
        cost.cost_multicast = cost.cost_unicast;
        let addr_set = compute_address_set(&readers, &cost, &always_matched).unwrap();
        assert_eq!(addr_set.locators.len(), 1);
        assert_eq!(addr_set.locators[0].kind, LocatorKind::Multicast);
        assert_eq!(&addr_set.locators[0].address[12..16], &[239, 0, 0, 0b0000_0011]);
    }

    #[test]
    fn race_detected_mid_computation_abandons_and_retains_previous() {
        let calls = Cell::new(0u32);
        let still_matched = move |_: u32| {
            let n = calls.get();
            calls.set(n + 1);
            n < 2 // the second round's liveness check reports a vanished reader
        };
        let readers = vec![
            ReaderInfo {
                id: 1,
                locators: vec![unicast([10, 0, 0, 1], 7410, 0)],
                prefers_multicast: false,
                redundant_networking: false,
                mcgen: None,
            },
            ReaderInfo {
                id: 2,
                locators: vec![unicast([10, 0, 0, 2], 7410, 0)],
                prefers_multicast: false,
                redundant_networking: false,
                mcgen: None,
            },
        ];
        let cost = AddressingCostConfig::default();
        let previous = WriterAddressSet {
            locators: vec![unicast([192, 168, 0, 1], 7410, 5)],
        };
        let mut cached = previous.clone();

        let result = update_address_set(&mut cached, &readers, &cost, &still_matched);
        assert_eq!(result, Err(AddrSetChanged));
        assert_eq!(cached, previous);
    }

    #[test]
    fn empty_reader_set_yields_empty_address_set() {
        let cost = AddressingCostConfig::default();
        assert!(compute_address_set(&[], &cost, &always_matched).unwrap().is_empty());
    }

    #[test]
    fn update_reports_changed_only_when_the_set_differs() {
        let mut cached = WriterAddressSet::empty();
        let readers = vec![ReaderInfo {
            id: 1,
            locators: vec![unicast([10, 0, 0, 1], 7410, 0)],
            prefers_multicast: false,
            redundant_networking: false,
            mcgen: None,
        }];
        let cost = AddressingCostConfig::default();

        assert_eq!(update_address_set(&mut cached, &readers, &cost, &always_matched), Ok(true));
        assert_eq!(cached.locators.len(), 1);
        assert_eq!(update_address_set(&mut cached, &readers, &cost, &always_matched), Ok(false));
        assert_eq!(update_address_set(&mut cached, &[], &cost, &always_matched), Ok(true));
        assert!(cached.is_empty());
        assert_eq!(update_address_set(&mut cached, &[], &cost, &always_matched), Ok(false));
    }
}
