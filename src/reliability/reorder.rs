// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reorder buffer (C4.2).
//!
//! One reorder buffer per proxy writer (or per reader, for out-of-sync
//! delivery) tracks `next_expected_seq` and a sorted map of held,
//! not-yet-deliverable samples. A sample accepted at exactly
//! `next_expected_seq` triggers delivery of it and every contiguous held
//! sample that follows.
//!
//! Gap ranges use ordinary Rust half-open `Range<u64>` semantics
//! (`[start, end)`), matching [`crate::reliability::RtpsRange`]'s
//! `from_inclusive`/`into_range` convention used elsewhere in this crate's
//! gap tracking.

use std::collections::BTreeMap;
use std::ops::Range;

/// Delivery ordering mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReorderMode {
    /// Deliver in strict sequence order; hold early arrivals until the gap fills.
    Normal,
    /// Deliver any sample at `next_expected`; drop stale ones; hold only
    /// future ones until they coalesce.
    MonotonicallyIncreasing,
    /// Every sample delivers immediately; the buffer is bookkeeping only.
    AlwaysDeliver,
}

/// Result of offering one sample to the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome<T> {
    /// The sample was accepted. The chain of now-deliverable samples (in
    /// sequence order) is returned; it may be empty if the sample was held
    /// pending an earlier gap.
    Accepted(Vec<(u64, T)>),
    /// The sample's sequence number is below `next_expected` (`Normal`
    /// mode only); it was rejected without being stored.
    TooOld,
    /// Accepting would exceed `max_samples` held entries; the caller
    /// should retry later.
    Reject,
}

/// Per-proxy-writer (or per-reader) reorder buffer.
pub struct ReorderBuffer<T> {
    mode: ReorderMode,
    next_expected: u64,
    max_samples: usize,
    held: BTreeMap<u64, T>,
}

impl<T> ReorderBuffer<T> {
    /// Creates a reorder buffer starting at `next_expected_seq`.
    #[must_use]
    pub fn new(mode: ReorderMode, next_expected_seq: u64, max_samples: usize) -> Self {
        Self {
            mode,
            next_expected: next_expected_seq,
            max_samples,
            held: BTreeMap::new(),
        }
    }

    /// The next sequence number eligible for delivery.
    #[must_use]
    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    /// Number of samples currently held pending an earlier gap.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    fn drain_contiguous(&mut self) -> Vec<(u64, T)> {
        let mut out = Vec::new();
        while let Some(payload) = self.held.remove(&self.next_expected) {
            out.push((self.next_expected, payload));
            self.next_expected += 1;
        }
        out
    }

    /// Offers one sample at sequence number `seq`.
    pub fn accept(&mut self, seq: u64, payload: T) -> AcceptOutcome<T> {
        match self.mode {
            ReorderMode::AlwaysDeliver => {
                self.next_expected = self.next_expected.max(seq + 1);
                AcceptOutcome::Accepted(vec![(seq, payload)])
            }
            ReorderMode::Normal => {
                if seq < self.next_expected {
                    return AcceptOutcome::TooOld;
                }
                self.accept_in_order_or_hold(seq, payload)
            }
            ReorderMode::MonotonicallyIncreasing => {
                if seq < self.next_expected {
                    log::debug!(
                        "reorder: dropping stale seq={seq} below next_expected={}",
                        self.next_expected
                    );
                    return AcceptOutcome::Accepted(Vec::new());
                }
                self.accept_in_order_or_hold(seq, payload)
            }
        }
    }

    fn accept_in_order_or_hold(&mut self, seq: u64, payload: T) -> AcceptOutcome<T> {
        if seq == self.next_expected {
            let mut out = vec![(seq, payload)];
            self.next_expected += 1;
            out.extend(self.drain_contiguous());
            AcceptOutcome::Accepted(out)
        } else {
            if self.held.len() >= self.max_samples {
                return AcceptOutcome::Reject;
            }
            self.held.insert(seq, payload);
            AcceptOutcome::Accepted(Vec::new())
        }
    }

    /// Processes a `GAP` submessage covering `range` (half-open), advancing
    /// `next_expected_seq` past it and delivering any held samples that
    /// become contiguous as a result.
    pub fn gap(&mut self, range: Range<u64>) -> Vec<(u64, T)> {
        if range.end > self.next_expected {
            self.next_expected = range.end;
        }
        self.drain_contiguous()
    }
}
