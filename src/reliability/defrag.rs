// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-proxy-writer defragmenter (C4.1).
//!
//! Holds at most `max_samples` in-progress samples, each represented as an
//! interval list of received byte ranges. Fragments are coalesced with
//! adjacent intervals on insert; a sample completes once its interval list
//! collapses to a single `[0, sample_size)` range.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::config::DropPolicy;

/// Result of inserting one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// The sample is not yet fully received.
    Incomplete,
    /// The sample's interval list now covers `[0, sample_size)`; the
    /// reassembled bytes are returned and the sample leaves the
    /// defragmenter.
    Complete(Vec<u8>),
    /// `max_samples` was exceeded and the oldest in-progress sample
    /// (by sequence number) was evicted to make room for this fragment.
    EvictedOldest(u64),
    /// `max_samples` was exceeded and `DropPolicy::DropLatest` is in
    /// effect: this fragment's own sample was dropped instead, and no
    /// low-water mark is advanced so the protocol can redeliver it.
    DroppedLatest,
}

struct InProgress {
    buffer: Vec<u8>,
    intervals: Vec<Range<u32>>,
    fragment_size: u32,
}

impl InProgress {
    fn new(sample_size: u32, fragment_size: u32) -> Self {
        Self {
            buffer: vec![0u8; sample_size as usize],
            intervals: Vec::new(),
            fragment_size,
        }
    }

    /// Inserts `data` at `[offset, offset + data.len())`, merging with
    /// adjacent/overlapping intervals.
    fn insert(&mut self, offset: u32, data: &[u8]) {
        let end = offset + data.len() as u32;
        self.buffer[offset as usize..end as usize].copy_from_slice(data);

        let new_range = offset..end;
        let mut merged = new_range;
        let mut out = Vec::with_capacity(self.intervals.len() + 1);
        for iv in self.intervals.drain(..) {
            if iv.end < merged.start || iv.start > merged.end {
                out.push(iv);
            } else {
                merged = merged.start.min(iv.start)..merged.end.max(iv.end);
            }
        }
        out.push(merged);
        out.sort_by_key(|r| r.start);
        self.intervals = out;
    }

    fn is_complete(&self) -> bool {
        self.intervals.len() == 1
            && self.intervals[0].start == 0
            && self.intervals[0].end as usize == self.buffer.len()
    }

    /// Bit `i` is set when fragment number `i` (0-based, `fragment_size`
    /// bytes each, last one possibly short) is not fully covered by a
    /// received interval.
    fn missing_fragment_bitmap(&self, max_fragnum: u32) -> Vec<bool> {
        let total = self.buffer.len() as u32;
        (0..max_fragnum)
            .map(|i| {
                let start = i * self.fragment_size;
                let end = (start + self.fragment_size).min(total);
                if start >= total {
                    return true;
                }
                !self
                    .intervals
                    .iter()
                    .any(|iv| iv.start <= start && iv.end >= end)
            })
            .collect()
    }
}

/// One defragmenter per proxy writer.
pub struct Defragmenter {
    max_samples: usize,
    drop_policy: DropPolicy,
    samples: BTreeMap<u64, InProgress>,
}

impl Defragmenter {
    /// Creates a defragmenter with the given capacity and eviction policy.
    #[must_use]
    pub fn new(max_samples: usize, drop_policy: DropPolicy) -> Self {
        assert!(max_samples > 0, "max_samples must be positive");
        Self {
            max_samples,
            drop_policy,
            samples: BTreeMap::new(),
        }
    }

    /// Inserts one fragment of sequence number `seq`.
    ///
    /// `sample_size` and `fragment_size` are supplied on every call (as the
    /// reference implementation reads them from each submessage's header)
    /// but only matter the first time a sample is seen.
    pub fn insert_fragment(
        &mut self,
        seq: u64,
        sample_size: u32,
        fragment_size: u32,
        fragment_index: u32,
        payload: &[u8],
    ) -> FragmentOutcome {
        let mut evicted = None;

        if !self.samples.contains_key(&seq) && self.samples.len() >= self.max_samples {
            match self.drop_policy {
                DropPolicy::DropOldest => {
                    if let Some((&oldest, _)) = self.samples.iter().next() {
                        self.samples.remove(&oldest);
                        evicted = Some(oldest);
                    }
                }
                DropPolicy::DropLatest => {
                    log::debug!(
                        "defragmenter: dropping latest sample seq={seq}, at capacity ({})",
                        self.max_samples
                    );
                    return FragmentOutcome::DroppedLatest;
                }
            }
        }

        let entry = self
            .samples
            .entry(seq)
            .or_insert_with(|| InProgress::new(sample_size, fragment_size));
        let offset = fragment_index * fragment_size;
        entry.insert(offset, payload);

        if entry.is_complete() {
            let sample = self.samples.remove(&seq).expect("just inserted");
            log::trace!("defragmenter: sample seq={seq} complete");
            return FragmentOutcome::Complete(sample.buffer);
        }

        match evicted {
            Some(seq) => FragmentOutcome::EvictedOldest(seq),
            None => FragmentOutcome::Incomplete,
        }
    }

    /// Produces a missing-fragment bitmap for `seq` bounded by
    /// `max_fragnum`, for driving ACKNACK/NACK_FRAG submessages. Returns
    /// `None` if the sample is not currently tracked (either complete
    /// already or never seen).
    #[must_use]
    pub fn nack_bitmap(&self, seq: u64, max_fragnum: u32) -> Option<Vec<bool>> {
        self.samples
            .get(&seq)
            .map(|s| s.missing_fragment_bitmap(max_fragnum))
    }

    /// Number of samples currently in progress.
    #[must_use]
    pub fn in_progress_count(&self) -> usize {
        self.samples.len()
    }
}
