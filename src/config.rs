// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-domain configuration — the core's answer to global mutable state.
//!
//! The original implementation keeps per-domain logging configuration,
//! plugin registries and tuning constants as process-wide globals. This
//! crate instead threads an explicit [`DomainConfig`] through every public
//! entry point that needs tuning knobs: defragmenters, reorder buffers, the
//! NACK scheduler and the writer addressing engine all take `&DomainConfig`
//! at construction rather than reading ambient state.
//!
//! `DomainConfig` is cheap to clone (a handful of `Copy` fields) and is
//! expected to be shared behind an `Arc` by callers that need one config per
//! domain participant; the core itself imposes no particular sharing
//! strategy, consistent with having no implicit async runtime.

use std::time::Duration;

/// Eviction policy when a defragmenter's `max_samples` bound is exceeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DropPolicy {
    /// Drop the in-progress sample with the lowest sequence number.
    /// Appropriate for best-effort streams where losing old data is cheap.
    #[default]
    DropOldest,
    /// Drop the newly arrived fragment's sample, leaving older in-progress
    /// samples untouched so the protocol can redeliver the dropped one.
    /// Appropriate for reliable streams.
    DropLatest,
}

/// XCDR wire-encoding version a topic uses absent an explicit override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum XcdrVersion {
    /// XCDR1: 8-byte primitives align to 8; no DHEADER/EMHEADER framing.
    #[default]
    Xcdr1,
    /// XCDR2: 8-byte primitives align to 4; delimited/mutable framing adds
    /// DHEADER and EMHEADER prefixes.
    Xcdr2,
}

/// Tuning knobs for the defragmenter (C4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DefragConfig {
    /// Maximum number of in-progress samples held concurrently.
    pub max_samples: usize,
    /// Eviction policy applied once `max_samples` is exceeded.
    pub drop_policy: DropPolicy,
}

impl Default for DefragConfig {
    fn default() -> Self {
        Self {
            max_samples: 4,
            drop_policy: DropPolicy::DropOldest,
        }
    }
}

/// Tuning knobs for the reorder buffer (C4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReorderConfig {
    /// Maximum number of held (not-yet-deliverable) samples before `reject`
    /// is returned to the caller.
    pub max_samples: usize,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self { max_samples: 256 }
    }
}

/// Tuning knobs for the reader-side NACK scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NackSchedulerConfig {
    /// Window after the first detected gap before a NACK is allowed to fire,
    /// coalescing fast-arriving retransmissions into one request.
    pub window: Duration,
    /// Initial backoff applied after sending a NACK with no response.
    pub initial_backoff: Duration,
    /// Maximum number of retransmission retries before giving up on a gap.
    pub max_retries: u32,
}

impl Default for NackSchedulerConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(20),
            initial_backoff: Duration::from_millis(50),
            max_retries: 5,
        }
    }
}

/// Cost-model constants for the writer addressing engine (C5), grounded in
/// the constants the reference implementation hard-codes in its greedy
/// set-cover cost function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AddressingCostConfig {
    /// Base cost of a unicast locator when `prefer_multicast` is false.
    pub cost_unicast: i64,
    /// Base cost of an ASM multicast locator when `prefer_multicast` is false.
    pub cost_multicast: i64,
    /// Base cost of a source-specific multicast locator.
    pub cost_ssm: i64,
    /// Base cost of a shared-memory (iceoryx-style) locator.
    pub cost_iceoryx: i64,
    /// Cost credited per newly covered reader when a locator is selected.
    pub cost_delivered: i64,
    /// Small penalty subtracted for each reader a locator would redundantly
    /// cover (already covered by a previously selected locator).
    pub cost_discarded: i64,
    /// Large penalty for redundant delivery over a shared-memory locator.
    /// The reference implementation documents this as "can lead to
    /// user-observable stuttering"; kept configurable per that note rather
    /// than hard-coded.
    pub cost_redundant_iceoryx: i64,
}

impl Default for AddressingCostConfig {
    fn default() -> Self {
        Self {
            cost_unicast: 1,
            cost_multicast: 2,
            cost_ssm: 2,
            cost_iceoryx: 0,
            cost_delivered: -1,
            cost_discarded: 1,
            cost_redundant_iceoryx: 1_000_000,
        }
    }
}

/// Per-domain configuration consumed by the reliability pipeline and the
/// writer addressing engine. Construct once per domain participant and pass
/// by reference; there is no global instance.
#[derive(Clone, Debug, PartialEq)]
pub struct DomainConfig {
    /// Defragmenter tuning.
    pub defrag: DefragConfig,
    /// Reorder buffer tuning.
    pub reorder: ReorderConfig,
    /// NACK scheduler tuning.
    pub nack_scheduler: NackSchedulerConfig,
    /// Writer addressing engine cost model.
    pub addressing_cost: AddressingCostConfig,
    /// Default XCDR version for newly registered topics.
    pub default_xcdr_version: XcdrVersion,
    /// Capacity of the bounded delivery queue (C4.3) before backpressure.
    pub delivery_queue_capacity: usize,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            defrag: DefragConfig::default(),
            reorder: ReorderConfig::default(),
            nack_scheduler: NackSchedulerConfig::default(),
            addressing_cost: AddressingCostConfig::default(),
            default_xcdr_version: XcdrVersion::default(),
            delivery_queue_capacity: 256,
        }
    }
}
