// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS value-carrier consumed by the core.
//!
//! The core treats the full QoS policy type as an external collaborator: it
//! only needs query access to a handful of named policies (reliability,
//! history, durability, ownership strength, partitions, liveliness lease,
//! deadline, destination-order, resource limits, property bag). This module
//! provides a minimal concrete type satisfying that interface so the
//! reliability pipeline and the addressing engine have something to query
//! against; a host application's own QoS provider is free to be richer.

use std::time::Duration;

/// Collection of policies read by the reliability pipeline and addressing engine.
#[derive(Clone, Debug, PartialEq)]
pub struct QosProfile {
    /// Reliability policy.
    pub reliability: Reliability,
    /// History policy (`KeepLast` or `KeepAll`).
    pub history: History,
    /// Durability policy.
    pub durability: Durability,
    /// Ownership policy and, for `Exclusive`, the writer's strength.
    pub ownership: Ownership,
    /// Partition names this entity belongs to; empty means the default partition.
    pub partitions: Vec<String>,
    /// Liveliness lease duration; `None` means automatic/infinite.
    pub liveliness_lease: Option<Duration>,
    /// Deadline period; `None` means no deadline is enforced.
    pub deadline: Option<Duration>,
    /// Destination-order policy.
    pub destination_order: DestinationOrder,
    /// Resource limits (queue sizes, instances).
    pub resource_limits: ResourceLimits,
    /// Opaque user/topic property bag (`name` -> `value`), consulted by
    /// transport/discovery layers above the core.
    pub properties: Vec<(String, String)>,
}

impl Default for QosProfile {
    fn default() -> Self {
        Self {
            reliability: Reliability::BestEffort,
            history: History::KeepLast(10),
            durability: Durability::Volatile,
            ownership: Ownership::Shared,
            partitions: Vec::new(),
            liveliness_lease: None,
            deadline: None,
            destination_order: DestinationOrder::ByReception,
            resource_limits: ResourceLimits::default(),
            properties: Vec::new(),
        }
    }
}

impl QosProfile {
    /// Validates policy combinations, mirroring the checks a real QoS
    /// provider runs at writer/reader creation.
    ///
    /// # Errors
    /// Returns a human-readable message describing the first invalid
    /// combination found.
    pub fn validate(&self) -> Result<(), String> {
        match self.history {
            History::KeepLast(0) => {
                return Err("History::KeepLast(n) requires n > 0".to_string());
            }
            History::KeepAll => {
                if self.resource_limits.max_samples == 0 {
                    return Err(
                        "History::KeepAll requires ResourceLimits.max_samples > 0".to_string(),
                    );
                }
            }
            History::KeepLast(_) => {}
        }

        let rl = &self.resource_limits;
        if rl.max_samples < rl.max_samples_per_instance * rl.max_instances {
            return Err(format!(
                "max_samples ({}) must be >= max_samples_per_instance ({}) * max_instances ({})",
                rl.max_samples, rl.max_samples_per_instance, rl.max_instances
            ));
        }

        if let Ownership::Exclusive { strength: _ } = self.ownership {
            if matches!(self.reliability, Reliability::BestEffort) {
                // Exclusive ownership arbitration still makes sense on
                // best-effort topics (no NACK retransmission needed for it).
            }
        }

        Ok(())
    }

    /// QoS profile tuned for low-latency delivery: best-effort, shallow
    /// history, small resource limits.
    #[must_use]
    pub fn low_latency() -> Self {
        Self {
            reliability: Reliability::BestEffort,
            history: History::KeepLast(1),
            durability: Durability::Volatile,
            resource_limits: ResourceLimits {
                max_samples: 10,
                max_instances: 1,
                max_samples_per_instance: 10,
                max_quota_bytes: 100_000,
            },
            ..Default::default()
        }
    }

    /// QoS profile tuned for high-throughput delivery: best-effort, deep
    /// history, large resource limits.
    #[must_use]
    pub fn high_throughput() -> Self {
        Self {
            reliability: Reliability::BestEffort,
            history: History::KeepLast(1000),
            durability: Durability::Volatile,
            resource_limits: ResourceLimits {
                max_samples: 5000,
                max_instances: 1,
                max_samples_per_instance: 5000,
                max_quota_bytes: 50_000_000,
            },
            ..Default::default()
        }
    }

    /// QoS profile tuned for reliable delivery with retransmission.
    #[must_use]
    pub fn reliable() -> Self {
        Self {
            reliability: Reliability::Reliable,
            history: History::KeepLast(100),
            ..Default::default()
        }
    }
}

/// Reliability policy: determines whether the reliability pipeline (C4) is
/// engaged at all for a given endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Reliability {
    /// Fire-and-forget: no ACKs, no retransmission, no reorder-buffer NACKs.
    #[default]
    BestEffort,
    /// Reliable delivery with NACK-driven retransmission (drives C4 in full).
    Reliable,
}

/// History policy: determines how many samples per instance are retained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum History {
    /// Keep last N samples per instance.
    KeepLast(u32),
    /// Keep all samples within resource limits.
    KeepAll,
}

impl Default for History {
    fn default() -> Self {
        Self::KeepLast(10)
    }
}

/// Durability policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Durability {
    /// No persistence.
    #[default]
    Volatile,
    /// Writer caches samples in memory for late joiners.
    TransientLocal,
    /// Writer persists samples to disk for late joiners.
    Persistent,
}

/// Ownership policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// Multiple writers may update the same instance concurrently.
    Shared,
    /// Exactly one writer (the one with the highest `strength`) owns the instance.
    Exclusive {
        /// Arbitration strength; higher wins.
        strength: i32,
    },
}

/// Destination-order policy: controls whether samples are ordered by
/// reception time or by source timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DestinationOrder {
    /// Order by local reception time (the default; matches C4's reorder buffer).
    #[default]
    ByReception,
    /// Order by the source timestamp carried in the sample's `InfoTs`.
    BySourceTimestamp,
}

/// Resource limits for a writer or reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum total samples across all instances.
    pub max_samples: usize,
    /// Maximum number of distinct instances.
    pub max_instances: usize,
    /// Maximum samples retained per instance.
    pub max_samples_per_instance: usize,
    /// Maximum total payload bytes.
    pub max_quota_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_samples: 100_000,
            max_instances: 1,
            max_samples_per_instance: 100_000,
            max_quota_bytes: 100_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_best_effort_volatile() {
        let qos = QosProfile::default();
        assert_eq!(qos.reliability, Reliability::BestEffort);
        assert_eq!(qos.history, History::KeepLast(10));
        assert_eq!(qos.durability, Durability::Volatile);
        assert!(qos.partitions.is_empty());
        assert!(qos.validate().is_ok());
    }

    #[test]
    fn keep_last_zero_is_invalid() {
        let qos = QosProfile {
            history: History::KeepLast(0),
            ..Default::default()
        };
        assert!(qos.validate().unwrap_err().contains("n > 0"));
    }

    #[test]
    fn keep_all_requires_max_samples() {
        let qos = QosProfile {
            history: History::KeepAll,
            resource_limits: ResourceLimits {
                max_samples: 0,
                max_instances: 1,
                max_samples_per_instance: 1,
                max_quota_bytes: 1000,
            },
            ..Default::default()
        };
        assert!(qos.validate().unwrap_err().contains("KeepAll"));
    }

    #[test]
    fn resource_limits_are_cross_checked() {
        let qos = QosProfile {
            resource_limits: ResourceLimits {
                max_samples: 10,
                max_instances: 5,
                max_samples_per_instance: 10,
                max_quota_bytes: 10_000_000,
            },
            ..Default::default()
        };
        assert!(qos.validate().unwrap_err().contains("max_samples"));
    }

    #[test]
    fn low_latency_preset_is_valid() {
        let qos = QosProfile::low_latency();
        assert_eq!(qos.history, History::KeepLast(1));
        assert!(qos.validate().is_ok());
    }

    #[test]
    fn high_throughput_preset_is_valid() {
        let qos = QosProfile::high_throughput();
        assert_eq!(qos.history, History::KeepLast(1000));
        assert!(qos.validate().is_ok());
    }

    #[test]
    fn reliable_preset_is_valid() {
        let qos = QosProfile::reliable();
        assert_eq!(qos.reliability, Reliability::Reliable);
        assert!(qos.validate().is_ok());
    }

    #[test]
    fn exclusive_ownership_carries_strength() {
        let qos = QosProfile {
            ownership: Ownership::Exclusive { strength: 42 },
            ..Default::default()
        };
        match qos.ownership {
            Ownership::Exclusive { strength } => assert_eq!(strength, 42),
            Ownership::Shared => panic!("expected exclusive ownership"),
        }
    }
}
