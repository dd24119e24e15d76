// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Locator representation for the writer addressing engine (C5).
//!
//! Mirrors the kind/address/port shape used elsewhere in this crate's
//! family for RTPS locator parameters, plus the bookkeeping the
//! addressing engine itself needs: which network interface a locator
//! reaches through, whether it is a loopback path, and (for multicast
//! generator addresses) the per-reader bit index used to fold several
//! readers onto one synthesized multicast group.

/// Locator transport kind, in increasing order of addressing cost under
/// the default [`crate::config::AddressingCostConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LocatorKind {
    /// Zero-copy shared-memory transport (loopback-only, not on the wire).
    Iceoryx,
    /// Plain unicast UDP.
    Unicast,
    /// Source-specific multicast.
    Ssm,
    /// Any-source multicast.
    Multicast,
}

/// One network locator a reader can be reached at.
#[derive(Clone, Debug, PartialEq)]
pub struct Locator {
    pub kind: LocatorKind,
    /// 16-byte address (IPv4 stored in the last 4 bytes, as in RTPS).
    pub address: [u8; 16],
    pub port: u32,
    /// Identifies the local network interface this locator is reached
    /// through; used to detect redundant paths across interfaces.
    pub interface_id: u32,
    pub is_loopback: bool,
    /// Set only for a multicast-generator template locator: the bit
    /// index this reader occupies within the synthesized group address.
    pub mcgen_bit: Option<u32>,
}

impl Locator {
    /// Creates a plain (non-MCGEN) locator.
    #[must_use]
    pub fn new(kind: LocatorKind, address: [u8; 16], port: u32, interface_id: u32, is_loopback: bool) -> Self {
        Self {
            kind,
            address,
            port,
            interface_id,
            is_loopback,
            mcgen_bit: None,
        }
    }

    /// Builds an IPv4 locator from an IPv4-mapped 4-byte address.
    #[must_use]
    pub fn ipv4(kind: LocatorKind, octets: [u8; 4], port: u32, interface_id: u32, is_loopback: bool) -> Self {
        let mut address = [0u8; 16];
        address[12..16].copy_from_slice(&octets);
        Self::new(kind, address, port, interface_id, is_loopback)
    }

    /// Key used to deduplicate candidate locators across readers: same
    /// kind/address/port/interface are the same physical path regardless
    /// of which reader reported it. MCGEN bit index is excluded so every
    /// reader's bit contributes to the same template locator's dedup
    /// bucket.
    #[must_use]
    pub fn dedup_key(&self) -> (LocatorKind, [u8; 16], u32, u32) {
        (self.kind, self.address, self.port, self.interface_id)
    }
}

/// A multicast-generator template: a base address plus a bit-field
/// region used to OR in the bit indices of every reachable reader,
/// producing one synthesized multicast group that covers exactly the
/// readers selected.
#[derive(Clone, Debug, PartialEq)]
pub struct McgenTemplate {
    pub base_address: [u8; 16],
    pub port: u32,
    pub interface_id: u32,
    /// Number of low-order bits available for reader bit indices.
    pub bit_width: u32,
}

impl McgenTemplate {
    /// Synthesizes the concrete multicast locator reaching exactly the
    /// readers whose bit index is set in `bits`.
    #[must_use]
    pub fn synthesize(&self, bits: &[u32]) -> Locator {
        let mut mask: u32 = 0;
        for &bit in bits {
            if bit < self.bit_width {
                mask |= 1 << bit;
            }
        }
        let mut address = self.base_address;
        let last = u32::from_be_bytes(address[12..16].try_into().unwrap()) | mask;
        address[12..16].copy_from_slice(&last.to_be_bytes());
        Locator::new(LocatorKind::Multicast, address, self.port, self.interface_id, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_ignores_mcgen_bit() {
        let mut a = Locator::ipv4(LocatorKind::Multicast, [239, 0, 0, 1], 7400, 0, false);
        let mut b = a.clone();
        a.mcgen_bit = Some(0);
        b.mcgen_bit = Some(3);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn mcgen_synthesize_ors_bit_indices_into_template() {
        let template = McgenTemplate {
            base_address: { let mut a = [0u8; 16]; a[12..16].copy_from_slice(&[239, 0, 0, 0]); a },
            port: 7401,
            interface_id: 0,
            bit_width: 8,
        };
        let loc = template.synthesize(&[0, 2]);
        assert_eq!(&loc.address[12..16], &[239, 0, 0, 0b0000_0101]);
        assert_eq!(loc.kind, LocatorKind::Multicast);
    }
}
