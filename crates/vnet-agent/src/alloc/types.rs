//! Allocator error, key and statistics types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What a label allocation is for.
///
/// An interface may hold several labels at once (one per purpose), so the
/// purpose is part of the allocation key alongside the owning interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelPurpose {
    /// Bridging label advertised with the interface's MAC.
    L2,
    /// Routing label advertised with the interface's addresses.
    L3,
    /// Label for a service-VLAN sub-interface, keyed by tag.
    ServiceVlan(u16),
    /// Label for a VRF translation rule, keyed by rule id.
    VrfAssign(u32),
}

impl fmt::Display for LabelPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelPurpose::L2 => write!(f, "l2"),
            LabelPurpose::L3 => write!(f, "l3"),
            LabelPurpose::ServiceVlan(tag) => write!(f, "service-vlan:{}", tag),
            LabelPurpose::VrfAssign(id) => write!(f, "vrf-assign:{}", id),
        }
    }
}

/// Allocation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The id space has no free ids left.
    ///
    /// Exhaustion blocks activation of the requesting interface but never
    /// aborts the reconciliation pass.
    #[error("{space} id space exhausted (capacity {capacity})")]
    Exhausted { space: &'static str, capacity: u32 },
}

/// Counters exposed by the allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocStats {
    pub labels_held: u64,
    pub vxlan_ids_held: u64,
    pub tunnel_ids_held: u64,
    pub allocations: u64,
    pub releases: u64,
    pub exhaustions: u64,
}
