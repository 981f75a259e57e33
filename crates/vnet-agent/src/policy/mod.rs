//! Per-interface policy sub-lists.
//!
//! Each virtual interface carries six ordered policy sets (floating IPs,
//! service VLANs, static routes, allowed address pairs, security groups,
//! VRF translation rules). All six share the same lifecycle machinery:
//! elements are keyed, kept sorted, diffed against incoming configuration
//! with a single ordered merge, and carry installed/delete-pending state
//! so withdrawal is decoupled from removal.

mod list;
mod types;

pub use list::{EntryStatus, ListDelta, PolicyEntry, PolicyList, Slot};
pub use types::{
    AllowedAddressPair, FloatingIp, SecurityGroupRef, ServiceVlan, StaticRoute, VrfAssignRule,
};
