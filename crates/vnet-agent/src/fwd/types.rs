//! Keys and attributes for emitted forwarding state.

use crate::vrf::VrfName;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// MPLS-style service label issued by the allocator.
pub type Label = u32;

/// VXLAN network identifier.
pub type VxlanId = u32;

/// Overlay tunnel endpoint identifier.
pub type TunnelId = u32;

/// Key for an L3 route: a prefix within a routing domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub vrf: VrfName,
    pub prefix: vnet_types::IpPrefix,
}

impl RouteKey {
    pub fn new(vrf: impl Into<VrfName>, prefix: vnet_types::IpPrefix) -> Self {
        RouteKey {
            vrf: vrf.into(),
            prefix,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vrf, self.prefix)
    }
}

/// Key for an L2 bridge entry: a MAC within a routing domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BridgeRouteKey {
    pub vrf: VrfName,
    pub mac: vnet_types::MacAddress,
}

impl BridgeRouteKey {
    pub fn new(vrf: impl Into<VrfName>, mac: vnet_types::MacAddress) -> Self {
        BridgeRouteKey {
            vrf: vrf.into(),
            mac,
        }
    }
}

impl fmt::Display for BridgeRouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vrf, self.mac)
    }
}

/// Key identifying a next-hop object.
///
/// Next hops are created before any route references them and deleted only
/// after every referencing route has been withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NextHopKey {
    /// Traffic delivered straight to the interface.
    Interface { vif: Uuid },
    /// Traffic delivered to a tagged sub-interface (service VLAN).
    Vlan { vif: Uuid, tag: u16 },
    /// Flood next hop for broadcast/multicast on the interface's domain.
    Multicast { vif: Uuid },
}

impl fmt::Display for NextHopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextHopKey::Interface { vif } => write!(f, "if:{}", vif),
            NextHopKey::Vlan { vif, tag } => write!(f, "vlan:{}:{}", vif, tag),
            NextHopKey::Multicast { vif } => write!(f, "mcast:{}", vif),
        }
    }
}

/// Path preference advertised with a route.
///
/// Numeric values follow the control-plane convention: locally preferred
/// paths advertise 200, everything else 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathPreference {
    Low = 100,
    High = 200,
}

impl Default for PathPreference {
    fn default() -> Self {
        PathPreference::Low
    }
}

/// Attributes carried on an emitted L3 route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAttrs {
    /// Service label bound to the path, if any.
    pub label: Option<Label>,
    /// Whether the path participates in ECMP load balancing.
    pub ecmp: bool,
    /// Gateway for indirect routes; None for interface routes.
    pub gateway: Option<vnet_types::IpAddress>,
    /// Local path preference.
    pub preference: PathPreference,
    /// Whether flow policy applies to traffic on this route.
    pub policy: bool,
}

impl Default for RouteAttrs {
    fn default() -> Self {
        RouteAttrs {
            label: None,
            ecmp: false,
            gateway: None,
            preference: PathPreference::Low,
            policy: false,
        }
    }
}
