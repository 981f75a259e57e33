//! The six policy sub-list element types.
//!
//! Each type splits into configuration fields (compared by `same_config`)
//! and runtime fields (installed-side state, carried across in-place
//! updates by `carry_runtime`). Keys are chosen so the lists stay sorted
//! the way the ordered merge expects.

use crate::fwd::Label;
use crate::policy::list::PolicyEntry;
use crate::vrf::{VrfHandle, VrfName};
use uuid::Uuid;
use vnet_types::{IpAddress, IpPrefix, Ipv4Address, Ipv6Address, MacAddress, VlanId};

/// A floating IP bound to the interface.
///
/// Activation installs a host route in the floating VRF and, when the
/// interface is L2-active, an L2 binding for the interface MAC in that
/// VRF as well.
#[derive(Debug, Clone)]
pub struct FloatingIp {
    pub addr: IpAddress,
    pub vrf_name: VrfName,
    pub vn_id: Uuid,

    // Runtime.
    pub vrf: Option<VrfHandle>,
    pub l2_installed: bool,
}

impl FloatingIp {
    pub fn new(addr: IpAddress, vrf_name: impl Into<VrfName>, vn_id: Uuid) -> Self {
        FloatingIp {
            addr,
            vrf_name: vrf_name.into(),
            vn_id,
            vrf: None,
            l2_installed: false,
        }
    }
}

impl PolicyEntry for FloatingIp {
    type Key = IpAddress;

    fn key(&self) -> IpAddress {
        self.addr
    }

    fn same_config(&self, other: &Self) -> bool {
        self.vrf_name == other.vrf_name && self.vn_id == other.vn_id
    }

    fn carry_runtime(&mut self, old: &Self) {
        self.vrf = old.vrf.clone();
        self.l2_installed = old.l2_installed;
    }
}

/// A service-chain sub-interface on a VLAN tag.
///
/// Each service VLAN gets its own label and routes its addresses in a
/// dedicated service VRF through a tagged next hop.
#[derive(Debug, Clone)]
pub struct ServiceVlan {
    pub tag: VlanId,
    pub vrf_name: VrfName,
    pub addr: Ipv4Address,
    pub addr6: Ipv6Address,
    pub smac: MacAddress,
    pub dmac: MacAddress,

    // Runtime.
    pub vrf: Option<VrfHandle>,
    pub label: Option<Label>,
}

impl ServiceVlan {
    pub fn new(
        tag: VlanId,
        vrf_name: impl Into<VrfName>,
        addr: Ipv4Address,
        addr6: Ipv6Address,
        smac: MacAddress,
        dmac: MacAddress,
    ) -> Self {
        ServiceVlan {
            tag,
            vrf_name: vrf_name.into(),
            addr,
            addr6,
            smac,
            dmac,
            vrf: None,
            label: None,
        }
    }
}

impl PolicyEntry for ServiceVlan {
    type Key = VlanId;

    fn key(&self) -> VlanId {
        self.tag
    }

    fn same_config(&self, other: &Self) -> bool {
        self.vrf_name == other.vrf_name
            && self.addr == other.addr
            && self.addr6 == other.addr6
            && self.smac == other.smac
            && self.dmac == other.dmac
    }

    fn carry_runtime(&mut self, old: &Self) {
        self.vrf = old.vrf.clone();
        self.label = old.label;
    }
}

/// A route advertised on behalf of the interface.
///
/// The gateway is part of the key: several routes for the same prefix with
/// different gateways form an ECMP sibling group, and a change to any
/// sibling's ECMP flag republishes the whole group.
#[derive(Debug, Clone)]
pub struct StaticRoute {
    pub vrf_name: VrfName,
    pub prefix: IpPrefix,
    pub gateway: Option<IpAddress>,
    pub ecmp: bool,
}

impl StaticRoute {
    pub fn new(
        vrf_name: impl Into<VrfName>,
        prefix: IpPrefix,
        gateway: Option<IpAddress>,
        ecmp: bool,
    ) -> Self {
        StaticRoute {
            vrf_name: vrf_name.into(),
            prefix,
            gateway,
            ecmp,
        }
    }
}

impl PolicyEntry for StaticRoute {
    type Key = (VrfName, IpPrefix, Option<IpAddress>);

    fn key(&self) -> Self::Key {
        (self.vrf_name.clone(), self.prefix, self.gateway)
    }

    fn same_config(&self, other: &Self) -> bool {
        self.ecmp == other.ecmp
    }
}

/// An address the interface may source beyond its primary address.
///
/// A pair carrying its own MAC additionally gets an L2 binding for that
/// MAC while the interface is L2-active.
#[derive(Debug, Clone)]
pub struct AllowedAddressPair {
    pub vrf_name: VrfName,
    pub prefix: IpPrefix,
    pub mac: MacAddress,
    pub ecmp: bool,

    // Runtime.
    pub l2_installed: bool,
}

impl AllowedAddressPair {
    pub fn new(
        vrf_name: impl Into<VrfName>,
        prefix: IpPrefix,
        mac: MacAddress,
        ecmp: bool,
    ) -> Self {
        AllowedAddressPair {
            vrf_name: vrf_name.into(),
            prefix,
            mac,
            ecmp,
            l2_installed: false,
        }
    }
}

impl PolicyEntry for AllowedAddressPair {
    type Key = (VrfName, IpPrefix);

    fn key(&self) -> Self::Key {
        (self.vrf_name.clone(), self.prefix)
    }

    fn same_config(&self, other: &Self) -> bool {
        self.mac == other.mac && self.ecmp == other.ecmp
    }

    fn carry_runtime(&mut self, old: &Self) {
        self.l2_installed = old.l2_installed;
    }
}

/// A reference to a security group applied to the interface.
///
/// Resolution state is part of the configuration comparison: a group that
/// merely became resolvable must still trigger a re-apply.
#[derive(Debug, Clone)]
pub struct SecurityGroupRef {
    pub sg_id: Uuid,
    pub resolved: bool,
}

impl SecurityGroupRef {
    pub fn new(sg_id: Uuid, resolved: bool) -> Self {
        SecurityGroupRef { sg_id, resolved }
    }
}

impl PolicyEntry for SecurityGroupRef {
    type Key = Uuid;

    fn key(&self) -> Uuid {
        self.sg_id
    }

    fn same_config(&self, other: &Self) -> bool {
        self.resolved == other.resolved
    }
}

/// A rule steering matching traffic into another VRF.
#[derive(Debug, Clone)]
pub struct VrfAssignRule {
    pub id: u32,
    pub match_prefix: IpPrefix,
    pub vrf_name: VrfName,
    pub ignore_acl: bool,

    // Runtime.
    pub label: Option<Label>,
}

impl VrfAssignRule {
    pub fn new(
        id: u32,
        match_prefix: IpPrefix,
        vrf_name: impl Into<VrfName>,
        ignore_acl: bool,
    ) -> Self {
        VrfAssignRule {
            id,
            match_prefix,
            vrf_name: vrf_name.into(),
            ignore_acl,
            label: None,
        }
    }
}

impl PolicyEntry for VrfAssignRule {
    type Key = u32;

    fn key(&self) -> u32 {
        self.id
    }

    fn same_config(&self, other: &Self) -> bool {
        self.match_prefix == other.match_prefix
            && self.vrf_name == other.vrf_name
            && self.ignore_acl == other.ignore_acl
    }

    fn carry_runtime(&mut self, old: &Self) {
        self.label = old.label;
    }
}
