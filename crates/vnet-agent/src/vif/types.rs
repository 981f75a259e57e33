//! Virtual interface entry and supporting types.

use crate::fwd::{Label, PathPreference, TunnelId, VxlanId};
use crate::policy::{
    AllowedAddressPair, FloatingIp, PolicyList, SecurityGroupRef, ServiceVlan, StaticRoute,
    VrfAssignRule,
};
use crate::vrf::{VrfHandle, VrfName};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use vnet_types::{IpPrefix, Ipv4Address, Ipv6Address, MacAddress};

/// Interface identifier (stable across both provisioning origins).
pub type VifId = Uuid;

/// Bitmask of provisioning origins currently claiming an interface.
///
/// An entry exists while at least one origin claims it; full destruction
/// requires the mask to be empty and all forwarding state withdrawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin(u8);

impl Origin {
    /// The orchestration system (compute manager) origin.
    pub const INSTANCE: Origin = Origin(0b01);
    /// The configuration system origin.
    pub const CONFIG: Origin = Origin(0b10);

    pub const fn empty() -> Self {
        Origin(0)
    }

    pub const fn contains(&self, other: Origin) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Origin) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Origin) {
        self.0 &= !other.0;
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.contains(Origin::INSTANCE), self.contains(Origin::CONFIG)) {
            (true, true) => write!(f, "instance|config"),
            (true, false) => write!(f, "instance"),
            (false, true) => write!(f, "config"),
            (false, false) => write!(f, "none"),
        }
    }
}

/// How the interface attaches to the hypervisor dataplane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    #[default]
    Invalid,
    /// VM attached through a tap device.
    TapVm,
    /// VLAN sub-interface stacked on another virtual interface.
    VlanOnVif,
    /// VLAN sub-interface on a physical port.
    PhysicalVlan,
    /// Physical port identified by MAC.
    PhysicalMac,
    /// Port on an external top-of-rack switch.
    TorPort,
    /// Device local to the agent host (no hypervisor port).
    LocalDevice,
}

impl DeviceType {
    /// True when activation depends on a host device being present.
    pub const fn needs_device(&self) -> bool {
        matches!(
            self,
            DeviceType::TapVm
                | DeviceType::VlanOnVif
                | DeviceType::PhysicalVlan
                | DeviceType::PhysicalMac
        )
    }
}

/// What role the interface plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VifKind {
    #[default]
    Invalid,
    /// Ordinary VM port.
    Instance,
    /// Mid-chain port of a service chain.
    ServiceChain,
    /// Port of a managed service instance.
    ServiceInstance,
    /// Bare-metal server port behind a ToR.
    Baremetal,
    /// Gateway port; advertises its subnet for on-link resolution.
    Gateway,
}

/// Traffic direction for port mirroring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorDirection {
    Ingress,
    Egress,
    #[default]
    Both,
}

/// Port mirroring state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorState {
    pub enabled: bool,
    pub analyzer: String,
    pub direction: MirrorDirection,
}

/// Pre-merge view of the fields teardown needs.
///
/// Captured before a message merges so withdrawal can address the state
/// that was actually installed, not the state just configured.
#[derive(Debug, Clone)]
pub struct ActivationSnapshot {
    pub l2_active: bool,
    pub ipv4_active: bool,
    pub ipv6_active: bool,
    pub vrf_name: Option<VrfName>,
    pub mac: MacAddress,
    pub ipv4_addr: Ipv4Address,
    pub ipv6_addr: Ipv6Address,
    pub mdata_addr: Ipv4Address,
    pub subnet: Option<IpPrefix>,
}

/// One virtual interface: merged configuration plus runtime state.
#[derive(Debug)]
pub struct VifEntry {
    pub id: VifId,
    pub name: String,
    pub(crate) origin: Origin,

    // Identity and classification.
    pub device_type: DeviceType,
    pub kind: VifKind,
    pub vm_id: Option<Uuid>,
    pub vn_id: Option<Uuid>,

    // Addressing.
    pub vrf_name: Option<VrfName>,
    pub mac: MacAddress,
    pub ipv4_addr: Ipv4Address,
    pub ipv6_addr: Ipv6Address,
    /// Link-local (169.254/16) address serving the metadata proxy.
    pub mdata_addr: Ipv4Address,
    pub need_linklocal: bool,
    /// Subnet advertised for on-link resolution (Gateway kind).
    pub subnet: Option<IpPrefix>,

    // Forwarding switches. The `_explicit` flags record whether the value
    // was set by configuration or follows the process-wide default.
    pub bridging: bool,
    pub bridging_explicit: bool,
    pub layer3_forwarding: bool,
    pub layer3_forwarding_explicit: bool,
    pub policy_enabled: bool,
    pub ecmp: bool,
    pub dhcp_enabled: bool,
    pub admin_state: bool,
    pub local_preference: PathPreference,

    // Encapsulation.
    pub tx_vlan_tag: Option<u16>,
    pub rx_vlan_tag: Option<u16>,
    pub vxlan_id: Option<VxlanId>,
    pub vxlan_id_explicit: bool,

    pub mirror: MirrorState,

    // Operational inputs.
    pub device_ready: bool,

    // Runtime: resolved references and held resources.
    pub vrf: Option<VrfHandle>,
    pub l2_label: Option<Label>,
    pub l3_label: Option<Label>,
    pub tunnel_id: Option<TunnelId>,
    /// VXLAN id carved from the allocator when no explicit id is set.
    pub alloc_vxlan_id: Option<VxlanId>,

    // Runtime: what is currently programmed.
    pub l2_active: bool,
    pub ipv4_active: bool,
    pub ipv6_active: bool,
    pub nh_installed: bool,
    pub mcast_installed: bool,
    pub mdata_route_installed: bool,
    pub resolve_route_installed: bool,

    // Policy sub-lists.
    pub floating_ips: PolicyList<FloatingIp>,
    pub service_vlans: PolicyList<ServiceVlan>,
    pub static_routes: PolicyList<StaticRoute>,
    pub address_pairs: PolicyList<AllowedAddressPair>,
    pub security_groups: PolicyList<SecurityGroupRef>,
    pub vrf_assign_rules: PolicyList<VrfAssignRule>,
}

impl VifEntry {
    pub(crate) fn new(id: VifId) -> Self {
        VifEntry {
            id,
            name: String::new(),
            origin: Origin::empty(),
            device_type: DeviceType::default(),
            kind: VifKind::default(),
            vm_id: None,
            vn_id: None,
            vrf_name: None,
            mac: MacAddress::ZERO,
            ipv4_addr: Ipv4Address::UNSPECIFIED,
            ipv6_addr: Ipv6Address::UNSPECIFIED,
            mdata_addr: Ipv4Address::UNSPECIFIED,
            need_linklocal: false,
            subnet: None,
            bridging: true,
            bridging_explicit: false,
            layer3_forwarding: true,
            layer3_forwarding_explicit: false,
            policy_enabled: false,
            ecmp: false,
            dhcp_enabled: true,
            admin_state: true,
            local_preference: PathPreference::default(),
            tx_vlan_tag: None,
            rx_vlan_tag: None,
            vxlan_id: None,
            vxlan_id_explicit: false,
            mirror: MirrorState::default(),
            device_ready: false,
            vrf: None,
            l2_label: None,
            l3_label: None,
            tunnel_id: None,
            alloc_vxlan_id: None,
            l2_active: false,
            ipv4_active: false,
            ipv6_active: false,
            nh_installed: false,
            mcast_installed: false,
            mdata_route_installed: false,
            resolve_route_installed: false,
            floating_ips: PolicyList::new(),
            service_vlans: PolicyList::new(),
            static_routes: PolicyList::new(),
            address_pairs: PolicyList::new(),
            security_groups: PolicyList::new(),
            vrf_assign_rules: PolicyList::new(),
        }
    }

    /// Origins currently claiming this interface.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// True when the host-side device is present or not required.
    pub fn device_usable(&self) -> bool {
        !self.device_type.needs_device() || self.device_ready
    }

    /// L2 activation predicate.
    pub fn l2_eligible(&self) -> bool {
        self.vrf.is_some()
            && !self.mac.is_zero()
            && self.bridging
            && self.admin_state
            && self.device_usable()
            && self.device_type != DeviceType::Invalid
    }

    /// IPv4 activation predicate (implies the L2 predicate).
    pub fn ipv4_eligible(&self) -> bool {
        self.l2_eligible() && !self.ipv4_addr.is_unspecified() && self.layer3_forwarding
    }

    /// IPv6 activation predicate (implies the L2 predicate).
    pub fn ipv6_eligible(&self) -> bool {
        self.l2_eligible() && !self.ipv6_addr.is_unspecified() && self.layer3_forwarding
    }

    /// True when no origin claims the interface anymore.
    pub fn can_be_deleted(&self) -> bool {
        self.origin.is_empty()
    }

    /// True while any forwarding state or resource is still held.
    ///
    /// Destruction is deferred until this clears.
    pub fn has_forwarding_state(&self) -> bool {
        self.l2_active
            || self.ipv4_active
            || self.ipv6_active
            || self.nh_installed
            || self.mcast_installed
            || self.mdata_route_installed
            || self.resolve_route_installed
            || self.l2_label.is_some()
            || self.l3_label.is_some()
            || self.tunnel_id.is_some()
            || self.alloc_vxlan_id.is_some()
            || self.floating_ips.has_pending_state()
            || self.service_vlans.has_pending_state()
            || self.static_routes.has_pending_state()
            || self.address_pairs.has_pending_state()
            || self.security_groups.has_pending_state()
            || self.vrf_assign_rules.has_pending_state()
    }

    /// Label of the installed service VLAN routing into `vrf_name`.
    pub fn service_vlan_label(&self, vrf_name: &str) -> Option<Label> {
        self.service_vlans
            .iter()
            .find(|(_, slot)| slot.status.installed && slot.entry.vrf_name == vrf_name)
            .and_then(|(_, slot)| slot.entry.label)
    }

    /// Tag of the installed service VLAN routing into `vrf_name`.
    pub fn service_vlan_tag(&self, vrf_name: &str) -> Option<vnet_types::VlanId> {
        self.service_vlans
            .iter()
            .find(|(_, slot)| slot.status.installed && slot.entry.vrf_name == vrf_name)
            .map(|(tag, _)| *tag)
    }

    /// Number of configured floating IPs of each family (v4, v6).
    pub fn floating_ip_count(&self) -> (usize, usize) {
        let mut v4 = 0;
        let mut v6 = 0;
        for (addr, slot) in self.floating_ips.iter() {
            if slot.status.delete_pending {
                continue;
            }
            if addr.is_ipv4() {
                v4 += 1;
            } else {
                v6 += 1;
            }
        }
        (v4, v6)
    }

    /// Captures the fields a later teardown will need.
    pub(crate) fn snapshot(&self) -> ActivationSnapshot {
        ActivationSnapshot {
            l2_active: self.l2_active,
            ipv4_active: self.ipv4_active,
            ipv6_active: self.ipv6_active,
            vrf_name: self.vrf.as_ref().map(|v| v.name().to_string()),
            mac: self.mac,
            ipv4_addr: self.ipv4_addr,
            ipv6_addr: self.ipv6_addr,
            mdata_addr: self.mdata_addr,
            subnet: self.subnet,
        }
    }
}
