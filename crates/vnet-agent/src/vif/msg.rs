//! Update messages and their merge semantics.
//!
//! Messages from the two provisioning origins carry partial views of an
//! interface. Merging is pure bookkeeping: it updates the entry's
//! configuration, reconciles the policy sub-lists and reports whether
//! anything changed and whether installed state must be force-refreshed.
//! No forwarding state moves here; that happens in the apply pass.

use crate::fwd::{PathPreference, VxlanId};
use crate::policy::{
    AllowedAddressPair, FloatingIp, SecurityGroupRef, ServiceVlan, StaticRoute, VrfAssignRule,
};
use crate::vif::types::{DeviceType, MirrorDirection, MirrorState, Origin, VifEntry, VifKind};
use crate::vrf::VrfName;
use uuid::Uuid;
use vnet_types::{IpPrefix, Ipv4Address, Ipv6Address, MacAddress};

/// Process-wide forwarding defaults.
///
/// Interfaces without an explicit per-interface override follow these;
/// a defaults change is delivered as [`VifMessage::GlobalDefaults`] per
/// interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalForwardingDefaults {
    pub bridging: bool,
    pub layer3_forwarding: bool,
    pub vxlan_id: Option<VxlanId>,
}

impl Default for GlobalForwardingDefaults {
    fn default() -> Self {
        GlobalForwardingDefaults {
            bridging: true,
            layer3_forwarding: true,
            vxlan_id: None,
        }
    }
}

/// Full interface view from the configuration system.
#[derive(Debug, Clone, Default)]
pub struct VifConfigData {
    pub name: String,
    pub vm_id: Option<Uuid>,
    pub vn_id: Option<Uuid>,
    pub vrf_name: Option<VrfName>,
    pub mac: Option<MacAddress>,
    pub ipv4_addr: Ipv4Address,
    pub ipv6_addr: Ipv6Address,
    pub mdata_addr: Ipv4Address,
    pub need_linklocal: bool,
    pub subnet: Option<IpPrefix>,
    pub device_type: DeviceType,
    pub kind: VifKind,
    /// None follows the process-wide default.
    pub bridging: Option<bool>,
    /// None follows the process-wide default.
    pub layer3_forwarding: Option<bool>,
    /// None follows the process-wide default.
    pub vxlan_id: Option<VxlanId>,
    pub policy_enabled: bool,
    pub ecmp: bool,
    pub dhcp_enabled: bool,
    pub admin_state: bool,
    pub local_preference: PathPreference,
    pub tx_vlan_tag: Option<u16>,
    pub rx_vlan_tag: Option<u16>,
    pub floating_ips: Vec<FloatingIp>,
    pub service_vlans: Vec<ServiceVlan>,
    pub static_routes: Vec<StaticRoute>,
    pub address_pairs: Vec<AllowedAddressPair>,
    pub security_groups: Vec<SecurityGroupRef>,
    pub vrf_assign_rules: Vec<VrfAssignRule>,
}

/// Port view from the orchestration (compute) system.
#[derive(Debug, Clone, Default)]
pub struct VifInstanceData {
    pub name: String,
    pub vm_id: Option<Uuid>,
    pub mac: Option<MacAddress>,
    pub ipv4_addr: Ipv4Address,
    pub ipv6_addr: Ipv6Address,
    pub tx_vlan_tag: Option<u16>,
    pub rx_vlan_tag: Option<u16>,
    pub device_type: DeviceType,
    pub kind: VifKind,
}

/// Address observed on the wire (DHCP snooping or traffic learning).
#[derive(Debug, Clone, Copy)]
pub struct LearnedAddressData {
    pub ipv4_addr: Ipv4Address,
}

/// Host device link transition.
#[derive(Debug, Clone, Copy)]
pub struct LinkStateData {
    pub up: bool,
}

/// Mirroring configuration update.
#[derive(Debug, Clone)]
pub struct MirrorData {
    pub enabled: bool,
    pub analyzer: String,
    pub direction: MirrorDirection,
}

/// An update addressed to one interface.
#[derive(Debug, Clone)]
pub enum VifMessage {
    Config(Box<VifConfigData>),
    Instance(VifInstanceData),
    LearnedAddress(LearnedAddressData),
    LinkState(LinkStateData),
    Mirror(MirrorData),
    /// Re-evaluate against the current process-wide defaults. Also serves
    /// as a plain resync trigger (e.g., after a VRF appears).
    GlobalDefaults,
}

impl VifMessage {
    /// True for message kinds allowed to create a new entry.
    pub(crate) fn creates(&self) -> bool {
        matches!(self, VifMessage::Config(_) | VifMessage::Instance(_))
    }
}

/// What a merge did to the entry.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MergeOutcome {
    /// Any configuration changed.
    pub changed: bool,
    /// Installed state must be withdrawn and re-emitted even without an
    /// activation edge (attribute or identity change).
    pub force: bool,
    /// Part of the message was dropped due to a conflicting origin claim.
    pub conflict: bool,
}

impl MergeOutcome {
    fn set(&mut self, changed: bool) {
        self.changed |= changed;
    }

    fn set_force(&mut self, changed: bool) {
        self.changed |= changed;
        self.force |= changed;
    }
}

fn assign<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        false
    } else {
        *field = value;
        true
    }
}

impl VifConfigData {
    pub(crate) fn merge_into(
        self,
        entry: &mut VifEntry,
        defaults: &GlobalForwardingDefaults,
    ) -> MergeOutcome {
        let mut out = MergeOutcome::default();
        entry.origin.insert(Origin::CONFIG);

        // Identity fields are owned by the orchestration origin once it
        // claims the interface; conflicting values from configuration are
        // dropped, not applied.
        let instance_claims = entry.origin.contains(Origin::INSTANCE);

        if let Some(mac) = self.mac {
            if entry.mac != mac {
                if instance_claims && !entry.mac.is_zero() {
                    out.conflict = true;
                } else {
                    entry.mac = mac;
                    out.set_force(true);
                }
            }
        }

        if self.device_type != DeviceType::Invalid && entry.device_type != self.device_type {
            if instance_claims && entry.device_type != DeviceType::Invalid {
                out.conflict = true;
            } else {
                entry.device_type = self.device_type;
                out.set(true);
            }
        }

        if self.kind != VifKind::Invalid && entry.kind != self.kind {
            if instance_claims && entry.kind != VifKind::Invalid {
                out.conflict = true;
            } else {
                entry.kind = self.kind;
                out.set(true);
            }
        }

        if let Some(vm_id) = self.vm_id {
            if entry.vm_id != Some(vm_id) {
                if instance_claims && entry.vm_id.is_some() {
                    out.conflict = true;
                } else {
                    entry.vm_id = Some(vm_id);
                    out.set(true);
                }
            }
        }

        if self.tx_vlan_tag.is_some() && entry.tx_vlan_tag != self.tx_vlan_tag {
            if instance_claims && entry.tx_vlan_tag.is_some() {
                out.conflict = true;
            } else {
                entry.tx_vlan_tag = self.tx_vlan_tag;
                out.set(true);
            }
        }
        if self.rx_vlan_tag.is_some() && entry.rx_vlan_tag != self.rx_vlan_tag {
            if instance_claims && entry.rx_vlan_tag.is_some() {
                out.conflict = true;
            } else {
                entry.rx_vlan_tag = self.rx_vlan_tag;
                out.set(true);
            }
        }

        if !self.name.is_empty() {
            out.set(assign(&mut entry.name, self.name));
        }

        if let Some(vn_id) = self.vn_id {
            out.set(assign(&mut entry.vn_id, Some(vn_id)));
        }
        out.set(assign(&mut entry.vrf_name, self.vrf_name));

        if !self.ipv4_addr.is_unspecified() {
            out.set_force(assign(&mut entry.ipv4_addr, self.ipv4_addr));
        }
        if !self.ipv6_addr.is_unspecified() {
            out.set_force(assign(&mut entry.ipv6_addr, self.ipv6_addr));
        }
        out.set(assign(&mut entry.mdata_addr, self.mdata_addr));
        out.set(assign(&mut entry.need_linklocal, self.need_linklocal));
        out.set(assign(&mut entry.subnet, self.subnet));

        match self.bridging {
            Some(v) => {
                entry.bridging_explicit = true;
                out.set(assign(&mut entry.bridging, v));
            }
            None => {
                entry.bridging_explicit = false;
                out.set(assign(&mut entry.bridging, defaults.bridging));
            }
        }
        match self.layer3_forwarding {
            Some(v) => {
                entry.layer3_forwarding_explicit = true;
                out.set(assign(&mut entry.layer3_forwarding, v));
            }
            None => {
                entry.layer3_forwarding_explicit = false;
                out.set(assign(&mut entry.layer3_forwarding, defaults.layer3_forwarding));
            }
        }
        match self.vxlan_id {
            Some(v) => {
                entry.vxlan_id_explicit = true;
                out.set_force(assign(&mut entry.vxlan_id, Some(v)));
            }
            None => {
                entry.vxlan_id_explicit = false;
                out.set_force(assign(&mut entry.vxlan_id, defaults.vxlan_id));
            }
        }

        // Attribute changes that re-shape already-installed routes.
        out.set_force(assign(&mut entry.policy_enabled, self.policy_enabled));
        out.set_force(assign(&mut entry.ecmp, self.ecmp));
        out.set_force(assign(&mut entry.local_preference, self.local_preference));

        out.set(assign(&mut entry.dhcp_enabled, self.dhcp_enabled));
        out.set(assign(&mut entry.admin_state, self.admin_state));

        out.set(
            entry
                .floating_ips
                .reconcile(self.floating_ips.into_iter().collect())
                .changed(),
        );
        out.set(
            entry
                .service_vlans
                .reconcile(self.service_vlans.into_iter().collect())
                .changed(),
        );
        out.set(
            entry
                .static_routes
                .reconcile(self.static_routes.into_iter().collect())
                .changed(),
        );
        out.set(
            entry
                .address_pairs
                .reconcile(self.address_pairs.into_iter().collect())
                .changed(),
        );
        out.set(
            entry
                .security_groups
                .reconcile(self.security_groups.into_iter().collect())
                .changed(),
        );
        out.set(
            entry
                .vrf_assign_rules
                .reconcile(self.vrf_assign_rules.into_iter().collect())
                .changed(),
        );

        out
    }
}

impl VifInstanceData {
    pub(crate) fn merge_into(self, entry: &mut VifEntry) -> MergeOutcome {
        let mut out = MergeOutcome::default();
        entry.origin.insert(Origin::INSTANCE);

        if !self.name.is_empty() {
            out.set(assign(&mut entry.name, self.name));
        }
        if let Some(mac) = self.mac {
            out.set_force(assign(&mut entry.mac, mac));
        }
        if let Some(vm_id) = self.vm_id {
            out.set(assign(&mut entry.vm_id, Some(vm_id)));
        }
        if !self.ipv4_addr.is_unspecified() {
            out.set_force(assign(&mut entry.ipv4_addr, self.ipv4_addr));
        }
        if !self.ipv6_addr.is_unspecified() {
            out.set_force(assign(&mut entry.ipv6_addr, self.ipv6_addr));
        }
        if self.tx_vlan_tag.is_some() {
            out.set(assign(&mut entry.tx_vlan_tag, self.tx_vlan_tag));
        }
        if self.rx_vlan_tag.is_some() {
            out.set(assign(&mut entry.rx_vlan_tag, self.rx_vlan_tag));
        }
        if self.device_type != DeviceType::Invalid {
            out.set(assign(&mut entry.device_type, self.device_type));
        }
        if self.kind != VifKind::Invalid {
            out.set(assign(&mut entry.kind, self.kind));
        }

        out
    }
}

impl LearnedAddressData {
    pub(crate) fn merge_into(self, entry: &mut VifEntry) -> MergeOutcome {
        let mut out = MergeOutcome::default();
        // A learnt address replaces the advertised host route, so an
        // already-active interface needs a forced refresh.
        out.set_force(assign(&mut entry.ipv4_addr, self.ipv4_addr));
        out
    }
}

impl LinkStateData {
    pub(crate) fn merge_into(self, entry: &mut VifEntry) -> MergeOutcome {
        let mut out = MergeOutcome::default();
        out.set(assign(&mut entry.device_ready, self.up));
        out
    }
}

impl MirrorData {
    pub(crate) fn merge_into(self, entry: &mut VifEntry) -> MergeOutcome {
        let mut out = MergeOutcome::default();
        out.set(assign(
            &mut entry.mirror,
            MirrorState {
                enabled: self.enabled,
                analyzer: self.analyzer,
                direction: self.direction,
            },
        ));
        out
    }
}

/// Re-applies the process-wide defaults to fields without an explicit
/// per-interface override.
pub(crate) fn merge_defaults(
    entry: &mut VifEntry,
    defaults: &GlobalForwardingDefaults,
) -> MergeOutcome {
    let mut out = MergeOutcome::default();
    if !entry.bridging_explicit {
        out.set(assign(&mut entry.bridging, defaults.bridging));
    }
    if !entry.layer3_forwarding_explicit {
        out.set(assign(&mut entry.layer3_forwarding, defaults.layer3_forwarding));
    }
    if !entry.vxlan_id_explicit {
        out.set_force(assign(&mut entry.vxlan_id, defaults.vxlan_id));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry() -> VifEntry {
        VifEntry::new(Uuid::from_u128(1))
    }

    #[test]
    fn test_config_merge_claims_origin() {
        let mut e = entry();
        let out = VifConfigData {
            name: "port-1".to_string(),
            ..Default::default()
        }
        .merge_into(&mut e, &GlobalForwardingDefaults::default());

        assert!(out.changed);
        assert!(e.origin().contains(Origin::CONFIG));
        assert!(!e.origin().contains(Origin::INSTANCE));
        assert_eq!(e.name, "port-1");
    }

    #[test]
    fn test_config_cannot_override_instance_owned_mac() {
        let mut e = entry();
        VifInstanceData {
            mac: Some("02:aa:aa:aa:aa:01".parse().unwrap()),
            ..Default::default()
        }
        .merge_into(&mut e);

        let out = VifConfigData {
            mac: Some("02:bb:bb:bb:bb:02".parse().unwrap()),
            ..Default::default()
        }
        .merge_into(&mut e, &GlobalForwardingDefaults::default());

        assert!(out.conflict);
        assert_eq!(e.mac, "02:aa:aa:aa:aa:01".parse().unwrap());
    }

    #[test]
    fn test_config_seeds_identity_when_unclaimed() {
        let mut e = entry();
        let out = VifConfigData {
            mac: Some("02:bb:bb:bb:bb:02".parse().unwrap()),
            device_type: DeviceType::TapVm,
            kind: VifKind::Instance,
            ..Default::default()
        }
        .merge_into(&mut e, &GlobalForwardingDefaults::default());

        assert!(!out.conflict);
        assert!(out.force);
        assert_eq!(e.mac, "02:bb:bb:bb:bb:02".parse().unwrap());
        assert_eq!(e.device_type, DeviceType::TapVm);
    }

    #[test]
    fn test_defaults_fill_unset_switches() {
        let mut e = entry();
        let defaults = GlobalForwardingDefaults {
            bridging: false,
            layer3_forwarding: true,
            vxlan_id: Some(5000),
        };

        VifConfigData::default().merge_into(&mut e, &defaults);
        assert!(!e.bridging);
        assert!(!e.bridging_explicit);
        assert_eq!(e.vxlan_id, Some(5000));

        // Explicit override wins and sticks.
        VifConfigData {
            bridging: Some(true),
            ..Default::default()
        }
        .merge_into(&mut e, &defaults);
        assert!(e.bridging);
        assert!(e.bridging_explicit);

        let out = merge_defaults(&mut e, &GlobalForwardingDefaults::default());
        assert!(e.bridging);
        // vxlan follows the new default; bridging stays explicit.
        assert_eq!(e.vxlan_id, None);
        assert!(out.force);
    }

    #[test]
    fn test_attribute_changes_force_reinstall() {
        let mut e = entry();
        VifConfigData::default().merge_into(&mut e, &GlobalForwardingDefaults::default());

        let out = VifConfigData {
            policy_enabled: true,
            ..Default::default()
        }
        .merge_into(&mut e, &GlobalForwardingDefaults::default());
        assert!(out.force);

        let out = VifConfigData {
            policy_enabled: true,
            ..Default::default()
        }
        .merge_into(&mut e, &GlobalForwardingDefaults::default());
        assert!(!out.force);
        assert!(!out.changed);
    }

    #[test]
    fn test_learned_address_merge() {
        let mut e = entry();
        let out = LearnedAddressData {
            ipv4_addr: "10.0.0.8".parse().unwrap(),
        }
        .merge_into(&mut e);
        assert!(out.changed);
        assert_eq!(e.ipv4_addr, "10.0.0.8".parse().unwrap());

        let out = LearnedAddressData {
            ipv4_addr: "10.0.0.8".parse().unwrap(),
        }
        .merge_into(&mut e);
        assert!(!out.changed);
    }
}
