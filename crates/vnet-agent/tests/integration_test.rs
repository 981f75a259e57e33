//! End-to-end reconciliation tests against a recording emitter.
//!
//! These tests drive `VifOrch` with the same message sequences the agent
//! sees in production and assert on the exact forwarding calls (and their
//! order) reaching the dataplane seam.

use std::sync::{Arc, Mutex};

use uuid::Uuid;
use vnet_agent::{
    AllocConfig, BridgeRouteKey, DeviceType, FloatingIp, ForwardingEmitter,
    GlobalForwardingDefaults, LearnedAddressData, LinkStateData, NextHopKey, Origin, RouteAttrs,
    RouteKey, ServiceVlan, StaticRoute, VifConfigData, VifInstanceData, VifKind, VifMessage,
    VifOrch, VifOrchConfig, VxlanId,
};
use vnet_types::{IpAddress, IpPrefix, Ipv4Address, Ipv6Address, MacAddress, VlanId};

/// One call observed at the emitter seam.
#[derive(Debug, Clone, PartialEq)]
pub enum EmitterCall {
    CreateNextHop(NextHopKey),
    DeleteNextHop(NextHopKey),
    AddRoute(RouteKey, NextHopKey, RouteAttrs),
    DeleteRoute(RouteKey),
    AddBridgeRoute(BridgeRouteKey, NextHopKey, Option<VxlanId>),
    DeleteBridgeRoute(BridgeRouteKey),
    UpdateMulticast(Uuid),
    DeleteMulticast(Uuid),
}

/// Mock emitter recording every call in order.
pub struct MockEmitter {
    calls: Mutex<Vec<EmitterCall>>,
}

impl MockEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(MockEmitter {
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<EmitterCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&EmitterCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Index of the first call matching `pred`, panicking on a miss so
    /// ordering assertions read as plain comparisons.
    pub fn index_of(&self, what: &str, pred: impl Fn(&EmitterCall) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .position(|c| pred(c))
            .unwrap_or_else(|| panic!("no emitter call matching: {}", what))
    }

    fn record(&self, call: EmitterCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ForwardingEmitter for MockEmitter {
    fn create_next_hop(&self, nh: &NextHopKey) {
        self.record(EmitterCall::CreateNextHop(*nh));
    }

    fn delete_next_hop(&self, nh: &NextHopKey) {
        self.record(EmitterCall::DeleteNextHop(*nh));
    }

    fn add_route(&self, key: &RouteKey, nh: &NextHopKey, attrs: &RouteAttrs) {
        self.record(EmitterCall::AddRoute(key.clone(), *nh, attrs.clone()));
    }

    fn delete_route(&self, key: &RouteKey) {
        self.record(EmitterCall::DeleteRoute(key.clone()));
    }

    fn add_bridge_route(&self, key: &BridgeRouteKey, nh: &NextHopKey, vxlan: Option<VxlanId>) {
        self.record(EmitterCall::AddBridgeRoute(key.clone(), *nh, vxlan));
    }

    fn delete_bridge_route(&self, key: &BridgeRouteKey) {
        self.record(EmitterCall::DeleteBridgeRoute(key.clone()));
    }

    fn update_multicast(&self, vif: Uuid) {
        self.record(EmitterCall::UpdateMulticast(vif));
    }

    fn delete_multicast(&self, vif: Uuid) {
        self.record(EmitterCall::DeleteMulticast(vif));
    }
}

fn setup() -> (Arc<MockEmitter>, VifOrch) {
    let emitter = MockEmitter::new();
    let orch = VifOrch::new(VifOrchConfig::default(), emitter.clone());
    (emitter, orch)
}

fn vif(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn mac() -> MacAddress {
    "02:de:ad:be:ef:01".parse().unwrap()
}

fn addr4() -> Ipv4Address {
    "10.0.0.5".parse().unwrap()
}

fn host4(s: &str) -> IpPrefix {
    IpPrefix::host(s.parse::<IpAddress>().unwrap())
}

/// A ToR-attached port config: activates without a host device.
fn tor_config(vrf: &str) -> VifConfigData {
    VifConfigData {
        name: "port-1".to_string(),
        vrf_name: Some(vrf.to_string()),
        mac: Some(mac()),
        ipv4_addr: addr4(),
        device_type: DeviceType::TorPort,
        kind: VifKind::Instance,
        admin_state: true,
        dhcp_enabled: true,
        ..Default::default()
    }
}

fn config_msg(data: VifConfigData) -> VifMessage {
    VifMessage::Config(Box::new(data))
}

#[test]
fn test_activation_installs_l2_before_l3() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    let changed = orch.apply(id, config_msg(tor_config("blue")), &defaults);
    assert!(changed);

    let iface = NextHopKey::Interface { vif: id };
    let calls = emitter.calls();
    assert_eq!(
        calls,
        vec![
            EmitterCall::CreateNextHop(iface),
            EmitterCall::AddBridgeRoute(BridgeRouteKey::new("blue", mac()), iface, Some(1)),
            EmitterCall::CreateNextHop(NextHopKey::Multicast { vif: id }),
            EmitterCall::UpdateMulticast(id),
            EmitterCall::AddRoute(
                RouteKey::new("blue", host4("10.0.0.5")),
                iface,
                RouteAttrs {
                    label: Some(17),
                    ..Default::default()
                },
            ),
        ]
    );

    let entry = orch.get(&id).unwrap();
    assert!(entry.l2_active);
    assert!(entry.ipv4_active);
    assert!(!entry.ipv6_active);
    assert_eq!(entry.l2_label, Some(16));
    assert_eq!(entry.l3_label, Some(17));

    let stats = orch.stats();
    assert_eq!(stats.interfaces_created, 1);
    assert_eq!(stats.l2_activations, 1);
    assert_eq!(stats.ipv4_activations, 1);
    assert_eq!(stats.ipv6_activations, 0);
}

#[test]
fn test_replayed_config_is_a_noop() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    assert!(orch.apply(id, config_msg(tor_config("blue")), &defaults));
    emitter.clear();

    let changed = orch.apply(id, config_msg(tor_config("blue")), &defaults);
    assert!(!changed);
    assert!(emitter.calls().is_empty());
}

#[test]
fn test_tap_device_waits_for_link_state() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    let mut config = tor_config("blue");
    config.device_type = DeviceType::TapVm;
    orch.apply(id, config_msg(config), &defaults);

    // Device not up yet: nothing may reach the dataplane.
    assert!(emitter.calls().is_empty());
    assert!(!orch.get(&id).unwrap().l2_active);

    orch.apply(id, VifMessage::LinkState(LinkStateData { up: true }), &defaults);
    assert!(orch.get(&id).unwrap().l2_active);
    assert!(orch.get(&id).unwrap().ipv4_active);

    emitter.clear();
    orch.apply(id, VifMessage::LinkState(LinkStateData { up: false }), &defaults);
    assert!(!orch.get(&id).unwrap().l2_active);
    assert!(emitter.count(|c| matches!(c, EmitterCall::DeleteRoute(_))) >= 1);
    assert_eq!(orch.allocator().stats().labels_held, 0);
}

#[test]
fn test_unknown_vrf_holds_activation_until_resync() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);

    orch.apply(id, config_msg(tor_config("red")), &defaults);
    assert!(emitter.calls().is_empty());
    assert!(!orch.get(&id).unwrap().l2_active);
    assert_eq!(orch.allocator().stats().labels_held, 0);

    // The VRF appears; a resync nudge brings the interface up.
    orch.vrfs_mut().add("red");
    let changed = orch.apply(id, VifMessage::GlobalDefaults, &defaults);
    assert!(changed);
    assert!(orch.get(&id).unwrap().l2_active);
    assert!(orch.get(&id).unwrap().ipv4_active);
    assert_eq!(emitter.count(|c| matches!(c, EmitterCall::AddRoute(..))), 1);
}

#[test]
fn test_vrf_loss_tears_down_in_order() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");
    orch.vrfs_mut().add("public");

    let mut config = tor_config("blue");
    config.vxlan_id = Some(7001);
    config.floating_ips = vec![FloatingIp::new(
        "200.1.1.1".parse().unwrap(),
        "public",
        vif(9),
    )];
    orch.apply(id, config_msg(config), &defaults);
    assert!(orch.get(&id).unwrap().ipv4_active);
    assert_eq!(orch.get(&id).unwrap().floating_ip_count(), (1, 0));

    orch.vrfs_mut().remove("blue");
    emitter.clear();
    orch.apply(id, VifMessage::GlobalDefaults, &defaults);

    // Dependent state leaves first, then the primary route, then next hops.
    let fip_del = emitter.index_of("fip withdraw", |c| {
        *c == EmitterCall::DeleteRoute(RouteKey::new("public", host4("200.1.1.1")))
    });
    let primary_del = emitter.index_of("primary withdraw", |c| {
        *c == EmitterCall::DeleteRoute(RouteKey::new("blue", host4("10.0.0.5")))
    });
    let nh_del = emitter.index_of("next hop delete", |c| {
        *c == EmitterCall::DeleteNextHop(NextHopKey::Interface { vif: id })
    });
    assert!(fip_del < primary_del);
    assert!(primary_del < nh_del);

    let entry = orch.get(&id).unwrap();
    assert!(!entry.l2_active);
    assert!(!entry.ipv4_active);
    let alloc = orch.allocator().stats();
    assert_eq!(alloc.labels_held, 0);
    assert_eq!(alloc.tunnel_ids_held, 0);

    let stats = orch.stats();
    assert_eq!(stats.l2_deactivations, 1);
    assert_eq!(stats.ipv4_deactivations, 1);
}

#[test]
fn test_ecmp_flip_republishes_sibling_group() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    let prefix: IpPrefix = "192.168.5.0/24".parse().unwrap();
    let gw1: IpAddress = "10.0.0.1".parse().unwrap();
    let gw2: IpAddress = "10.0.0.2".parse().unwrap();

    let mut config = tor_config("blue");
    config.static_routes = vec![
        StaticRoute::new("blue", prefix, Some(gw1), false),
        StaticRoute::new("blue", prefix, Some(gw2), false),
    ];
    orch.apply(id, config_msg(config.clone()), &defaults);
    let sibling_adds = |c: &EmitterCall| {
        matches!(c, EmitterCall::AddRoute(key, _, _) if *key == RouteKey::new("blue", prefix))
    };
    assert_eq!(emitter.count(sibling_adds), 2);

    // Flip ECMP on one sibling only.
    emitter.clear();
    config.static_routes[0].ecmp = true;
    let changed = orch.apply(id, config_msg(config), &defaults);
    assert!(changed);

    // The changed sibling is withdrawn and the whole group re-published.
    assert_eq!(
        emitter.count(|c| *c == EmitterCall::DeleteRoute(RouteKey::new("blue", prefix))),
        1
    );
    assert_eq!(emitter.count(sibling_adds), 2);
    // The primary host route was not touched.
    assert_eq!(
        emitter.count(
            |c| matches!(c, EmitterCall::AddRoute(key, _, _) if *key == RouteKey::new("blue", host4("10.0.0.5")))
        ),
        0
    );
}

#[test]
fn test_config_conflict_with_instance_identity_is_dropped() {
    let (_emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);

    orch.apply(
        id,
        VifMessage::Instance(VifInstanceData {
            name: "tap1".to_string(),
            mac: Some("02:aa:aa:aa:aa:01".parse().unwrap()),
            device_type: DeviceType::TorPort,
            kind: VifKind::Instance,
            ..Default::default()
        }),
        &defaults,
    );

    let mut config = tor_config("blue");
    config.mac = Some("02:bb:bb:bb:bb:02".parse().unwrap());
    orch.apply(id, config_msg(config), &defaults);

    assert_eq!(orch.get(&id).unwrap().mac, "02:aa:aa:aa:aa:01".parse().unwrap());
    assert_eq!(orch.stats().conflicts_dropped, 1);
}

#[test]
fn test_entry_survives_until_both_origins_withdraw() {
    let (_emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    orch.apply(id, config_msg(tor_config("blue")), &defaults);
    orch.apply(
        id,
        VifMessage::Instance(VifInstanceData {
            vm_id: Some(vif(42)),
            mac: Some(mac()),
            device_type: DeviceType::TorPort,
            kind: VifKind::Instance,
            ..Default::default()
        }),
        &defaults,
    );
    assert!(orch.get(&id).unwrap().ipv4_active);

    // Configuration withdraws: forwarding state goes, the entry stays.
    let destroyed = orch.delete(id, Origin::CONFIG);
    assert!(!destroyed);
    let entry = orch.get(&id).unwrap();
    assert!(entry.origin().contains(Origin::INSTANCE));
    assert!(!entry.l2_active);
    assert!(!entry.has_forwarding_state());
    assert_eq!(orch.allocator().stats().labels_held, 0);

    // Orchestration withdraws: full destruction, unused VRFs reaped.
    let destroyed = orch.delete(id, Origin::INSTANCE);
    assert!(destroyed);
    assert!(orch.get(&id).is_none());
    assert!(orch.vrfs().is_empty());
    assert_eq!(orch.stats().interfaces_destroyed, 1);
}

#[test]
fn test_floating_ip_add_and_remove_while_active() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");
    orch.vrfs_mut().add("public");

    let mut config = tor_config("blue");
    config.vxlan_id = Some(7001);
    orch.apply(id, config_msg(config.clone()), &defaults);
    emitter.clear();

    // Add a floating IP to the running interface.
    let fip_addr: IpAddress = "200.1.1.1".parse().unwrap();
    config.floating_ips = vec![FloatingIp::new(fip_addr, "public", vif(9))];
    orch.apply(id, config_msg(config.clone()), &defaults);

    let iface = NextHopKey::Interface { vif: id };
    assert_eq!(
        emitter.calls(),
        vec![
            EmitterCall::AddRoute(
                RouteKey::new("public", host4("200.1.1.1")),
                iface,
                RouteAttrs {
                    label: Some(17),
                    ..Default::default()
                },
            ),
            EmitterCall::AddBridgeRoute(
                BridgeRouteKey::new("public", mac()),
                iface,
                Some(7001),
            ),
        ]
    );
    assert_eq!(orch.get(&id).unwrap().floating_ip_count(), (1, 0));

    // Remove it again: both legs withdrawn, element purged.
    emitter.clear();
    config.floating_ips.clear();
    orch.apply(id, config_msg(config), &defaults);
    assert_eq!(
        emitter.count(|c| *c == EmitterCall::DeleteRoute(RouteKey::new("public", host4("200.1.1.1")))),
        1
    );
    assert_eq!(
        emitter.count(
            |c| *c == EmitterCall::DeleteBridgeRoute(BridgeRouteKey::new("public", mac()))
        ),
        1
    );
    assert_eq!(orch.get(&id).unwrap().floating_ip_count(), (0, 0));
    // Primary state untouched.
    assert!(orch.get(&id).unwrap().ipv4_active);
}

#[test]
fn test_service_vlan_lifecycle() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");
    orch.vrfs_mut().add("svc");

    let tag = VlanId::new(100).unwrap();
    let mut config = tor_config("blue");
    config.service_vlans = vec![ServiceVlan::new(
        tag,
        "svc",
        "3.3.3.3".parse().unwrap(),
        Ipv6Address::UNSPECIFIED,
        "02:00:00:00:00:01".parse().unwrap(),
        "02:00:00:00:00:02".parse().unwrap(),
    )];
    orch.apply(id, config_msg(config.clone()), &defaults);

    let vlan_nh = NextHopKey::Vlan { vif: id, tag: 100 };
    let entry = orch.get(&id).unwrap();
    // l2=16, l3=17, service vlan next.
    assert_eq!(entry.service_vlan_label("svc"), Some(18));
    assert_eq!(entry.service_vlan_tag("svc"), Some(tag));
    assert_eq!(
        emitter.count(|c| *c == EmitterCall::CreateNextHop(vlan_nh)),
        1
    );
    assert_eq!(
        emitter.count(|c| matches!(
            c,
            EmitterCall::AddRoute(key, nh, attrs)
                if *key == RouteKey::new("svc", host4("3.3.3.3"))
                    && *nh == vlan_nh
                    && attrs.label == Some(18)
        )),
        1
    );

    // Drop the service VLAN: routes, next hop and label all released.
    emitter.clear();
    config.service_vlans.clear();
    orch.apply(id, config_msg(config), &defaults);
    assert_eq!(
        emitter.count(|c| *c == EmitterCall::DeleteRoute(RouteKey::new("svc", host4("3.3.3.3")))),
        1
    );
    assert_eq!(
        emitter.count(|c| *c == EmitterCall::DeleteNextHop(vlan_nh)),
        1
    );
    let entry = orch.get(&id).unwrap();
    assert_eq!(entry.service_vlan_label("svc"), None);
    assert_eq!(orch.allocator().stats().labels_held, 2);
}

#[test]
fn test_global_bridging_default_gates_activation() {
    let (emitter, mut orch) = setup();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    let defaults = GlobalForwardingDefaults {
        bridging: false,
        ..Default::default()
    };
    orch.apply(id, config_msg(tor_config("blue")), &defaults);
    assert!(emitter.calls().is_empty());
    assert!(!orch.get(&id).unwrap().l2_active);

    // Defaults flip; every interface gets the nudge individually.
    let defaults = GlobalForwardingDefaults::default();
    let changed = orch.apply(id, VifMessage::GlobalDefaults, &defaults);
    assert!(changed);
    assert!(orch.get(&id).unwrap().l2_active);
    assert!(orch.get(&id).unwrap().ipv4_active);
}

#[test]
fn test_label_exhaustion_downgrades_not_aborts() {
    let emitter = MockEmitter::new();
    let config = VifOrchConfig {
        alloc: AllocConfig {
            label_capacity: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut orch = VifOrch::new(config, emitter.clone());
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    orch.apply(id, config_msg(tor_config("blue")), &defaults);

    // The single label went to L2; L3 activation is held back.
    let entry = orch.get(&id).unwrap();
    assert!(entry.l2_active);
    assert!(!entry.ipv4_active);
    assert_eq!(emitter.count(|c| matches!(c, EmitterCall::AddRoute(..))), 0);
    assert_eq!(
        emitter.count(|c| matches!(c, EmitterCall::AddBridgeRoute(..))),
        1
    );
    assert_eq!(orch.stats().resource_failures, 1);
    assert_eq!(orch.allocator().stats().exhaustions, 1);
}

#[test]
fn test_vxlan_exhaustion_downgrades_not_aborts() {
    let emitter = MockEmitter::new();
    let config = VifOrchConfig {
        alloc: AllocConfig {
            vxlan_capacity: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut orch = VifOrch::new(config, emitter.clone());
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    orch.apply(id, config_msg(tor_config("blue")), &defaults);

    // No implicit VXLAN id available: activation is held back entirely.
    let entry = orch.get(&id).unwrap();
    assert!(!entry.l2_active);
    assert!(!entry.ipv4_active);
    assert_eq!(
        emitter.count(|c| matches!(c, EmitterCall::AddBridgeRoute(..))),
        0
    );
    assert_eq!(emitter.count(|c| matches!(c, EmitterCall::AddRoute(..))), 0);
    assert_eq!(orch.stats().resource_failures, 1);
    assert_eq!(orch.allocator().stats().exhaustions, 1);

    // An explicit id sidesteps the exhausted space on the next message.
    let mut config = tor_config("blue");
    config.vxlan_id = Some(7001);
    orch.apply(id, config_msg(config), &defaults);
    assert!(orch.get(&id).unwrap().l2_active);
    assert!(orch.get(&id).unwrap().ipv4_active);
    assert_eq!(
        emitter.count(|c| matches!(c, EmitterCall::AddBridgeRoute(_, _, Some(7001)))),
        1
    );
}

#[test]
fn test_explicit_vxlan_id_releases_the_implicit_one() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    orch.apply(id, config_msg(tor_config("blue")), &defaults);
    assert_eq!(orch.allocator().stats().vxlan_ids_held, 1);
    assert_eq!(
        emitter.count(|c| matches!(c, EmitterCall::AddBridgeRoute(_, _, Some(1)))),
        1
    );

    // Configuring an explicit id returns the allocator-held one.
    emitter.clear();
    let mut config = tor_config("blue");
    config.vxlan_id = Some(7001);
    orch.apply(id, config_msg(config), &defaults);
    assert_eq!(orch.allocator().stats().vxlan_ids_held, 0);
    assert_eq!(
        emitter.count(|c| matches!(c, EmitterCall::AddBridgeRoute(_, _, Some(7001)))),
        1
    );
    assert!(orch.get(&id).unwrap().l2_active);
    assert!(orch.get(&id).unwrap().ipv4_active);
}

#[test]
fn test_learned_address_replaces_host_route() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    orch.apply(id, config_msg(tor_config("blue")), &defaults);
    emitter.clear();

    orch.apply(
        id,
        VifMessage::LearnedAddress(LearnedAddressData {
            ipv4_addr: "10.0.0.99".parse().unwrap(),
        }),
        &defaults,
    );

    assert_eq!(
        emitter.count(|c| *c == EmitterCall::DeleteRoute(RouteKey::new("blue", host4("10.0.0.5")))),
        1
    );
    assert_eq!(
        emitter.count(
            |c| matches!(c, EmitterCall::AddRoute(key, _, _) if *key == RouteKey::new("blue", host4("10.0.0.99")))
        ),
        1
    );
    // The interface next hop survives a forced refresh.
    assert_eq!(
        emitter.count(|c| matches!(c, EmitterCall::DeleteNextHop(NextHopKey::Interface { .. }))),
        0
    );
    assert!(orch.get(&id).unwrap().ipv4_active);
}

#[test]
fn test_gateway_port_metadata_and_resolve_routes() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    let subnet: IpPrefix = "10.1.0.0/24".parse().unwrap();
    let mut config = tor_config("blue");
    config.kind = VifKind::Gateway;
    config.subnet = Some(subnet);
    config.need_linklocal = true;
    config.mdata_addr = "169.254.0.3".parse().unwrap();
    orch.apply(id, config_msg(config.clone()), &defaults);

    // Metadata proxy route lands in the fabric VRF without flow policy.
    assert_eq!(
        emitter.count(|c| matches!(
            c,
            EmitterCall::AddRoute(key, _, attrs)
                if *key == RouteKey::new("fabric", host4("169.254.0.3")) && !attrs.policy
        )),
        1
    );
    // Subnet resolve route lands in the tenant VRF.
    assert_eq!(
        emitter.count(
            |c| matches!(c, EmitterCall::AddRoute(key, _, _) if *key == RouteKey::new("blue", subnet))
        ),
        1
    );

    // Admin down: metadata route leaves before the primary host route.
    emitter.clear();
    config.admin_state = false;
    orch.apply(id, config_msg(config), &defaults);
    let mdata_del = emitter.index_of("mdata withdraw", |c| {
        *c == EmitterCall::DeleteRoute(RouteKey::new("fabric", host4("169.254.0.3")))
    });
    let primary_del = emitter.index_of("primary withdraw", |c| {
        *c == EmitterCall::DeleteRoute(RouteKey::new("blue", host4("10.0.0.5")))
    });
    assert!(mdata_del < primary_del);
    assert_eq!(
        emitter.count(|c| *c == EmitterCall::DeleteRoute(RouteKey::new("blue", subnet))),
        1
    );
    assert!(!orch.get(&id).unwrap().has_forwarding_state());
}

#[test]
fn test_multicast_membership_follows_l2() {
    let (emitter, mut orch) = setup();
    let defaults = GlobalForwardingDefaults::default();
    let id = vif(1);
    orch.vrfs_mut().add("blue");

    orch.apply(id, config_msg(tor_config("blue")), &defaults);
    assert_eq!(emitter.count(|c| *c == EmitterCall::UpdateMulticast(id)), 1);

    emitter.clear();
    let mut config = tor_config("blue");
    config.bridging = Some(false);
    orch.apply(id, config_msg(config), &defaults);
    assert_eq!(emitter.count(|c| *c == EmitterCall::DeleteMulticast(id)), 1);
    assert_eq!(
        emitter.count(|c| *c == EmitterCall::DeleteNextHop(NextHopKey::Multicast { vif: id })),
        1
    );
    assert!(!orch.get(&id).unwrap().l2_active);
}
