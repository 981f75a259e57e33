//! The reconciliation pass: one interface, one pass, full teardown and
//! build-up ordering.
//!
//! Tear-down goes L3 routes, then L2 state, then next hops, then resource
//! release. Build-up allocates resources first, then installs L2, then
//! L3. Policy sub-lists withdraw before the primary state they ride on is
//! touched and install after it settles.

use crate::alloc::LabelPurpose;
use crate::event::{TraceKind, TraceRecord};
use crate::fwd::{BridgeRouteKey, NextHopKey, RouteAttrs, RouteKey};
use crate::trace_log;
use crate::vif::orch::VifOrch;
use crate::vif::types::{ActivationSnapshot, VifEntry, VifId, VifKind};
use crate::vrf::VrfName;
use std::collections::BTreeSet;
use vnet_types::{IpAddress, IpPrefix};

impl VifOrch {
    /// Runs one reconciliation pass over the entry.
    ///
    /// `old` is the pre-merge snapshot; `force` re-emits installed state
    /// even without an activation edge.
    pub(crate) fn run_pass(&mut self, id: VifId, old: &ActivationSnapshot, force: bool) -> bool {
        // The entry leaves the table for the duration of the pass so the
        // pass can borrow the rest of the orchestrator freely.
        let Some(mut entry) = self.table.remove(&id) else {
            return false;
        };
        let changed = self.reconcile_entry(&mut entry, old, force);
        self.table.insert(id, entry);
        changed
    }

    fn reconcile_entry(&mut self, e: &mut VifEntry, old: &ActivationSnapshot, force: bool) -> bool {
        // Re-resolve the primary VRF binding from the current table.
        e.vrf = e.vrf_name.as_deref().and_then(|n| self.vrfs.find(n));
        let cur_vrf_name = e.vrf.as_ref().map(|v| v.name().to_string());

        // Re-homing to a different VRF re-emits everything.
        let force = force || (old.l2_active && cur_vrf_name != old.vrf_name);

        let mut new_l2 = e.l2_eligible();
        let mut new_v4 = e.ipv4_eligible();
        let mut new_v6 = e.ipv6_eligible();

        let mut changed = false;

        // ---- tear-down: policy lists, then L3, then L2 ----

        changed |= self.lists_withdraw(
            e,
            old,
            new_v4 && !force,
            new_v6 && !force,
            new_l2 && !force,
            force,
        );

        let iface_nh = NextHopKey::Interface { vif: e.id };

        let keep_mdata = new_v4 && e.need_linklocal && !e.mdata_addr.is_unspecified();
        if e.mdata_route_installed && (force || !keep_mdata || e.mdata_addr != old.mdata_addr) {
            self.emitter.delete_route(&RouteKey::new(
                self.config.fabric_vrf.clone(),
                IpPrefix::host(IpAddress::V4(old.mdata_addr)),
            ));
            e.mdata_route_installed = false;
            changed = true;
        }

        let keep_resolve = e.kind == VifKind::Gateway
            && match e.subnet {
                Some(subnet) => {
                    if subnet.is_ipv4() {
                        new_v4
                    } else {
                        new_v6
                    }
                }
                None => false,
            };
        if e.resolve_route_installed && (force || !keep_resolve || e.subnet != old.subnet) {
            if let (Some(vrf), Some(subnet)) = (&old.vrf_name, old.subnet) {
                self.emitter
                    .delete_route(&RouteKey::new(vrf.clone(), subnet));
            }
            e.resolve_route_installed = false;
            changed = true;
        }

        if e.ipv4_active && (force || !new_v4) {
            if let Some(vrf) = &old.vrf_name {
                self.emitter.delete_route(&RouteKey::new(
                    vrf.clone(),
                    IpPrefix::host(IpAddress::V4(old.ipv4_addr)),
                ));
            }
            e.ipv4_active = false;
            changed = true;
        }
        if e.ipv6_active && (force || !new_v6) {
            if let Some(vrf) = &old.vrf_name {
                self.emitter.delete_route(&RouteKey::new(
                    vrf.clone(),
                    IpPrefix::host(IpAddress::V6(old.ipv6_addr)),
                ));
            }
            e.ipv6_active = false;
            changed = true;
        }

        if e.l2_active && (force || !new_l2) {
            if let Some(vrf) = &old.vrf_name {
                self.emitter
                    .delete_bridge_route(&BridgeRouteKey::new(vrf.clone(), old.mac));
            }
            if e.mcast_installed {
                self.emitter.delete_multicast(e.id);
                self.emitter
                    .delete_next_hop(&NextHopKey::Multicast { vif: e.id });
                e.mcast_installed = false;
            }
            e.l2_active = false;
            changed = true;
        }

        if e.nh_installed && !new_l2 && !new_v4 && !new_v6 {
            self.emitter.delete_next_hop(&iface_nh);
            e.nh_installed = false;
            changed = true;
        }

        // ---- release resources no longer needed ----

        if !new_l2 {
            if e.l2_label.take().is_some() {
                self.alloc.release_label(e.id, LabelPurpose::L2);
                changed = true;
            }
            if e.tunnel_id.take().is_some() {
                self.alloc.release_tunnel(e.id);
                changed = true;
            }
            if e.alloc_vxlan_id.take().is_some() {
                self.alloc.release_vxlan(e.id);
                changed = true;
            }
        } else if e.vxlan_id.is_some() && e.alloc_vxlan_id.take().is_some() {
            // An explicit id supersedes the allocator-held one.
            self.alloc.release_vxlan(e.id);
            changed = true;
        }
        if !new_v4 && !new_v6 && e.l3_label.take().is_some() {
            self.alloc.release_label(e.id, LabelPurpose::L3);
            changed = true;
        }

        // ---- build-up: resources first ----

        if new_l2 && e.l2_label.is_none() {
            match self.alloc.allocate_label(e.id, LabelPurpose::L2) {
                Ok(label) => e.l2_label = Some(label),
                Err(err) => {
                    self.resource_failure(e, &err);
                    new_l2 = false;
                    new_v4 = false;
                    new_v6 = false;
                }
            }
        }
        if new_l2 && e.tunnel_id.is_none() {
            match self.alloc.allocate_tunnel(e.id) {
                Ok(tunnel) => e.tunnel_id = Some(tunnel),
                Err(err) => {
                    self.resource_failure(e, &err);
                    new_l2 = false;
                    new_v4 = false;
                    new_v6 = false;
                }
            }
        }
        if new_l2 && e.vxlan_id.is_none() && e.alloc_vxlan_id.is_none() {
            match self.alloc.allocate_vxlan(e.id) {
                Ok(vni) => e.alloc_vxlan_id = Some(vni),
                Err(err) => {
                    self.resource_failure(e, &err);
                    new_l2 = false;
                    new_v4 = false;
                    new_v6 = false;
                }
            }
        }
        if (new_v4 || new_v6) && e.l3_label.is_none() {
            match self.alloc.allocate_label(e.id, LabelPurpose::L3) {
                Ok(label) => e.l3_label = Some(label),
                Err(err) => {
                    self.resource_failure(e, &err);
                    new_v4 = false;
                    new_v6 = false;
                }
            }
        }

        // ---- install: L2 before L3 ----

        if new_l2 && (force || !e.l2_active) {
            if let Some(vrf) = e.vrf.clone() {
                if !e.nh_installed {
                    self.emitter.create_next_hop(&iface_nh);
                    e.nh_installed = true;
                }
                let vni = e.vxlan_id.or(e.alloc_vxlan_id);
                self.emitter.add_bridge_route(
                    &BridgeRouteKey::new(vrf.name(), e.mac),
                    &iface_nh,
                    vni,
                );
                self.emitter
                    .create_next_hop(&NextHopKey::Multicast { vif: e.id });
                self.emitter.update_multicast(e.id);
                e.mcast_installed = true;
                e.l2_active = true;
                changed = true;
            }
        }

        if new_v4 && (force || !e.ipv4_active) {
            if let Some(vrf) = e.vrf.clone() {
                if !e.nh_installed {
                    self.emitter.create_next_hop(&iface_nh);
                    e.nh_installed = true;
                }
                self.emitter.add_route(
                    &RouteKey::new(vrf.name(), IpPrefix::host(IpAddress::V4(e.ipv4_addr))),
                    &iface_nh,
                    &base_attrs(e),
                );
                e.ipv4_active = true;
                changed = true;
            }
        }
        if new_v6 && (force || !e.ipv6_active) {
            if let Some(vrf) = e.vrf.clone() {
                if !e.nh_installed {
                    self.emitter.create_next_hop(&iface_nh);
                    e.nh_installed = true;
                }
                self.emitter.add_route(
                    &RouteKey::new(vrf.name(), IpPrefix::host(IpAddress::V6(e.ipv6_addr))),
                    &iface_nh,
                    &base_attrs(e),
                );
                e.ipv6_active = true;
                changed = true;
            }
        }

        // Metadata proxy route lives in the fabric VRF, not the tenant VRF.
        if e.ipv4_active
            && e.need_linklocal
            && !e.mdata_addr.is_unspecified()
            && !e.mdata_route_installed
        {
            let mut attrs = base_attrs(e);
            attrs.policy = false;
            self.emitter.add_route(
                &RouteKey::new(
                    self.config.fabric_vrf.clone(),
                    IpPrefix::host(IpAddress::V4(e.mdata_addr)),
                ),
                &iface_nh,
                &attrs,
            );
            e.mdata_route_installed = true;
            changed = true;
        }

        // Gateway ports advertise their subnet for on-link resolution.
        if !e.resolve_route_installed && e.kind == VifKind::Gateway {
            if let (Some(vrf), Some(subnet)) = (e.vrf.clone(), e.subnet) {
                let family_active = if subnet.is_ipv4() {
                    e.ipv4_active
                } else {
                    e.ipv6_active
                };
                if family_active {
                    self.emitter.add_route(
                        &RouteKey::new(vrf.name(), subnet),
                        &iface_nh,
                        &base_attrs(e),
                    );
                    e.resolve_route_installed = true;
                    changed = true;
                }
            }
        }

        // ---- policy lists install, then purge completed withdrawals ----

        changed |= self.lists_install(e, old, force);
        changed |= self.lists_purge(e);

        // ---- activation edge accounting ----

        self.note_edges(e, old);

        changed
    }

    fn note_edges(&mut self, e: &VifEntry, old: &ActivationSnapshot) {
        let edges = [
            (
                old.l2_active,
                e.l2_active,
                TraceKind::ActivatedL2,
                TraceKind::DeactivatedL2,
            ),
            (
                old.ipv4_active,
                e.ipv4_active,
                TraceKind::ActivatedIpv4,
                TraceKind::DeactivatedIpv4,
            ),
            (
                old.ipv6_active,
                e.ipv6_active,
                TraceKind::ActivatedIpv6,
                TraceKind::DeactivatedIpv6,
            ),
        ];
        for (was, now, up, down) in edges {
            if was == now {
                continue;
            }
            let kind = if now { up } else { down };
            match kind {
                TraceKind::ActivatedL2 => self.stats.l2_activations += 1,
                TraceKind::DeactivatedL2 => self.stats.l2_deactivations += 1,
                TraceKind::ActivatedIpv4 => self.stats.ipv4_activations += 1,
                TraceKind::DeactivatedIpv4 => self.stats.ipv4_deactivations += 1,
                TraceKind::ActivatedIpv6 => self.stats.ipv6_activations += 1,
                TraceKind::DeactivatedIpv6 => self.stats.ipv6_deactivations += 1,
                _ => {}
            }
            let record = TraceRecord::new(kind, e.id.to_string())
                .with_name(e.name.clone())
                .with_details(edge_details(e));
            trace_log!(record);
        }
    }

    fn resource_failure(&mut self, e: &VifEntry, err: &crate::alloc::AllocError) {
        self.stats.resource_failures += 1;
        let record = TraceRecord::new(TraceKind::ResourceExhausted, e.id.to_string())
            .with_name(e.name.clone())
            .with_details(serde_json::json!({ "error": err.to_string() }));
        trace_log!(record);
    }

    /// Withdraws policy elements that are delete-pending, dirty, stale or
    /// whose carrier family is going down. Never installs anything.
    fn lists_withdraw(
        &mut self,
        e: &mut VifEntry,
        old: &ActivationSnapshot,
        v4_keep: bool,
        v6_keep: bool,
        l2_keep: bool,
        force: bool,
    ) -> bool {
        let mut changed = false;
        let id = e.id;

        // Floating IPs: an L3 host route per address, plus an L2 binding
        // for the interface MAC in the floating VRF while L2-active.
        for (addr, slot) in e.floating_ips.iter_mut() {
            let fam_keep = if addr.is_ipv4() { v4_keep } else { v6_keep };
            let withdraw = slot.status.installed
                && (force || slot.status.delete_pending || slot.status.dirty || !fam_keep);
            let installed_vrf = slot
                .entry
                .vrf
                .as_ref()
                .map(|v| v.name().to_string())
                .unwrap_or_else(|| slot.entry.vrf_name.clone());
            if withdraw {
                self.emitter
                    .delete_route(&RouteKey::new(installed_vrf.clone(), IpPrefix::host(*addr)));
                if slot.entry.l2_installed {
                    self.emitter
                        .delete_bridge_route(&BridgeRouteKey::new(installed_vrf, old.mac));
                    slot.entry.l2_installed = false;
                }
                slot.status.installed = false;
                changed = true;
                let record = TraceRecord::new(TraceKind::FloatingIpChange, id.to_string())
                    .with_details(serde_json::json!({ "addr": addr.to_string(), "op": "withdraw" }));
                trace_log!(record);
            } else if slot.entry.l2_installed && !l2_keep {
                self.emitter
                    .delete_bridge_route(&BridgeRouteKey::new(installed_vrf, old.mac));
                slot.entry.l2_installed = false;
                changed = true;
            }
        }

        // Service VLANs: routes in the service VRF through a tagged next
        // hop, plus a label of their own.
        for (tag, slot) in e.service_vlans.iter_mut() {
            let withdraw = slot.status.installed
                && (force
                    || slot.status.delete_pending
                    || slot.status.dirty
                    || !(v4_keep || v6_keep));
            if !withdraw {
                continue;
            }
            let installed_vrf = slot
                .entry
                .vrf
                .as_ref()
                .map(|v| v.name().to_string())
                .unwrap_or_else(|| slot.entry.vrf_name.clone());
            if !slot.entry.addr.is_unspecified() {
                self.emitter.delete_route(&RouteKey::new(
                    installed_vrf.clone(),
                    IpPrefix::host(IpAddress::V4(slot.entry.addr)),
                ));
            }
            if !slot.entry.addr6.is_unspecified() {
                self.emitter.delete_route(&RouteKey::new(
                    installed_vrf,
                    IpPrefix::host(IpAddress::V6(slot.entry.addr6)),
                ));
            }
            self.emitter.delete_next_hop(&NextHopKey::Vlan {
                vif: id,
                tag: tag.as_u16(),
            });
            self.alloc
                .release_label(id, LabelPurpose::ServiceVlan(tag.as_u16()));
            slot.entry.label = None;
            slot.status.installed = false;
            changed = true;
            let record = TraceRecord::new(TraceKind::ServiceChange, id.to_string())
                .with_details(serde_json::json!({ "tag": tag.as_u16(), "op": "withdraw" }));
            trace_log!(record);
        }

        // Static routes.
        for (_, slot) in e.static_routes.iter_mut() {
            let fam_keep = if slot.entry.prefix.is_ipv4() {
                v4_keep
            } else {
                v6_keep
            };
            if slot.status.installed
                && (force || slot.status.delete_pending || slot.status.dirty || !fam_keep)
            {
                self.emitter.delete_route(&RouteKey::new(
                    slot.entry.vrf_name.clone(),
                    slot.entry.prefix,
                ));
                slot.status.installed = false;
                changed = true;
            }
        }

        // Allowed address pairs.
        for (_, slot) in e.address_pairs.iter_mut() {
            let fam_keep = if slot.entry.prefix.is_ipv4() {
                v4_keep
            } else {
                v6_keep
            };
            let withdraw = slot.status.installed
                && (force || slot.status.delete_pending || slot.status.dirty || !fam_keep);
            if withdraw {
                self.emitter.delete_route(&RouteKey::new(
                    slot.entry.vrf_name.clone(),
                    slot.entry.prefix,
                ));
                if slot.entry.l2_installed {
                    self.emitter.delete_bridge_route(&BridgeRouteKey::new(
                        slot.entry.vrf_name.clone(),
                        slot.entry.mac,
                    ));
                    slot.entry.l2_installed = false;
                }
                slot.status.installed = false;
                changed = true;
            } else if slot.entry.l2_installed && !l2_keep {
                self.emitter.delete_bridge_route(&BridgeRouteKey::new(
                    slot.entry.vrf_name.clone(),
                    slot.entry.mac,
                ));
                slot.entry.l2_installed = false;
                changed = true;
            }
        }

        // Security groups carry no emitted state of their own.
        for (_, slot) in e.security_groups.iter_mut() {
            if slot.status.installed && (slot.status.delete_pending || slot.status.dirty) {
                slot.status.installed = false;
                changed = true;
            }
        }

        // VRF translation rules hold a label each.
        for (rule_id, slot) in e.vrf_assign_rules.iter_mut() {
            let withdraw = slot.status.installed
                && (force
                    || slot.status.delete_pending
                    || slot.status.dirty
                    || !(v4_keep || v6_keep));
            if withdraw {
                self.alloc
                    .release_label(id, LabelPurpose::VrfAssign(*rule_id));
                slot.entry.label = None;
                slot.status.installed = false;
                changed = true;
            }
        }

        changed
    }

    /// Installs eligible policy elements under the entry's settled
    /// activation flags, clearing dirty marks as it goes.
    fn lists_install(&mut self, e: &mut VifEntry, old: &ActivationSnapshot, force: bool) -> bool {
        let mut changed = false;
        let id = e.id;
        let iface_nh = NextHopKey::Interface { vif: id };
        let l2_active = e.l2_active;
        let v4_active = e.ipv4_active;
        let v6_active = e.ipv6_active;
        let mac = e.mac;
        let vxlan_id = e.vxlan_id.or(e.alloc_vxlan_id);
        let attrs = base_attrs(e);

        // Floating IPs.
        for (addr, slot) in e.floating_ips.iter_mut() {
            if slot.status.delete_pending {
                continue;
            }
            let fam_active = if addr.is_ipv4() { v4_active } else { v6_active };
            let resolved = self.vrfs.find(&slot.entry.vrf_name);
            slot.entry.vrf = resolved.clone();
            if let Some(vrf) = resolved {
                if fam_active && (!slot.status.installed || force) {
                    self.emitter.add_route(
                        &RouteKey::new(vrf.name(), IpPrefix::host(*addr)),
                        &iface_nh,
                        &attrs,
                    );
                    slot.status.installed = true;
                    changed = true;
                    let record = TraceRecord::new(TraceKind::FloatingIpChange, id.to_string())
                        .with_details(
                            serde_json::json!({ "addr": addr.to_string(), "op": "install" }),
                        );
                    trace_log!(record);
                }
                if slot.status.installed {
                    if l2_active && !slot.entry.l2_installed {
                        self.emitter.add_bridge_route(
                            &BridgeRouteKey::new(vrf.name(), mac),
                            &iface_nh,
                            vxlan_id,
                        );
                        slot.entry.l2_installed = true;
                        changed = true;
                    } else if !l2_active && slot.entry.l2_installed {
                        self.emitter
                            .delete_bridge_route(&BridgeRouteKey::new(vrf.name(), old.mac));
                        slot.entry.l2_installed = false;
                        changed = true;
                    }
                }
            }
            slot.status.dirty = false;
        }

        // Service VLANs.
        for (tag, slot) in e.service_vlans.iter_mut() {
            if slot.status.delete_pending {
                slot.status.dirty = false;
                continue;
            }
            let resolved = self.vrfs.find(&slot.entry.vrf_name);
            if let Some(vrf) = resolved {
                if (v4_active || v6_active) && (!slot.status.installed || force) {
                    let label = match self
                        .alloc
                        .allocate_label(id, LabelPurpose::ServiceVlan(tag.as_u16()))
                    {
                        Ok(label) => label,
                        Err(err) => {
                            self.stats.resource_failures += 1;
                            let record =
                                TraceRecord::new(TraceKind::ResourceExhausted, id.to_string())
                                    .with_details(serde_json::json!({
                                        "error": err.to_string(),
                                        "tag": tag.as_u16(),
                                    }));
                            trace_log!(record);
                            slot.status.dirty = false;
                            continue;
                        }
                    };
                    let vlan_nh = NextHopKey::Vlan {
                        vif: id,
                        tag: tag.as_u16(),
                    };
                    self.emitter.create_next_hop(&vlan_nh);
                    let mut svc_attrs = attrs.clone();
                    svc_attrs.label = Some(label);
                    if v4_active && !slot.entry.addr.is_unspecified() {
                        self.emitter.add_route(
                            &RouteKey::new(
                                vrf.name(),
                                IpPrefix::host(IpAddress::V4(slot.entry.addr)),
                            ),
                            &vlan_nh,
                            &svc_attrs,
                        );
                    }
                    if v6_active && !slot.entry.addr6.is_unspecified() {
                        self.emitter.add_route(
                            &RouteKey::new(
                                vrf.name(),
                                IpPrefix::host(IpAddress::V6(slot.entry.addr6)),
                            ),
                            &vlan_nh,
                            &svc_attrs,
                        );
                    }
                    slot.entry.label = Some(label);
                    slot.entry.vrf = Some(vrf);
                    slot.status.installed = true;
                    changed = true;
                    let record = TraceRecord::new(TraceKind::ServiceChange, id.to_string())
                        .with_details(serde_json::json!({ "tag": tag.as_u16(), "op": "install" }));
                    trace_log!(record);
                }
            }
            slot.status.dirty = false;
        }

        // Static routes: a change to any member of an ECMP sibling group
        // (same VRF and prefix) republishes the whole group.
        let touched: BTreeSet<(VrfName, IpPrefix)> = e
            .static_routes
            .iter()
            .filter(|(_, slot)| slot.status.dirty || slot.status.delete_pending)
            .map(|(_, slot)| (slot.entry.vrf_name.clone(), slot.entry.prefix))
            .collect();
        for (_, slot) in e.static_routes.iter_mut() {
            if slot.status.delete_pending {
                slot.status.dirty = false;
                continue;
            }
            let fam_active = if slot.entry.prefix.is_ipv4() {
                v4_active
            } else {
                v6_active
            };
            let group = (slot.entry.vrf_name.clone(), slot.entry.prefix);
            let republish = touched.contains(&group);
            if fam_active && (!slot.status.installed || force || republish) {
                let mut route_attrs = attrs.clone();
                route_attrs.ecmp = slot.entry.ecmp;
                route_attrs.gateway = slot.entry.gateway;
                self.emitter.add_route(
                    &RouteKey::new(slot.entry.vrf_name.clone(), slot.entry.prefix),
                    &iface_nh,
                    &route_attrs,
                );
                slot.status.installed = true;
                changed = true;
            }
            slot.status.dirty = false;
        }

        // Allowed address pairs.
        for (_, slot) in e.address_pairs.iter_mut() {
            if slot.status.delete_pending {
                slot.status.dirty = false;
                continue;
            }
            let fam_active = if slot.entry.prefix.is_ipv4() {
                v4_active
            } else {
                v6_active
            };
            if fam_active && (!slot.status.installed || force) {
                let mut route_attrs = attrs.clone();
                route_attrs.ecmp = slot.entry.ecmp;
                self.emitter.add_route(
                    &RouteKey::new(slot.entry.vrf_name.clone(), slot.entry.prefix),
                    &iface_nh,
                    &route_attrs,
                );
                slot.status.installed = true;
                changed = true;
            }
            if slot.status.installed && !slot.entry.mac.is_zero() {
                if l2_active && !slot.entry.l2_installed {
                    self.emitter.add_bridge_route(
                        &BridgeRouteKey::new(slot.entry.vrf_name.clone(), slot.entry.mac),
                        &iface_nh,
                        vxlan_id,
                    );
                    slot.entry.l2_installed = true;
                    changed = true;
                } else if !l2_active && slot.entry.l2_installed {
                    self.emitter.delete_bridge_route(&BridgeRouteKey::new(
                        slot.entry.vrf_name.clone(),
                        slot.entry.mac,
                    ));
                    slot.entry.l2_installed = false;
                    changed = true;
                }
            }
            slot.status.dirty = false;
        }

        // Security groups: bookkeeping only, no emitted state.
        let any_active = l2_active || v4_active || v6_active;
        for (_, slot) in e.security_groups.iter_mut() {
            if slot.status.delete_pending {
                slot.status.dirty = false;
                continue;
            }
            let want = any_active && slot.entry.resolved;
            if slot.status.installed != want {
                slot.status.installed = want;
                changed = true;
            }
            slot.status.dirty = false;
        }

        // VRF translation rules: hold a dedicated label while usable.
        for (rule_id, slot) in e.vrf_assign_rules.iter_mut() {
            if slot.status.delete_pending {
                slot.status.dirty = false;
                continue;
            }
            let target_known = self.vrfs.find(&slot.entry.vrf_name).is_some();
            if (v4_active || v6_active) && target_known && !slot.status.installed {
                match self.alloc.allocate_label(id, LabelPurpose::VrfAssign(*rule_id)) {
                    Ok(label) => {
                        slot.entry.label = Some(label);
                        slot.status.installed = true;
                        changed = true;
                    }
                    Err(err) => {
                        self.stats.resource_failures += 1;
                        let record =
                            TraceRecord::new(TraceKind::ResourceExhausted, id.to_string())
                                .with_details(serde_json::json!({
                                    "error": err.to_string(),
                                    "rule": rule_id,
                                }));
                        trace_log!(record);
                    }
                }
            }
            slot.status.dirty = false;
        }

        changed
    }

    /// Drops list elements whose withdrawal completed.
    fn lists_purge(&mut self, e: &mut VifEntry) -> bool {
        let purged = e.floating_ips.purge()
            + e.service_vlans.purge()
            + e.static_routes.purge()
            + e.address_pairs.purge()
            + e.security_groups.purge()
            + e.vrf_assign_rules.purge();
        purged > 0
    }
}

fn base_attrs(e: &VifEntry) -> RouteAttrs {
    RouteAttrs {
        label: e.l3_label,
        ecmp: e.ecmp,
        gateway: None,
        preference: e.local_preference,
        policy: e.policy_enabled,
    }
}

/// Context attached to activation-edge trace records.
fn edge_details(e: &VifEntry) -> serde_json::Value {
    let (fip_v4, fip_v6) = e.floating_ip_count();
    serde_json::json!({
        "floating_ips_v4": fip_v4,
        "floating_ips_v6": fip_v6,
    })
}
