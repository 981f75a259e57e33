//! Interface orchestrator: message intake, entry lifecycle, statistics.

use crate::alloc::{AllocConfig, ResourceAllocator};
use crate::event::{TraceKind, TraceRecord};
use crate::fwd::ForwardingEmitter;
use crate::policy::PolicyList;
use crate::trace_log;
use crate::vif::msg::{merge_defaults, GlobalForwardingDefaults, VifMessage};
use crate::vif::types::{Origin, VifEntry, VifId};
use crate::vrf::{VrfName, VrfTable};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Static configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct VifOrchConfig {
    /// VRF holding the host-side metadata link-local routes.
    pub fabric_vrf: VrfName,
    /// Id space sizing for the resource allocator.
    pub alloc: AllocConfig,
}

impl Default for VifOrchConfig {
    fn default() -> Self {
        VifOrchConfig {
            fabric_vrf: "fabric".to_string(),
            alloc: AllocConfig::default(),
        }
    }
}

/// Operational counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VifOrchStats {
    pub messages: u64,
    pub interfaces_created: u64,
    pub interfaces_destroyed: u64,
    pub l2_activations: u64,
    pub l2_deactivations: u64,
    pub ipv4_activations: u64,
    pub ipv4_deactivations: u64,
    pub ipv6_activations: u64,
    pub ipv6_deactivations: u64,
    pub conflicts_dropped: u64,
    pub resource_failures: u64,
}

/// Reconciles virtual-interface state against the dataplane.
///
/// Single-threaded by design: one message is applied at a time and every
/// apply runs to completion before the next. Concurrency, if any, lives
/// in the caller's event loop.
pub struct VifOrch {
    pub(crate) config: VifOrchConfig,
    pub(crate) emitter: Arc<dyn ForwardingEmitter>,
    pub(crate) alloc: Arc<ResourceAllocator>,
    pub(crate) vrfs: VrfTable,
    pub(crate) table: HashMap<VifId, VifEntry>,
    pub(crate) stats: VifOrchStats,
}

impl VifOrch {
    pub fn new(config: VifOrchConfig, emitter: Arc<dyn ForwardingEmitter>) -> Self {
        let alloc = Arc::new(ResourceAllocator::new(config.alloc));
        VifOrch {
            config,
            emitter,
            alloc,
            vrfs: VrfTable::new(),
            table: HashMap::new(),
            stats: VifOrchStats::default(),
        }
    }

    /// The VRF table dependents resolve against.
    pub fn vrfs(&self) -> &VrfTable {
        &self.vrfs
    }

    pub fn vrfs_mut(&mut self) -> &mut VrfTable {
        &mut self.vrfs
    }

    /// The shared resource allocator.
    pub fn allocator(&self) -> &ResourceAllocator {
        &self.alloc
    }

    pub fn get(&self, id: &VifId) -> Option<&VifEntry> {
        self.table.get(id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn stats(&self) -> VifOrchStats {
        self.stats
    }

    /// Applies one update message to one interface.
    ///
    /// Creates the entry if the message kind may (config or instance);
    /// other kinds addressed to an unknown interface are dropped. Returns
    /// whether any configuration or forwarding state changed. Applying
    /// the same message twice is a no-op the second time.
    pub fn apply(
        &mut self,
        id: VifId,
        msg: VifMessage,
        defaults: &GlobalForwardingDefaults,
    ) -> bool {
        self.stats.messages += 1;

        if !self.table.contains_key(&id) {
            if !msg.creates() {
                debug!("VifOrch: dropping update for unknown interface {}", id);
                return false;
            }
            self.table.insert(id, VifEntry::new(id));
            self.stats.interfaces_created += 1;
            trace_log!(TraceRecord::new(TraceKind::Add, id.to_string()));
        }

        let Some(entry) = self.table.get_mut(&id) else {
            return false;
        };
        let old = entry.snapshot();

        let mirror_changed;
        let out = match msg {
            VifMessage::Config(data) => {
                mirror_changed = false;
                data.merge_into(entry, defaults)
            }
            VifMessage::Instance(data) => {
                mirror_changed = false;
                data.merge_into(entry)
            }
            VifMessage::LearnedAddress(data) => {
                mirror_changed = false;
                data.merge_into(entry)
            }
            VifMessage::LinkState(data) => {
                mirror_changed = false;
                data.merge_into(entry)
            }
            VifMessage::Mirror(data) => {
                let out = data.merge_into(entry);
                mirror_changed = out.changed;
                out
            }
            VifMessage::GlobalDefaults => {
                mirror_changed = false;
                merge_defaults(entry, defaults)
            }
        };

        if mirror_changed {
            let record = TraceRecord::new(TraceKind::MirrorChange, id.to_string())
                .with_name(entry.name.clone());
            trace_log!(record);
        }
        if out.conflict {
            self.stats.conflicts_dropped += 1;
            let record = TraceRecord::new(TraceKind::InconsistentUpdate, id.to_string())
                .with_details(serde_json::json!({
                    "reason": "field owned by another origin",
                }));
            trace_log!(record);
        }

        let pass_changed = self.run_pass(id, &old, out.force);
        out.changed || pass_changed
    }

    /// Withdraws one origin's claim on an interface.
    ///
    /// Returns true when this removed the last claim and the entry was
    /// fully destroyed. While the other origin still claims the interface
    /// (or forwarding state is still pending) the entry survives with the
    /// departed origin's fields cleared.
    pub fn delete(&mut self, id: VifId, origin: Origin) -> bool {
        let Some(entry) = self.table.get_mut(&id) else {
            return false;
        };
        let old = entry.snapshot();
        entry.origin.remove(origin);

        if origin.contains(Origin::CONFIG) {
            entry.vrf_name = None;
            entry.subnet = None;
            entry.need_linklocal = false;
            entry.policy_enabled = false;
            entry.bridging_explicit = false;
            entry.layer3_forwarding_explicit = false;
            entry.vxlan_id_explicit = false;
            entry.vxlan_id = None;
            entry.floating_ips.reconcile(PolicyList::new());
            entry.service_vlans.reconcile(PolicyList::new());
            entry.static_routes.reconcile(PolicyList::new());
            entry.address_pairs.reconcile(PolicyList::new());
            entry.security_groups.reconcile(PolicyList::new());
            entry.vrf_assign_rules.reconcile(PolicyList::new());
        }
        if origin.contains(Origin::INSTANCE) {
            entry.vm_id = None;
            entry.device_ready = false;
        }

        self.run_pass(id, &old, false);

        let destroy = self
            .table
            .get(&id)
            .map(|e| e.can_be_deleted() && !e.has_forwarding_state())
            .unwrap_or(false);
        if destroy {
            self.table.remove(&id);
            self.stats.interfaces_destroyed += 1;
            self.vrfs.release_unused();
            trace_log!(TraceRecord::new(TraceKind::Delete, id.to_string()));
        }
        destroy
    }
}
