//! vnet-agent - Virtual-Network Edge Agent Reconciliation Core
//!
//! This crate reconciles per-interface forwarding state for a virtual
//! network edge agent: it merges interface updates arriving from two
//! provisioning origins (the orchestration system and the configuration
//! system), decides per-family activation (L2 bridging, IPv4 routing,
//! IPv6 routing) and programs the dataplane through an emitter seam.
//!
//! # Architecture
//!
//! ```text
//! [orchestration] ─┐
//!                  ├──> [VifOrch] ──> [ForwardingEmitter] ──> dataplane
//! [configuration] ─┘       │
//!                          ├──> [VrfTable]          (routing domains)
//!                          └──> [ResourceAllocator] (labels, VNIs, tunnels)
//! ```
//!
//! # Key Components
//!
//! - [`vif::VifOrch`]: message intake and the reconciliation pass
//! - [`policy::PolicyList`]: the six per-interface policy sub-lists
//! - [`fwd::ForwardingEmitter`]: the seam the engine programs routes through
//! - [`alloc::ResourceAllocator`]: bounded label/VNI/tunnel id spaces
//! - [`vrf::VrfTable`]: reference-counted routing domains

pub mod alloc;
pub mod event;
pub mod fwd;
pub mod policy;
pub mod vif;
pub mod vrf;

// Re-export the types most callers need.
pub use alloc::{AllocConfig, AllocError, AllocStats, LabelPurpose, ResourceAllocator};
pub use event::{init_logging, init_logging_pretty, TraceKind, TraceRecord};
pub use fwd::{
    BridgeRouteKey, ForwardingEmitter, Label, NextHopKey, PathPreference, RouteAttrs, RouteKey,
    TunnelId, VxlanId,
};
pub use policy::{
    AllowedAddressPair, EntryStatus, FloatingIp, ListDelta, PolicyEntry, PolicyList,
    SecurityGroupRef, ServiceVlan, Slot, StaticRoute, VrfAssignRule,
};
pub use vif::{
    DeviceType, GlobalForwardingDefaults, LearnedAddressData, LinkStateData, MirrorData,
    MirrorDirection, Origin, VifConfigData, VifEntry, VifId, VifInstanceData, VifKind, VifMessage,
    VifOrch, VifOrchConfig, VifOrchStats,
};
pub use vrf::{VrfEntry, VrfHandle, VrfId, VrfName, VrfTable};
