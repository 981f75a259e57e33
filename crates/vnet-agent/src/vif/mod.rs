//! Virtual interface reconciliation.
//!
//! A [`VifEntry`] holds the merged configuration and runtime forwarding
//! state of one virtual interface. The [`VifOrch`] consumes update
//! messages from the two provisioning origins, recomputes the per-family
//! activation predicates and drives the dataplane toward the desired
//! state through a [`ForwardingEmitter`](crate::fwd::ForwardingEmitter):
//! tear-down strictly L3 before L2 before resource release, build-up in
//! the reverse order.

mod apply;
mod msg;
mod orch;
mod types;

pub use msg::{
    GlobalForwardingDefaults, LearnedAddressData, LinkStateData, MirrorData, VifConfigData,
    VifInstanceData, VifMessage,
};
pub use orch::{VifOrch, VifOrchConfig, VifOrchStats};
pub use types::{
    ActivationSnapshot, DeviceType, MirrorDirection, MirrorState, Origin, VifEntry, VifId, VifKind,
};
