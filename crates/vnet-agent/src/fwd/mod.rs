//! Forwarding-state emission.
//!
//! The reconciliation engine never touches the dataplane directly. It
//! describes intent with the key types here and pushes add/withdraw calls
//! through the [`ForwardingEmitter`] trait; the production implementation
//! programs the route and bridge tables, test implementations record calls.

mod emitter;
mod types;

pub use emitter::ForwardingEmitter;
pub use types::{
    BridgeRouteKey, Label, NextHopKey, PathPreference, RouteAttrs, RouteKey, TunnelId, VxlanId,
};
