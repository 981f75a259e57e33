//! The emitter trait the reconciliation engine programs forwarding state
//! through.

use crate::fwd::types::{BridgeRouteKey, NextHopKey, RouteAttrs, RouteKey, VxlanId};
use uuid::Uuid;

/// Sink for forwarding-state changes.
///
/// Calls are fire-and-forget: the engine trusts the emitter to apply (or
/// queue) each change and does not observe a result. All emitter methods
/// must tolerate repeats - the engine re-emits the full desired state for
/// an interface on forced updates.
///
/// Ordering contract the engine upholds:
/// - `create_next_hop` precedes any route referencing the next hop
/// - all routes referencing a next hop are withdrawn before
///   `delete_next_hop`
/// - labels referenced by a route outlive that route
pub trait ForwardingEmitter: Send + Sync {
    /// Creates (or refreshes) a next-hop object.
    fn create_next_hop(&self, nh: &NextHopKey);

    /// Deletes a next-hop object.
    fn delete_next_hop(&self, nh: &NextHopKey);

    /// Installs or updates an L3 route pointing at `nh`.
    fn add_route(&self, key: &RouteKey, nh: &NextHopKey, attrs: &RouteAttrs);

    /// Withdraws an L3 route.
    fn delete_route(&self, key: &RouteKey);

    /// Installs or updates an L2 bridge entry pointing at `nh`.
    fn add_bridge_route(&self, key: &BridgeRouteKey, nh: &NextHopKey, vxlan: Option<VxlanId>);

    /// Withdraws an L2 bridge entry.
    fn delete_bridge_route(&self, key: &BridgeRouteKey);

    /// Adds the interface to (or refreshes it in) its broadcast flood group.
    fn update_multicast(&self, vif: Uuid);

    /// Removes the interface from its broadcast flood group.
    fn delete_multicast(&self, vif: Uuid);
}
