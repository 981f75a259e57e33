//! Common types for the vnet-agent control plane.
//!
//! This crate provides type-safe representations of the network primitives
//! shared by the agent's operational modules:
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`IpAddress`]: IPv4 and IPv6 addresses
//! - [`IpPrefix`]: IP network prefixes (CIDR notation)
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers (service-VLAN tags)
//!
//! All types implement `Ord` so they can serve as keys in the ordered
//! policy sets maintained per virtual interface.

mod ip;
mod mac;
mod vlan;

pub use ip::{IpAddress, IpPrefix, Ipv4Address, Ipv6Address};
pub use mac::MacAddress;
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),
}
