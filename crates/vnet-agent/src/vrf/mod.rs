//! VRF (Virtual Routing and Forwarding) table.
//!
//! The agent keeps one [`VrfEntry`] per routing domain and hands out
//! reference-counted [`VrfHandle`]s to interfaces and policy-list elements.
//! A VRF stays alive while any handle is held; [`VrfTable::release_unused`]
//! reaps domains nothing references anymore.

mod table;
mod types;

pub use table::VrfTable;
pub use types::{VrfEntry, VrfHandle, VrfId, VrfName};
