//! VRF entry types.

use std::fmt;
use std::sync::Arc;

/// VRF name as configured (e.g., "default-domain:project:net:net").
pub type VrfName = String;

/// Numeric VRF identifier assigned by the table.
pub type VrfId = u32;

/// A routing domain known to the agent.
///
/// Entries are immutable after creation and shared through [`VrfHandle`];
/// the strong count of the handle doubles as the VRF's reference count.
#[derive(Debug, PartialEq, Eq)]
pub struct VrfEntry {
    name: VrfName,
    id: VrfId,
}

impl VrfEntry {
    pub(crate) fn new(name: VrfName, id: VrfId) -> Self {
        VrfEntry { name, id }
    }

    /// Returns the configured VRF name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the numeric identifier.
    pub fn id(&self) -> VrfId {
        self.id
    }
}

impl fmt::Display for VrfEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}

/// Shared, reference-counted VRF handle.
pub type VrfHandle = Arc<VrfEntry>;
