//! VRF table with reference-counted lifetime tracking.

use crate::vrf::types::{VrfEntry, VrfHandle, VrfId, VrfName};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

/// Table of all routing domains known to the agent.
///
/// Interfaces resolve VRF names to handles here on every reconciliation
/// pass, so removing a VRF from the table deactivates dependents on their
/// next pass rather than failing them immediately.
#[derive(Debug, Default)]
pub struct VrfTable {
    entries: HashMap<VrfName, VrfHandle>,
    next_id: VrfId,
}

impl VrfTable {
    pub fn new() -> Self {
        VrfTable {
            entries: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a VRF, returning the existing handle if already present.
    pub fn add(&mut self, name: &str) -> VrfHandle {
        if let Some(handle) = self.entries.get(name) {
            return Arc::clone(handle);
        }

        let id = self.next_id;
        self.next_id += 1;

        let handle = Arc::new(VrfEntry::new(name.to_string(), id));
        self.entries.insert(name.to_string(), Arc::clone(&handle));

        info!("VrfTable: added VRF {} with id {}", name, id);
        handle
    }

    /// Looks up a VRF by name.
    ///
    /// A miss is not an error: an interface configured against an unknown
    /// VRF simply stays inactive until the VRF appears.
    pub fn find(&self, name: &str) -> Option<VrfHandle> {
        self.entries.get(name).map(Arc::clone)
    }

    /// Unregisters a VRF by name.
    ///
    /// Outstanding handles stay valid; dependents drop them on their next
    /// reconciliation pass when the lookup misses.
    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.entries.remove(name).is_some();
        if removed {
            info!("VrfTable: removed VRF {}", name);
        }
        removed
    }

    /// Number of external handles held against a VRF, if present.
    ///
    /// The table's own handle is not counted.
    pub fn ref_count(&self, name: &str) -> Option<usize> {
        self.entries
            .get(name)
            .map(|handle| Arc::strong_count(handle) - 1)
    }

    /// Drops VRFs no interface or policy element references anymore.
    ///
    /// Returns the number of entries reaped.
    pub fn release_unused(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|name, handle| {
            let keep = Arc::strong_count(handle) > 1;
            if !keep {
                debug!("VrfTable: reaping unreferenced VRF {}", name);
            }
            keep
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_and_find() {
        let mut table = VrfTable::new();
        let blue = table.add("blue");
        assert_eq!(blue.name(), "blue");
        assert_eq!(blue.id(), 1);

        let found = table.find("blue").unwrap();
        assert_eq!(found.id(), 1);
        assert!(table.find("red").is_none());
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut table = VrfTable::new();
        let first = table.add("blue");
        let second = table.add("blue");
        assert_eq!(first.id(), second.id());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut table = VrfTable::new();
        let blue = table.add("blue");
        let red = table.add("red");
        assert_ne!(blue.id(), red.id());
    }

    #[test]
    fn test_ref_count_excludes_table_handle() {
        let mut table = VrfTable::new();
        let _handle = table.add("blue");
        assert_eq!(table.ref_count("blue"), Some(1));

        let _second = table.find("blue").unwrap();
        assert_eq!(table.ref_count("blue"), Some(2));
        assert_eq!(table.ref_count("red"), None);
    }

    #[test]
    fn test_release_unused() {
        let mut table = VrfTable::new();
        let held = table.add("blue");
        table.add("red");

        // "red" has no external handle; "blue" does.
        assert_eq!(table.release_unused(), 1);
        assert_eq!(table.len(), 1);
        assert_eq!(held.name(), "blue");
        assert!(table.find("red").is_none());

        drop(held);
        assert_eq!(table.release_unused(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_keeps_outstanding_handles_valid() {
        let mut table = VrfTable::new();
        let handle = table.add("blue");
        assert!(table.remove("blue"));
        assert!(!table.remove("blue"));
        assert_eq!(handle.name(), "blue");
        assert!(table.find("blue").is_none());
    }
}
