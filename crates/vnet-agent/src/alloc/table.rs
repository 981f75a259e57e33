//! Id space bookkeeping behind the allocator facade.

use crate::alloc::types::{AllocError, AllocStats, LabelPurpose};
use crate::fwd::{Label, TunnelId, VxlanId};
use log::{debug, warn};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use uuid::Uuid;

/// Capacity and base values for the three id spaces.
#[derive(Debug, Clone, Copy)]
pub struct AllocConfig {
    pub label_base: u32,
    pub label_capacity: u32,
    pub vxlan_base: u32,
    pub vxlan_capacity: u32,
    pub tunnel_base: u32,
    pub tunnel_capacity: u32,
}

impl Default for AllocConfig {
    fn default() -> Self {
        AllocConfig {
            // Labels below 16 are reserved by convention.
            label_base: 16,
            label_capacity: 65536,
            vxlan_base: 1,
            vxlan_capacity: 1 << 24,
            tunnel_base: 1,
            tunnel_capacity: 65536,
        }
    }
}

/// A bounded id space with per-owner idempotent acquire/release.
#[derive(Debug)]
struct IdSpace<K> {
    name: &'static str,
    base: u32,
    capacity: u32,
    next: u32,
    free: Vec<u32>,
    held: HashMap<K, u32>,
}

impl<K: Eq + Hash + Clone> IdSpace<K> {
    fn new(name: &'static str, base: u32, capacity: u32) -> Self {
        IdSpace {
            name,
            base,
            capacity,
            next: 0,
            free: Vec::new(),
            held: HashMap::new(),
        }
    }

    /// Returns the id already held by `key`, or carves out a fresh one.
    fn acquire(&mut self, key: K) -> Result<u32, AllocError> {
        if let Some(id) = self.held.get(&key) {
            return Ok(*id);
        }

        let id = if let Some(recycled) = self.free.pop() {
            recycled
        } else if self.next < self.capacity {
            let id = self.base + self.next;
            self.next += 1;
            id
        } else {
            return Err(AllocError::Exhausted {
                space: self.name,
                capacity: self.capacity,
            });
        };

        self.held.insert(key, id);
        Ok(id)
    }

    /// Returns the id to the free pool. No-op when `key` holds nothing.
    fn release(&mut self, key: &K) -> Option<u32> {
        let id = self.held.remove(key)?;
        self.free.push(id);
        Some(id)
    }

    fn held_count(&self) -> usize {
        self.held.len()
    }
}

#[derive(Debug)]
struct Inner {
    labels: IdSpace<(Uuid, LabelPurpose)>,
    vxlan: IdSpace<Uuid>,
    tunnels: IdSpace<Uuid>,
    allocations: u64,
    releases: u64,
    exhaustions: u64,
}

/// Facade over the label, VXLAN and tunnel id spaces.
///
/// All methods take `&self`; a single lock guards the three spaces so the
/// allocator can be shared behind an `Arc` without external locking.
#[derive(Debug)]
pub struct ResourceAllocator {
    inner: Mutex<Inner>,
}

impl ResourceAllocator {
    pub fn new(config: AllocConfig) -> Self {
        ResourceAllocator {
            inner: Mutex::new(Inner {
                labels: IdSpace::new("label", config.label_base, config.label_capacity),
                vxlan: IdSpace::new("vxlan", config.vxlan_base, config.vxlan_capacity),
                tunnels: IdSpace::new("tunnel", config.tunnel_base, config.tunnel_capacity),
                allocations: 0,
                releases: 0,
                exhaustions: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquires (or re-reads) the label held by `owner` for `purpose`.
    pub fn allocate_label(&self, owner: Uuid, purpose: LabelPurpose) -> Result<Label, AllocError> {
        let mut inner = self.lock();
        match inner.labels.acquire((owner, purpose)) {
            Ok(label) => {
                inner.allocations += 1;
                debug!("alloc: label {} for {} ({})", label, owner, purpose);
                Ok(label)
            }
            Err(e) => {
                inner.exhaustions += 1;
                warn!("alloc: label space exhausted for {} ({})", owner, purpose);
                Err(e)
            }
        }
    }

    /// Releases the label held by `owner` for `purpose`, if any.
    pub fn release_label(&self, owner: Uuid, purpose: LabelPurpose) -> bool {
        let mut inner = self.lock();
        match inner.labels.release(&(owner, purpose)) {
            Some(label) => {
                inner.releases += 1;
                debug!("alloc: released label {} from {} ({})", label, owner, purpose);
                true
            }
            None => false,
        }
    }

    /// Acquires (or re-reads) the VXLAN id held by `owner`.
    pub fn allocate_vxlan(&self, owner: Uuid) -> Result<VxlanId, AllocError> {
        let mut inner = self.lock();
        match inner.vxlan.acquire(owner) {
            Ok(id) => {
                inner.allocations += 1;
                Ok(id)
            }
            Err(e) => {
                inner.exhaustions += 1;
                warn!("alloc: vxlan space exhausted for {}", owner);
                Err(e)
            }
        }
    }

    /// Releases the VXLAN id held by `owner`, if any.
    pub fn release_vxlan(&self, owner: Uuid) -> bool {
        let mut inner = self.lock();
        match inner.vxlan.release(&owner) {
            Some(_) => {
                inner.releases += 1;
                true
            }
            None => false,
        }
    }

    /// Acquires (or re-reads) the tunnel id held by `owner`.
    pub fn allocate_tunnel(&self, owner: Uuid) -> Result<TunnelId, AllocError> {
        let mut inner = self.lock();
        match inner.tunnels.acquire(owner) {
            Ok(id) => {
                inner.allocations += 1;
                Ok(id)
            }
            Err(e) => {
                inner.exhaustions += 1;
                warn!("alloc: tunnel space exhausted for {}", owner);
                Err(e)
            }
        }
    }

    /// Releases the tunnel id held by `owner`, if any.
    pub fn release_tunnel(&self, owner: Uuid) -> bool {
        let mut inner = self.lock();
        match inner.tunnels.release(&owner) {
            Some(_) => {
                inner.releases += 1;
                true
            }
            None => false,
        }
    }

    /// Snapshot of allocator counters.
    pub fn stats(&self) -> AllocStats {
        let inner = self.lock();
        AllocStats {
            labels_held: inner.labels.held_count() as u64,
            vxlan_ids_held: inner.vxlan.held_count() as u64,
            tunnel_ids_held: inner.tunnels.held_count() as u64,
            allocations: inner.allocations,
            releases: inner.releases,
            exhaustions: inner.exhaustions,
        }
    }
}

impl Default for ResourceAllocator {
    fn default() -> Self {
        ResourceAllocator::new(AllocConfig::default())
    }
}
