//! Generic ordered policy list with installed/delete-pending lifecycle.

use std::collections::btree_map;
use std::collections::BTreeMap;

/// An element of a policy sub-list.
///
/// The key identifies the element within its list; `same_config` compares
/// the non-key configuration so the merge can distinguish an in-place
/// update from no change at all.
pub trait PolicyEntry: Clone {
    type Key: Ord + Clone + std::fmt::Debug;

    fn key(&self) -> Self::Key;

    /// True when the non-key configuration matches.
    fn same_config(&self, other: &Self) -> bool;

    /// Copies runtime (installed-side) state from the element being
    /// replaced during an in-place update.
    fn carry_runtime(&mut self, _old: &Self) {}
}

/// Lifecycle state of a list element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryStatus {
    /// Forwarding state for this element is currently programmed.
    pub installed: bool,
    /// The element left the configuration; withdraw then purge.
    pub delete_pending: bool,
    /// The element was added or its configuration changed since the last
    /// apply pass; cleared once re-emitted.
    pub dirty: bool,
}

/// A list element together with its lifecycle state.
#[derive(Debug, Clone)]
pub struct Slot<T> {
    pub entry: T,
    pub status: EntryStatus,
}

/// What a [`PolicyList::reconcile`] pass found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDelta<K> {
    /// Keys newly present in the configuration.
    pub added: Vec<K>,
    /// Keys whose non-key configuration changed.
    pub updated: Vec<K>,
    /// Keys that left the configuration this pass (now delete-pending).
    pub removed: Vec<K>,
}

impl<K> Default for ListDelta<K> {
    fn default() -> Self {
        ListDelta {
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<K> ListDelta<K> {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }
}

/// An ordered set of policy elements keyed by [`PolicyEntry::Key`].
#[derive(Debug, Clone)]
pub struct PolicyList<T: PolicyEntry> {
    slots: BTreeMap<T::Key, Slot<T>>,
}

impl<T: PolicyEntry> Default for PolicyList<T> {
    fn default() -> Self {
        PolicyList {
            slots: BTreeMap::new(),
        }
    }
}

impl<T: PolicyEntry> PolicyList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an element with fresh (not installed) status.
    ///
    /// Used to build the incoming side of a reconcile; inserting a
    /// duplicate key replaces the previous element.
    pub fn insert(&mut self, entry: T) {
        self.slots.insert(
            entry.key(),
            Slot {
                entry,
                status: EntryStatus::default(),
            },
        );
    }

    pub fn get(&self, key: &T::Key) -> Option<&Slot<T>> {
        self.slots.get(key)
    }

    pub fn get_mut(&mut self, key: &T::Key) -> Option<&mut Slot<T>> {
        self.slots.get_mut(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, T::Key, Slot<T>> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, T::Key, Slot<T>> {
        self.slots.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True if any element still has forwarding state or a pending
    /// withdrawal. An interface cannot be destroyed while this holds.
    pub fn has_pending_state(&self) -> bool {
        self.slots
            .values()
            .any(|slot| slot.status.installed || slot.status.delete_pending)
    }

    /// Merges the incoming configuration into this list.
    ///
    /// Single ordered pass over both sides (both are sorted by key):
    /// - key only here: mark delete-pending, keep the element
    /// - key only incoming: adopt it, not installed
    /// - key on both sides: keep ours if the configuration matches
    ///   (clearing any stale delete-pending mark), otherwise adopt the
    ///   incoming element and carry our runtime state over
    ///
    /// The returned delta reports what changed; actual install/withdraw
    /// happens in the caller's apply pass.
    pub fn reconcile(&mut self, incoming: PolicyList<T>) -> ListDelta<T::Key> {
        let mut delta = ListDelta::default();
        let mut merged = BTreeMap::new();

        let mut ours = std::mem::take(&mut self.slots).into_iter().peekable();
        let mut theirs = incoming.slots.into_iter().peekable();

        loop {
            let ordering = match (ours.peek(), theirs.peek()) {
                (Some((ok, _)), Some((nk, _))) => ok.cmp(nk),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => break,
            };

            match ordering {
                std::cmp::Ordering::Less => {
                    // Left the configuration.
                    if let Some((key, mut slot)) = ours.next() {
                        if !slot.status.delete_pending {
                            slot.status.delete_pending = true;
                            delta.removed.push(key.clone());
                        }
                        merged.insert(key, slot);
                    }
                }
                std::cmp::Ordering::Greater => {
                    // New in the configuration.
                    if let Some((key, mut slot)) = theirs.next() {
                        slot.status.dirty = true;
                        delta.added.push(key.clone());
                        merged.insert(key, slot);
                    }
                }
                std::cmp::Ordering::Equal => {
                    let (key, old_slot) = match ours.next() {
                        Some(pair) => pair,
                        None => break,
                    };
                    let (_, mut new_slot) = match theirs.next() {
                        Some(pair) => pair,
                        None => break,
                    };

                    if old_slot.entry.same_config(&new_slot.entry) {
                        let mut slot = old_slot;
                        slot.status.delete_pending = false;
                        merged.insert(key, slot);
                    } else {
                        new_slot.entry.carry_runtime(&old_slot.entry);
                        new_slot.status = EntryStatus {
                            installed: old_slot.status.installed,
                            delete_pending: false,
                            dirty: true,
                        };
                        delta.updated.push(key.clone());
                        merged.insert(key, new_slot);
                    }
                }
            }
        }

        self.slots = merged;
        delta
    }

    /// Removes elements whose withdrawal completed.
    ///
    /// Returns the number of elements purged.
    pub fn purge(&mut self) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| !(slot.status.delete_pending && !slot.status.installed));
        before - self.slots.len()
    }
}

impl<T: PolicyEntry> FromIterator<T> for PolicyList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = PolicyList::new();
        for entry in iter {
            list.insert(entry);
        }
        list
    }
}
