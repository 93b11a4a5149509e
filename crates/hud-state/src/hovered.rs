use std::mem;

use hud_config::defaults::HOVERED_CAPACITY;
use hud_protocol::GroupId;
use tracing::debug;

/// Ordered record of the groups the user has open.
///
/// Bounded: inserting into a full set first empties it. This is a guard
/// against unbounded growth, not an LRU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoveredGroups {
    /// Open group ids in the order they were opened.
    ids: Vec<GroupId>,
    /// Maximum number of entries before a reset.
    capacity: usize,
}

impl Default for HoveredGroups {
    fn default() -> Self {
        Self::new()
    }
}

impl HoveredGroups {
    /// Create an empty set with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(HOVERED_CAPACITY)
    }

    /// Create an empty set holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::new(),
            capacity,
        }
    }

    /// Record `id` as open. Re-inserting an existing id is a no-op.
    pub fn insert(&mut self, id: GroupId) {
        if self.ids.contains(&id) {
            return;
        }
        if self.ids.len() >= self.capacity {
            debug!(len = self.ids.len(), "hovered_groups_reset");
            self.ids.clear();
        }
        self.ids.push(id);
    }

    /// Forget `id`.
    pub fn remove(&mut self, id: &GroupId) {
        self.ids.retain(|g| g != id);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Take all entries, leaving the set empty.
    pub fn take(&mut self) -> Vec<GroupId> {
        mem::take(&mut self.ids)
    }

    /// True if `id` is recorded.
    pub fn contains(&self, id: &GroupId) -> bool {
        self.ids.contains(id)
    }

    /// Entries in insertion order.
    pub fn as_slice(&self) -> &[GroupId] {
        &self.ids
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gid(i: usize) -> GroupId {
        GroupId::new(format!("group-{i}"))
    }

    #[test]
    fn eleventh_entry_resets() {
        let mut set = HoveredGroups::new();
        for i in 0..10 {
            set.insert(gid(i));
        }
        assert_eq!(set.len(), 10);
        set.insert(gid(10));
        assert_eq!(set.as_slice(), &[gid(10)]);
    }

    #[test]
    fn insert_remove_and_duplicates() {
        let mut set = HoveredGroups::new();
        set.insert(gid(1));
        set.insert(gid(3));
        set.insert(gid(1));
        assert_eq!(set.as_slice(), &[gid(1), gid(3)]);
        set.remove(&gid(1));
        assert_eq!(set.as_slice(), &[gid(3)]);
        assert_eq!(set.take(), vec![gid(3)]);
        assert!(set.is_empty());
    }
}
