//! Identity-keyed dedup registry.
//!
//! Each pagination round re-extracts every visible item, so the same record
//! arrives many times. The registry keeps first-seen insertion order and
//! rejects repeats by identity key.

use std::collections::HashSet;

use crate::feeds::FeedRecord;

/// Ordered, identity-deduplicated accumulator for one crawl.
pub struct DedupeRegistry<T: FeedRecord> {
    seen: HashSet<String>,
    items: Vec<T>,
}

impl<T: FeedRecord> DedupeRegistry<T> {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    /// Admit `item` if its identity key is new. Returns whether it was kept.
    pub fn insert(&mut self, item: T) -> bool {
        if self.seen.insert(item.identity_key()) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the registry, truncated to at most `target` items. A final
    /// round can overshoot the target; callers never return the excess.
    pub fn into_items(self, target: usize) -> Vec<T> {
        let mut items = self.items;
        items.truncate(target);
        items
    }
}

impl<T: FeedRecord> Default for DedupeRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
