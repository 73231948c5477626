use std::collections::VecDeque;

use super::entry::{EntryIdentity, FeedEntry};

/// Most identities a [`SeenSet`] holds before it trims.
pub const SEEN_CAPACITY: usize = 200;

/// Length a [`SeenSet`] is cut back to once it exceeds [`SEEN_CAPACITY`].
pub const SEEN_TRIM_TO: usize = 190;

/// Bounded, most-recent-first memory of entries a subscription has seen.
///
/// Identity is not a plain key (see [`super::same_entry`]), so lookups are a
/// linear scan over at most [`SEEN_CAPACITY`] records.
#[derive(Debug, Clone)]
pub struct SeenSet {
    records: VecDeque<EntryIdentity>,
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SeenSet {
    pub fn new() -> Self {
        Self {
            records: VecDeque::with_capacity(SEEN_CAPACITY + 1),
        }
    }

    /// Records `entry` as the most recent identity.
    pub fn mark_seen(&mut self, entry: &FeedEntry) {
        self.records.push_front(entry.identity());
        if self.records.len() > SEEN_CAPACITY {
            self.records.truncate(SEEN_TRIM_TO);
        }
    }

    /// Returns true if any stored identity matches `entry`.
    pub fn was_seen(&self, entry: &FeedEntry) -> bool {
        self.records.iter().any(|record| record.matches(entry))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stored identities, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &EntryIdentity> {
        self.records.iter()
    }
}
