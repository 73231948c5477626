//! Feed entries and the identity rules used to tell them apart.
//!
//! Feeds are unreliable about identifiers: some reuse a GUID for different
//! items, many regenerate GUIDs on every fetch, and a few have neither GUIDs
//! nor links. [`same_entry`] encodes the tie-break order used everywhere an
//! entry has to be recognised again.

use chrono::{DateTime, Utc};

/// A single syndication item, decoupled from the parser library's model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    /// Feed-supplied identifier. May be empty or unstable across fetches.
    pub guid: String,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub content: Option<String>,
    /// URL of a thumbnail or attached image.
    pub image: Option<String>,
    /// Author names in feed order.
    pub authors: Vec<String>,
    pub published: Option<DateTime<Utc>>,
}

impl FeedEntry {
    fn key(&self) -> IdentityKey<'_> {
        IdentityKey {
            guid: &self.guid,
            title: &self.title,
            link: &self.link,
        }
    }

    /// The identity fields of this entry, detached from its content.
    pub fn identity(&self) -> EntryIdentity {
        EntryIdentity {
            guid: self.guid.clone(),
            title: self.title.clone(),
            link: self.link.clone(),
        }
    }
}

/// The stored comparison key of an entry: `{guid, title, link}`.
///
/// Description, content, image and authors play no part in identity and are
/// not kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryIdentity {
    pub guid: String,
    pub title: String,
    pub link: String,
}

impl EntryIdentity {
    fn key(&self) -> IdentityKey<'_> {
        IdentityKey {
            guid: &self.guid,
            title: &self.title,
            link: &self.link,
        }
    }

    /// Returns true if `entry` is the same logical item as this record.
    pub fn matches(&self, entry: &FeedEntry) -> bool {
        self.key().matches(entry.key())
    }
}

impl From<&FeedEntry> for EntryIdentity {
    fn from(entry: &FeedEntry) -> Self {
        entry.identity()
    }
}

/// Returns true if `a` and `b` are the same logical item of one feed.
///
/// Symmetric and side-effect free. Resolution order:
///
/// 1. Both GUIDs present: equal GUIDs count only if the links also match;
///    differing GUIDs still count when link and title both match.
/// 2. Both links present: link and title must match.
/// 3. Otherwise the title alone decides.
///
/// The two halves of rule 1 resolve a suspicious case in opposite
/// directions. Both are observed feed quirks; keep them as they are.
pub fn same_entry(a: &FeedEntry, b: &FeedEntry) -> bool {
    a.key().matches(b.key())
}

#[derive(Debug, Clone, Copy)]
struct IdentityKey<'a> {
    guid: &'a str,
    title: &'a str,
    link: &'a str,
}

impl IdentityKey<'_> {
    fn matches(self, other: IdentityKey<'_>) -> bool {
        if !self.guid.is_empty() && !other.guid.is_empty() {
            if self.guid == other.guid {
                // Reused GUID with a different link: not the same item
                return self.link == other.link;
            }
            // Regenerated GUID
            return self.link == other.link && self.title == other.title;
        }

        if !self.link.is_empty() && !other.link.is_empty() {
            return self.link == other.link && self.title == other.title;
        }

        self.title == other.title
    }
}
