//! Feed side of the relay: entries, their identity, and per-feed state.
//!
//! - [`entry`] - The entry model and the [`same_entry`] identity rules
//! - [`seen`] - Bounded per-subscription memory of seen entries
//! - [`parser`] - RSS/Atom parsing using the `feed-rs` crate
//! - [`fetcher`] - The [`FeedSource`] seam and its HTTP implementation
//! - [`subscription`] - One feed's config, source and seen-set

mod entry;
mod fetcher;
mod parser;
mod seen;
mod subscription;

pub use entry::{same_entry, EntryIdentity, FeedEntry};
pub use fetcher::{FeedSource, FetchError, HttpFeedSource};
pub use parser::{parse_feed, ParseError};
pub use seen::{SeenSet, SEEN_CAPACITY, SEEN_TRIM_TO};
pub use subscription::Subscription;
