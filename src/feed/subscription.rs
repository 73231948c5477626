use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::entry::FeedEntry;
use super::fetcher::{FeedSource, FetchError};
use super::seen::SeenSet;
use crate::config::FeedConfig;

/// One polled feed: its configuration, where it is fetched from, and what
/// it has already seen.
///
/// The seen-set is owned here and never shared between subscriptions.
pub struct Subscription {
    id: u64,
    config: FeedConfig,
    source: Arc<dyn FeedSource>,
    seen: SeenSet,
}

impl Subscription {
    pub fn new(config: FeedConfig, source: Arc<dyn FeedSource>) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            config,
            source,
            seen: SeenSet::new(),
        }
    }

    /// Process-unique id; a feed removed and added again gets a new one.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Fetches the feed's current entries in feed order.
    ///
    /// A failure means "nothing this cycle"; it never touches the seen-set.
    /// The returned future owns what it needs, so it can run after the
    /// subscription list is unlocked.
    pub fn fetch_updates(
        &self,
    ) -> impl Future<Output = Result<Vec<FeedEntry>, FetchError>> + Send + 'static {
        let source = Arc::clone(&self.source);
        let name = self.config.name.clone();
        let url = self.config.url.clone();

        async move {
            tracing::debug!(feed = %name, url = %url, "Get updates");
            let entries = source.fetch(&url).await?;
            tracing::debug!(feed = %name, count = entries.len(), "Fetched updates");
            Ok(entries)
        }
    }

    /// True if `entry` matches nothing in the seen-set.
    pub fn is_new(&self, entry: &FeedEntry) -> bool {
        !self.seen.was_seen(entry)
    }

    pub fn was_seen(&self, entry: &FeedEntry) -> bool {
        self.seen.was_seen(entry)
    }

    /// Marks `entry` as seen, whether or not it gets delivered.
    pub fn record(&mut self, entry: &FeedEntry) {
        self.seen.mark_seen(entry);
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("seen", &self.seen.len())
            .finish()
    }
}
