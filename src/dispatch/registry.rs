use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::FeedConfig;
use crate::feed::{FeedSource, Subscription};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Feed already exists: {0}")]
    AlreadyExists(String),
}

/// The live subscription list.
///
/// Add, remove and the dispatcher's snapshot and record steps all take the
/// same lock. The dispatcher never holds it across a fetch, so commands stay
/// responsive while feeds are slow. Cloning yields another handle to the
/// same list.
#[derive(Clone)]
pub struct Registry {
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
    source: Arc<dyn FeedSource>,
}

impl Registry {
    /// Builds a registry of `feeds`, in order, all fetched through `source`.
    pub fn new(feeds: Vec<FeedConfig>, source: Arc<dyn FeedSource>) -> Self {
        let subscriptions = feeds
            .into_iter()
            .map(|config| Subscription::new(config, Arc::clone(&source)))
            .collect();
        Self {
            subscriptions: Arc::new(Mutex::new(subscriptions)),
            source,
        }
    }

    /// Appends a subscription with an empty seen-set.
    pub async fn add(&self, config: FeedConfig) -> Result<(), RegistryError> {
        let mut subs = self.subscriptions.lock().await;
        if subs.iter().any(|s| s.name() == config.name) {
            return Err(RegistryError::AlreadyExists(config.name));
        }
        tracing::info!(feed = %config.name, url = %config.url, "Feed added");
        subs.push(Subscription::new(config, Arc::clone(&self.source)));
        Ok(())
    }

    /// Drops every subscription named `name`, seen-sets included.
    pub async fn remove(&self, name: &str) -> bool {
        let mut subs = self.subscriptions.lock().await;
        let before = subs.len();
        subs.retain(|s| s.name() != name);
        let removed = subs.len() != before;
        if removed {
            tracing::info!(feed = %name, "Feed deleted");
        }
        removed
    }

    /// Feed configurations in poll order.
    pub async fn configs(&self) -> Vec<FeedConfig> {
        let subs = self.subscriptions.lock().await;
        subs.iter().map(|s| s.config().clone()).collect()
    }

    pub async fn len(&self) -> usize {
        self.subscriptions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscriptions.lock().await.is_empty()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedEntry, FetchError};
    use async_trait::async_trait;

    struct EmptySource;

    #[async_trait]
    impl FeedSource for EmptySource {
        async fn fetch(&self, _url: &str) -> Result<Vec<FeedEntry>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn feed(name: &str) -> FeedConfig {
        FeedConfig {
            name: name.into(),
            url: format!("https://example.com/{name}.xml"),
            ..Default::default()
        }
    }

    fn registry(names: &[&str]) -> Registry {
        Registry::new(names.iter().map(|n| feed(n)).collect(), Arc::new(EmptySource))
    }

    #[tokio::test]
    async fn test_configs_keep_configuration_order() {
        let registry = registry(&["b", "a", "c"]);
        let names: Vec<_> = registry.configs().await.into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_add_appends() {
        let registry = registry(&["a"]);
        registry.add(feed("b")).await.unwrap();
        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.configs().await[1].name, "b");
    }

    #[tokio::test]
    async fn test_add_duplicate_name_rejected() {
        let registry = registry(&["a"]);
        let err = registry.add(feed("a")).await.unwrap_err();
        assert_eq!(err, RegistryError::AlreadyExists("a".into()));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = registry(&["a", "b"]);
        assert!(registry.remove("a").await);
        assert!(!registry.remove("a").await);
        assert_eq!(registry.configs().await, vec![feed("b")]);
    }

    #[tokio::test]
    async fn test_readded_feed_starts_with_empty_seen_set() {
        let registry = registry(&["a"]);
        {
            let mut subs = registry.lock().await;
            subs[0].record(&FeedEntry {
                title: "seen".into(),
                ..Default::default()
            });
        }

        registry.remove("a").await;
        registry.add(feed("a")).await.unwrap();

        let subs = registry.lock().await;
        assert!(subs[0].seen().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_the_list() {
        let registry = registry(&[]);
        let other = registry.clone();
        other.add(feed("a")).await.unwrap();
        assert!(!registry.is_empty().await);
    }
}
