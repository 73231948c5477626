use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use super::registry::Registry;
use crate::config::{Config, FeedConfig};
use crate::feed::{FeedEntry, Subscription};

/// Capacity of the delivery queue between polling and publishing.
pub const QUEUE_CAPACITY: usize = 200;

/// An entry on its way to chat, with the configuration of the feed it came
/// from.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub entry: FeedEntry,
    pub feed: FeedConfig,
}

/// Poll-cycle behaviour taken from the configuration.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Suppress every entry of the first cycle.
    pub skip_initial: bool,
    /// Entries per feed let through on the first cycle.
    pub show_initial: usize,
    pub interval: Duration,
    /// Feeds fetched at once within a cycle; 1 polls sequentially.
    pub fetch_concurrency: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            skip_initial: false,
            show_initial: 0,
            interval: crate::config::DEFAULT_INTERVAL,
            fetch_concurrency: 1,
        }
    }
}

impl From<&Config> for DispatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            skip_initial: config.skip_initial,
            show_initial: config.show_initial,
            interval: config.interval(),
            fetch_concurrency: config.fetch_concurrency.max(1),
        }
    }
}

/// Counters for one poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub initial_run: bool,
    /// Subscriptions polled, failed ones included.
    pub polled: usize,
    pub failed: usize,
    /// Entries returned by successful fetches.
    pub fetched: usize,
    pub enqueued: usize,
}

/// Polls every subscription and queues the entries nobody has seen yet.
///
/// Owns the process-wide dispatch state: the registry it iterates, the
/// first-cycle flag and the producing end of the delivery queue.
pub struct Dispatcher {
    registry: Registry,
    settings: DispatchSettings,
    initial_run: AtomicBool,
    completed_cycles: AtomicU64,
    queue: mpsc::Sender<Delivery>,
}

impl Dispatcher {
    /// Creates the dispatcher and the consuming end of its delivery queue.
    pub fn new(registry: Registry, settings: DispatchSettings) -> (Self, mpsc::Receiver<Delivery>) {
        let (queue, deliveries) = mpsc::channel(QUEUE_CAPACITY);
        let dispatcher = Self {
            registry,
            settings,
            initial_run: AtomicBool::new(true),
            completed_cycles: AtomicU64::new(0),
            queue,
        };
        (dispatcher, deliveries)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Number of poll cycles that have run to completion.
    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles.load(Ordering::Acquire)
    }

    /// Runs one poll cycle over all subscriptions in configuration order.
    ///
    /// Every fetched entry is recorded as seen before the delivery decision,
    /// so suppressed entries are never delivered later. A failed fetch skips
    /// its subscription for this cycle and leaves its seen-set alone.
    ///
    /// The registry is locked only to start the fetches and to record their
    /// results, never across network I/O or a full delivery queue. Results
    /// of a feed removed while its fetch was running are dropped.
    pub async fn poll_cycle(&self) -> CycleReport {
        let initial_run = self.initial_run.swap(false, Ordering::AcqRel);
        let mut report = CycleReport {
            initial_run,
            ..Default::default()
        };

        let fetches: Vec<_> = {
            let subs = self.registry.lock().await;
            subs.iter().map(|sub| (sub.id(), sub.fetch_updates())).collect()
        };

        // Order of results follows configuration order regardless of concurrency
        let results: Vec<_> = stream::iter(fetches)
            .map(|(id, fetch)| async move { (id, fetch.await) })
            .buffered(self.settings.fetch_concurrency.max(1))
            .collect()
            .await;

        let deliveries = {
            let mut subs = self.registry.lock().await;
            let mut deliveries = Vec::new();
            for (id, result) in results {
                let Some(sub) = subs.iter_mut().find(|sub| sub.id() == id) else {
                    tracing::debug!(id, "Feed removed during poll, dropping results");
                    continue;
                };
                report.polled += 1;

                match result {
                    Ok(entries) => {
                        report.fetched += entries.len();
                        self.select_new(sub, entries, initial_run, &mut deliveries);
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            feed = %sub.name(),
                            url = %sub.config().url,
                            error = %e,
                            "Failed to fetch feed"
                        );
                    }
                }
            }
            deliveries
        };

        for delivery in deliveries {
            let feed = delivery.feed.name.clone();
            if self.queue.send(delivery).await.is_err() {
                tracing::warn!(feed = %feed, "Delivery queue closed, dropping entry");
                continue;
            }
            report.enqueued += 1;
        }

        self.completed_cycles.fetch_add(1, Ordering::AcqRel);
        tracing::info!(
            initial_run = report.initial_run,
            polled = report.polled,
            failed = report.failed,
            fetched = report.fetched,
            enqueued = report.enqueued,
            "Poll cycle finished"
        );
        report
    }

    /// Records every entry and appends the ones to deliver, in feed order.
    fn select_new(
        &self,
        sub: &mut Subscription,
        entries: Vec<FeedEntry>,
        initial_run: bool,
        deliveries: &mut Vec<Delivery>,
    ) {
        let mut nr = 1;
        for entry in entries {
            let already_shown = !sub.is_new(&entry);
            sub.record(&entry);

            if initial_run && self.settings.skip_initial {
                tracing::debug!(feed = %sub.name(), title = %entry.title, "Skipping initial run");
                continue;
            }
            if initial_run && nr > self.settings.show_initial {
                tracing::debug!(
                    feed = %sub.name(),
                    title = %entry.title,
                    nr = nr,
                    "Skipping initial run"
                );
                continue;
            }
            if already_shown {
                tracing::debug!(feed = %sub.name(), title = %entry.title, "Skipping already published");
                continue;
            }

            nr += 1;
            tracing::debug!(feed = %sub.name(), title = %entry.title, "Queueing entry");
            deliveries.push(Delivery {
                entry,
                feed: sub.config().clone(),
            });
        }
    }
}
