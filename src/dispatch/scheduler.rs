use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::delivery::Deliverer;
use super::dispatcher::{CycleReport, Delivery, Dispatcher};

/// Requests an immediate poll cycle from a running [`Scheduler`].
#[derive(Debug, Clone)]
pub struct PollTrigger {
    tx: mpsc::Sender<()>,
}

impl PollTrigger {
    /// Returns false when a request is already waiting to be picked up or
    /// the scheduler has stopped.
    pub fn trigger(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Drives poll cycles on the configured interval and drains the delivery
/// queue.
///
/// Cycles run on their own task so deliveries keep flowing while a cycle
/// waits on a full queue. A tick that arrives while a cycle is still
/// running is skipped; a trigger is held and starts a cycle as soon as the
/// running one ends.
pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    deliverer: Deliverer,
    deliveries: mpsc::Receiver<Delivery>,
    triggers: mpsc::Receiver<()>,
}

impl Scheduler {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        deliverer: Deliverer,
        deliveries: mpsc::Receiver<Delivery>,
    ) -> (Self, PollTrigger) {
        let (tx, triggers) = mpsc::channel(1);
        let scheduler = Self {
            dispatcher,
            deliverer,
            deliveries,
            triggers,
        };
        (scheduler, PollTrigger { tx })
    }

    /// Runs until `shutdown` is cancelled. The first cycle starts at once.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let interval = self.dispatcher.settings().interval;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = interval.as_secs(), "Scheduler started");

        let mut cycle: Option<JoinHandle<CycleReport>> = None;
        let mut trigger_pending = false;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if cycle.is_some() {
                        tracing::debug!("Poll cycle still running, skipping tick");
                    } else {
                        cycle = Some(self.spawn_cycle("interval"));
                    }
                }
                Some(()) = self.triggers.recv() => {
                    if cycle.is_some() {
                        tracing::debug!("Poll cycle still running, holding trigger");
                        trigger_pending = true;
                    } else {
                        cycle = Some(self.spawn_cycle("trigger"));
                    }
                }
                result = cycle_finished(&mut cycle), if cycle.is_some() => {
                    cycle = None;
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Poll cycle task failed");
                    }
                    if std::mem::take(&mut trigger_pending) {
                        cycle = Some(self.spawn_cycle("trigger"));
                    }
                }
                Some(delivery) = self.deliveries.recv() => {
                    // Errors are logged by the deliverer; entries are not retried
                    let _ = self.deliverer.deliver(delivery).await;
                }
            }
        }

        if let Some(handle) = cycle {
            handle.abort();
        }
        let dropped = self.deliveries.len();
        if dropped > 0 {
            tracing::warn!(dropped, "Dropping queued entries on shutdown");
        }
        tracing::info!("Scheduler stopped");
    }

    fn spawn_cycle(&self, reason: &'static str) -> JoinHandle<CycleReport> {
        tracing::debug!(reason, "Starting poll cycle");
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move { dispatcher.poll_cycle().await }.in_current_span())
    }
}

async fn cycle_finished(
    cycle: &mut Option<JoinHandle<CycleReport>>,
) -> Result<CycleReport, JoinError> {
    match cycle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
