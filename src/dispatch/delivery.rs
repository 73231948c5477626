use std::sync::Arc;

use super::dispatcher::Delivery;
use crate::chat::{MessageFormatter, PublishError, Publisher};

/// Consumer side of the delivery queue: formats each entry and hands it to
/// the publisher. Failures are logged and the entry is dropped.
pub struct Deliverer {
    formatter: MessageFormatter,
    publisher: Arc<dyn Publisher>,
}

impl Deliverer {
    pub fn new(formatter: MessageFormatter, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            formatter,
            publisher,
        }
    }

    pub async fn deliver(&self, delivery: Delivery) -> Result<(), PublishError> {
        let message = self.formatter.format(&delivery.entry, &delivery.feed);

        match self.publisher.publish(&message).await {
            Ok(()) => {
                tracing::info!(
                    feed = %delivery.feed.name,
                    channel = message.channel.as_deref().unwrap_or_default(),
                    title = %delivery.entry.title,
                    "Posted entry"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    feed = %delivery.feed.name,
                    title = %delivery.entry.title,
                    error = %e,
                    "Failed to post entry"
                );
                Err(e)
            }
        }
    }
}
