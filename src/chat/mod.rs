//! Chat side of the relay: message formatting and webhook delivery.
//!
//! - [`message`] - Webhook payload types and the [`MessageFormatter`]
//! - [`publisher`] - The [`Publisher`] seam and its webhook implementation

mod message;
mod publisher;

pub use message::{Attachment, ChatDefaults, MessageFormatter, WebhookMessage};
pub use publisher::{PublishError, Publisher, WebhookPublisher};
