//! Polling and delivery.
//!
//! - [`registry`] - The live subscription list shared with the command server
//! - [`dispatcher`] - One poll cycle: fetch, record, decide, enqueue
//! - [`delivery`] - Queue consumer that formats and publishes entries
//! - [`scheduler`] - Interval loop tying the two ends of the queue together

mod delivery;
mod dispatcher;
mod registry;
mod scheduler;

pub use delivery::Deliverer;
pub use dispatcher::{CycleReport, Delivery, DispatchSettings, Dispatcher, QUEUE_CAPACITY};
pub use registry::{Registry, RegistryError};
pub use scheduler::{PollTrigger, Scheduler};
