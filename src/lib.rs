//! Relays new entries from RSS/Atom feeds to a chat incoming webhook.
//!
//! Feeds are polled on an interval. Entries are compared against a bounded
//! per-feed history so each one is posted once, and operators manage the
//! feed list through a slash-command endpoint.

pub mod chat;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod feed;
pub mod logging;
pub mod store;
pub mod util;
