//! Operator command protocol.
//!
//! - [`parse`] - Slash-command text to [`Command`]
//! - [`server`] - The HTTP endpoint that authenticates and executes commands

mod parse;
mod server;

pub use parse::{parse_command, Command, CommandError};
pub use server::{create_router, serve, CommandState, SlashCommand};
