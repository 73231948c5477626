//! Utility functions shared by the chat formatter and the command server.
//!
//! - **Text sanitizing**: strict HTML-to-text reduction for chat messages
//! - **URL validation**: refuses internal targets for feeds added at runtime

mod text;
mod url_validator;

pub use text::{sanitize, strip_control_chars};
pub use url_validator::{validate_url, UrlValidationError};
