//! Configuration file parser for the relay's `config.toml`.
//!
//! Unlike feed state, configuration problems are fatal: a missing file, bad
//! TOML or a missing `webhook_url` stop the process at startup.
//! Unknown keys are accepted by serde, though we log a warning for each so
//! typos do not go unnoticed.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::store::{FeedStore, StoreError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load feed file: {0}")]
    FeedFile(#[from] StoreError),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Poll interval used when `interval_secs` is missing or zero.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Address the command server binds to unless overridden.
pub const DEFAULT_BIND: &str = "127.0.0.1:9090";

/// A single feed subscription as configured.
///
/// `icon_url`, `username` and `channel` override the global defaults for
/// messages from this feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub detailed: bool,
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified;
/// [`Config::load`] then rejects configurations without a webhook.
///
/// The custom Debug impl masks `webhook_url` and `token`, both of which
/// grant access to the chat system.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Incoming webhook that receives formatted entries.
    pub webhook_url: String,

    /// Slash-command token expected on the command endpoint.
    pub token: Option<String>,

    /// Default channel, username and icon for posted messages.
    pub channel: Option<String>,
    pub username: Option<String>,
    pub icon_url: Option<String>,

    /// Suppress every entry of the first poll cycle after startup.
    pub skip_initial: bool,

    /// Number of entries per feed delivered on the first poll cycle.
    pub show_initial: usize,

    /// Poll interval in seconds. 0 falls back to five minutes.
    pub interval_secs: u64,

    /// Use attachment-style messages for every feed.
    pub detailed: bool,

    /// Listen address of the command server.
    pub bind: String,

    /// Feeds fetched concurrently within one cycle (1 = sequential).
    pub fetch_concurrency: usize,

    /// Separate TOML file holding the feed list; also where add/remove
    /// commands persist changes.
    pub feed_file: Option<PathBuf>,

    pub feeds: Vec<FeedConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            token: None,
            channel: None,
            username: None,
            icon_url: None,
            skip_initial: false,
            show_initial: 0,
            interval_secs: DEFAULT_INTERVAL.as_secs(),
            detailed: false,
            bind: DEFAULT_BIND.to_string(),
            fetch_concurrency: 1,
            feed_file: None,
            feeds: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("webhook_url", &"[REDACTED]")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("channel", &self.channel)
            .field("username", &self.username)
            .field("icon_url", &self.icon_url)
            .field("skip_initial", &self.skip_initial)
            .field("show_initial", &self.show_initial)
            .field("interval_secs", &self.interval_secs)
            .field("detailed", &self.detailed)
            .field("bind", &self.bind)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("feed_file", &self.feed_file)
            .field("feeds", &self.feeds)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 13] = [
        "webhook_url",
        "token",
        "channel",
        "username",
        "icon_url",
        "skip_initial",
        "show_initial",
        "interval_secs",
        "detailed",
        "bind",
        "fetch_concurrency",
        "feed_file",
        "feeds",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or unreadable file → `Err(ConfigError::Io)`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - No `webhook_url` → `Err(ConfigError::Invalid)`
    /// - Feeds without a URL are dropped with a warning
    /// - With `feed_file` set, the feed list comes from that file when it exists
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;

        if let Some(feed_file) = config.feed_file.clone() {
            match FeedStore::load(&feed_file) {
                Ok(feeds) => config.feeds = feeds,
                Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(
                        path = %feed_file.display(),
                        "Feed file not found, using feeds from config file"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        config.feeds = drop_feeds_without_url(std::mem::take(&mut config.feeds));

        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            interval_secs = config.interval().as_secs(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;

        if config.webhook_url.trim().is_empty() {
            return Err(ConfigError::Invalid("webhook_url is required".to_string()));
        }

        Ok(config)
    }

    /// Poll interval, defaulting to five minutes when unset or zero.
    pub fn interval(&self) -> Duration {
        if self.interval_secs == 0 {
            DEFAULT_INTERVAL
        } else {
            Duration::from_secs(self.interval_secs)
        }
    }
}

fn drop_feeds_without_url(feeds: Vec<FeedConfig>) -> Vec<FeedConfig> {
    feeds
        .into_iter()
        .filter(|feed| {
            let keep = !feed.url.trim().is_empty();
            if !keep {
                tracing::warn!(feed = %feed.name, "Dropping feed without URL");
            }
            keep
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "webhook_url = \"https://chat.example.com/hooks/abc\"\n";

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("feedhook_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.interval(), DEFAULT_INTERVAL);
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.fetch_concurrency, 1);
        assert!(!config.skip_initial);
        assert_eq!(config.show_initial, 0);
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = Path::new("/tmp/feedhook_test_nonexistent_config.toml");
        let result = Config::load(path);
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.webhook_url, "https://chat.example.com/hooks/abc");
        assert_eq!(config.interval(), DEFAULT_INTERVAL);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_missing_webhook_is_invalid() {
        let result = Config::from_toml("channel = \"town-square\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_interval_falls_back_to_default() {
        let config = Config::from_toml(&format!("{MINIMAL}interval_secs = 0\n")).unwrap();
        assert_eq!(config.interval(), DEFAULT_INTERVAL);

        let config = Config::from_toml(&format!("{MINIMAL}interval_secs = 60\n")).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_full_config() {
        let content = r#"
webhook_url = "https://chat.example.com/hooks/abc"
token = "slash-token"
channel = "news"
username = "feedbot"
icon_url = "https://example.com/icon.png"
skip_initial = true
show_initial = 3
interval_secs = 120
detailed = true
bind = "0.0.0.0:8080"
fetch_concurrency = 4

[[feeds]]
name = "rust"
url = "https://blog.rust-lang.org/feed.xml"
channel = "rust"
detailed = false

[[feeds]]
name = "empty"
url = ""
"#;
        let (dir, path) = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.token.as_deref(), Some("slash-token"));
        assert_eq!(config.channel.as_deref(), Some("news"));
        assert!(config.skip_initial);
        assert_eq!(config.show_initial, 3);
        assert_eq!(config.interval(), Duration::from_secs(120));
        assert!(config.detailed);
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.fetch_concurrency, 4);
        assert_eq!(config.feeds.len(), 1, "feed without URL should be dropped");
        assert_eq!(config.feeds[0].name, "rust");
        assert_eq!(config.feeds[0].channel.as_deref(), Some("rust"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_feed_file_replaces_inline_feeds() {
        let dir = std::env::temp_dir().join("feedhook_config_test_feed_file");
        std::fs::create_dir_all(&dir).unwrap();
        let feed_path = dir.join("feeds.toml");
        std::fs::write(
            &feed_path,
            "[[feeds]]\nname = \"from-file\"\nurl = \"https://example.com/a.xml\"\n",
        )
        .unwrap();

        let content = format!(
            "{MINIMAL}feed_file = {:?}\n\n[[feeds]]\nname = \"inline\"\nurl = \"https://example.com/b.xml\"\n",
            feed_path.display().to_string()
        );
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.feeds.len(), 1);
        assert_eq!(config.feeds[0].name, "from-file");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_feed_file_keeps_inline_feeds() {
        let content = format!(
            "{MINIMAL}feed_file = \"/tmp/feedhook_no_such_feeds.toml\"\n\n[[feeds]]\nname = \"inline\"\nurl = \"https://example.com/b.xml\"\n"
        );
        let (dir, path) = write_config("missing_feed_file", &content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.feeds.len(), 1);
        assert_eq!(config.feeds[0].name, "inline");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let content = format!("{MINIMAL}totally_fake_key = \"should not fail\"\n");
        let config = Config::from_toml(&content).unwrap();
        assert_eq!(config.webhook_url, "https://chat.example.com/hooks/abc");
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let result = Config::from_toml(&format!("{MINIMAL}skip_initial = \"yes\"\n"));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_secrets() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        config.token = Some("super-secret-token".into());

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token"));
        assert!(!debug_output.contains("hooks/abc"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
