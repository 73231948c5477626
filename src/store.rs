//! Persistence of the feed list edited through the command protocol.
//!
//! Only configuration is stored. Seen-sets live in memory and start empty
//! after every restart.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::FeedConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Feed file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in feed file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize feeds: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FeedFile {
    #[serde(default)]
    feeds: Vec<FeedConfig>,
}

/// Where the feed list is written after add/remove commands.
#[derive(Debug, Clone, Default)]
pub struct FeedStore {
    path: Option<PathBuf>,
}

impl FeedStore {
    /// A store writing to `path`, or a no-op store when `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads a `[[feeds]]` TOML file.
    pub fn load(path: &Path) -> Result<Vec<FeedConfig>, StoreError> {
        let content = std::fs::read_to_string(path)?;
        let file: FeedFile = toml::from_str(&content)?;
        Ok(file.feeds)
    }

    /// Writes `feeds` atomically. Returns `false` when no feed file is
    /// configured and nothing was written.
    pub fn save(&self, feeds: &[FeedConfig]) -> Result<bool, StoreError> {
        let Some(path) = &self.path else {
            tracing::warn!("Not saving feeds, configure `feed_file`");
            return Ok(false);
        };

        let content = toml::to_string_pretty(&FeedFile {
            feeds: feeds.to_vec(),
        })?;
        atomic_write(path, content.as_bytes())?;

        tracing::info!(path = %path.display(), feeds = feeds.len(), "Saved feeds");
        Ok(true)
    }
}

/// Write-to-temp-then-rename so the destination is never left partial.
fn atomic_write(dst: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};
    // Unpredictable temp name; create_new refuses to follow a planted symlink
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;

    let written = temp_file
        .write_all(content)
        .and_then(|_| temp_file.sync_all());
    drop(temp_file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    // Windows refuses to rename over an existing file
    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = std::fs::remove_file(dst) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
    }

    std::fs::rename(&temp_path, dst).inspect_err(|_| {
        let _ = std::fs::remove_file(&temp_path);
    })
}
