use serde::{Deserialize, Serialize};

use crate::config::{Config, FeedConfig};
use crate::feed::FeedEntry;
use crate::util::sanitize;

/// Payload of a Mattermost-compatible incoming webhook.
///
/// Also used as the body of command responses, where only `text` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl WebhookMessage {
    /// A message carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Rich message attachment, used by the detailed style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub fallback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
}

/// Global fallbacks for messages whose feed leaves a field unset.
#[derive(Debug, Clone, Default)]
pub struct ChatDefaults {
    pub channel: Option<String>,
    pub username: Option<String>,
    pub icon_url: Option<String>,
    /// Use the detailed style for every feed.
    pub detailed: bool,
}

impl From<&Config> for ChatDefaults {
    fn from(config: &Config) -> Self {
        Self {
            channel: config.channel.clone(),
            username: config.username.clone(),
            icon_url: config.icon_url.clone(),
            detailed: config.detailed,
        }
    }
}

/// Turns an entry and its feed's configuration into a webhook message.
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    defaults: ChatDefaults,
}

impl MessageFormatter {
    pub fn new(defaults: ChatDefaults) -> Self {
        Self { defaults }
    }

    pub fn format(&self, entry: &FeedEntry, feed: &FeedConfig) -> WebhookMessage {
        let mut message = if feed.detailed || self.defaults.detailed {
            detailed_message(entry)
        } else {
            simple_message(entry)
        };

        message.channel = pick(&feed.channel, &self.defaults.channel);
        message.username = pick(&feed.username, &self.defaults.username);
        message.icon_url = pick(&feed.icon_url, &self.defaults.icon_url);
        message
    }
}

/// The feed's value unless empty, else the global default.
fn pick(own: &Option<String>, fallback: &Option<String>) -> Option<String> {
    own.as_ref()
        .filter(|v| !v.is_empty())
        .or(fallback.as_ref().filter(|v| !v.is_empty()))
        .cloned()
}

fn simple_message(entry: &FeedEntry) -> WebhookMessage {
    let text = match &entry.image {
        Some(image) => format!("[{}]({})\n{}", entry.title, entry.link, image),
        None => format!("[{}]({})", entry.title, entry.link),
    };
    WebhookMessage::text(sanitize(&text))
}

fn detailed_message(entry: &FeedEntry) -> WebhookMessage {
    let title = sanitize(&entry.title);
    let body = entry
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .or(entry.content.as_deref())
        .map(sanitize)
        .filter(|t| !t.is_empty());

    let attachment = Attachment {
        fallback: title.clone(),
        title: Some(title),
        title_link: Some(entry.link.clone()).filter(|l| !l.is_empty()),
        text: body,
        author_name: entry.authors.first().cloned(),
        thumb_url: entry.image.clone(),
        ..Default::default()
    };

    WebhookMessage {
        attachments: vec![attachment],
        ..Default::default()
    }
}
