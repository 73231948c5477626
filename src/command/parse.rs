use thiserror::Error;

use crate::config::FeedConfig;

/// An operator request received through the slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(FeedConfig),
    Remove(String),
    List,
    Refresh,
    Unknown(String),
}

/// A recognized command with missing arguments. The message is the usage
/// text shown to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Usage: add <name> <url> [iconURL] [options]*")]
    AddUsage,
    #[error("Usage: remove <name>")]
    RemoveUsage,
}

/// Parses the text of a slash command.
///
/// `channel` is the channel the command was issued from; added feeds post
/// there unless a `channel=` option says otherwise.
pub fn parse_command(text: &str, channel: &str) -> Result<Command, CommandError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();

    match tokens.first().copied() {
        Some("add") => parse_add(&tokens[1..], channel),
        Some("remove") => tokens
            .get(1)
            .map(|name| Command::Remove((*name).to_string()))
            .ok_or(CommandError::RemoveUsage),
        Some("list") => Ok(Command::List),
        Some("refresh") => Ok(Command::Refresh),
        other => Ok(Command::Unknown(other.unwrap_or_default().to_string())),
    }
}

fn parse_add(args: &[&str], channel: &str) -> Result<Command, CommandError> {
    let [name, url, rest @ ..] = args else {
        return Err(CommandError::AddUsage);
    };

    let mut feed = FeedConfig {
        name: (*name).to_string(),
        url: (*url).to_string(),
        channel: non_empty(channel),
        ..Default::default()
    };

    let options = match rest.split_first() {
        Some((icon, options)) => {
            feed.icon_url = non_empty(icon);
            options
        }
        None => &[],
    };

    // Malformed options and unknown keys are ignored
    for option in options {
        let Some((key, value)) = option.split_once('=') else {
            continue;
        };
        match key {
            "icon" => feed.icon_url = non_empty(value),
            "channel" => feed.channel = non_empty(value),
            "detailed" | "detail" => {
                feed.detailed = matches!(value, "t" | "true" | "yes" | "detailed")
            }
            "user" | "username" => feed.username = non_empty(value),
            _ => {}
        }
    }

    Ok(Command::Add(feed))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_minimal() {
        let command = parse_command("add rust https://blog.rust-lang.org/feed.xml", "town-square");
        assert_eq!(
            command,
            Ok(Command::Add(FeedConfig {
                name: "rust".into(),
                url: "https://blog.rust-lang.org/feed.xml".into(),
                channel: Some("town-square".into()),
                ..Default::default()
            }))
        );
    }

    #[test]
    fn test_add_with_icon_and_options() {
        let command = parse_command(
            "add  rust\thttps://blog.rust-lang.org/feed.xml https://rust-lang.org/logo.png \
             channel=rust detail=yes username=ferris bogus other=1",
            "town-square",
        );
        assert_eq!(
            command,
            Ok(Command::Add(FeedConfig {
                name: "rust".into(),
                url: "https://blog.rust-lang.org/feed.xml".into(),
                icon_url: Some("https://rust-lang.org/logo.png".into()),
                username: Some("ferris".into()),
                channel: Some("rust".into()),
                detailed: true,
            }))
        );
    }

    #[test]
    fn test_add_icon_option_overrides_positional_icon() {
        let Ok(Command::Add(feed)) = parse_command(
            "add a https://a.example/feed https://a.example/1.png icon=https://a.example/2.png",
            "",
        ) else {
            panic!("expected add");
        };
        assert_eq!(feed.icon_url.as_deref(), Some("https://a.example/2.png"));
        assert_eq!(feed.channel, None);
    }

    #[test]
    fn test_detailed_option_values() {
        for (value, expected) in [
            ("t", true),
            ("true", true),
            ("yes", true),
            ("detailed", true),
            ("no", false),
            ("1", false),
        ] {
            let text = format!("add a https://a.example/feed - detailed={value}");
            let Ok(Command::Add(feed)) = parse_command(&text, "") else {
                panic!("expected add");
            };
            assert_eq!(feed.detailed, expected, "detailed={value}");
        }
    }

    #[test]
    fn test_add_usage() {
        assert_eq!(parse_command("add", "c"), Err(CommandError::AddUsage));
        assert_eq!(parse_command("add onlyname", "c"), Err(CommandError::AddUsage));
        assert_eq!(
            CommandError::AddUsage.to_string(),
            "Usage: add <name> <url> [iconURL] [options]*"
        );
    }

    #[test]
    fn test_remove() {
        assert_eq!(parse_command("remove rust", "c"), Ok(Command::Remove("rust".into())));
        assert_eq!(parse_command("remove", "c"), Err(CommandError::RemoveUsage));
    }

    #[test]
    fn test_list_refresh_unknown() {
        assert_eq!(parse_command("list", "c"), Ok(Command::List));
        assert_eq!(parse_command(" refresh ", "c"), Ok(Command::Refresh));
        assert_eq!(parse_command("frobnicate x", "c"), Ok(Command::Unknown("frobnicate".into())));
        assert_eq!(parse_command("", "c"), Ok(Command::Unknown(String::new())));
    }
}
