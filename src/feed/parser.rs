use feed_rs::model::Entry;
use feed_rs::parser;
use thiserror::Error;

use super::entry::FeedEntry;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid feed: {0}")]
    Invalid(#[from] parser::ParseFeedError),
}

/// Parses RSS/Atom/JSON Feed bytes into entries, in feed order.
///
/// Entries without an id keep an empty GUID so identity falls back to link
/// and title instead of an id derived from them.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>, ParseError> {
    let feed = parser::Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .build()
        .parse(bytes)?;
    Ok(feed.entries.into_iter().map(into_entry).collect())
}

fn into_entry(entry: Entry) -> FeedEntry {
    let image = entry_image(&entry);
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();
    let published = entry.published.or(entry.updated);

    FeedEntry {
        guid: entry.id.trim().to_string(),
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        link,
        description: entry.summary.map(|s| s.content),
        content: entry.content.and_then(|c| c.body),
        image,
        authors: entry.authors.into_iter().map(|a| a.name).collect(),
        published,
    }
}

/// First thumbnail, else first image-typed media attachment.
fn entry_image(entry: &Entry) -> Option<String> {
    entry.media.iter().find_map(|media| {
        media
            .thumbnails
            .first()
            .map(|thumb| thumb.image.uri.clone())
            .or_else(|| {
                media
                    .content
                    .iter()
                    .filter(|c| {
                        c.content_type
                            .as_ref()
                            .is_some_and(|mime| mime.ty().as_str() == "image")
                    })
                    .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
            })
    })
}
