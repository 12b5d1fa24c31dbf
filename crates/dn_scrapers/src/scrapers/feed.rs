//! RSS 2.0 and Atom parsing into one item shape.

use atom_syndication::Feed;
use dn_core::{ArticleCandidate, Error, Result};
use rss::Channel;

use super::{utils, SourceMetadata};
use crate::context::{ScrapeContext, SeenUrls};

/// One feed entry with the fields extractors care about. Text fields are raw
/// (descriptions may contain HTML).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

impl FeedItem {
    /// Description (or content) as plain text, cut to `max` chars.
    pub fn summary(&self, max: usize) -> String {
        let html = self
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or(self.content.as_deref())
            .unwrap_or("");
        utils::truncate(&utils::strip_html(html), max)
    }

    /// Explicit image first, then the first `<img>` of the description or content.
    pub fn image(&self) -> Option<String> {
        self.image_url
            .clone()
            .or_else(|| self.description.as_deref().and_then(utils::first_image))
            .or_else(|| self.content.as_deref().and_then(utils::first_image))
    }
}

/// Parses an RSS 2.0 channel, falling back to Atom.
pub fn parse_feed(body: &str) -> Result<Vec<FeedItem>> {
    match Channel::read_from(body.as_bytes()) {
        Ok(channel) => Ok(channel.items().iter().map(rss_item).collect()),
        Err(rss_err) => match Feed::read_from(body.as_bytes()) {
            Ok(feed) => Ok(feed.entries().iter().map(atom_entry).collect()),
            Err(atom_err) => Err(Error::Parse(format!(
                "not an RSS or Atom document (rss: {}; atom: {})",
                rss_err, atom_err
            ))),
        },
    }
}

/// Turns feed items into candidates for `metadata`'s source, de-duplicated by link.
/// Items without a title or link are skipped.
pub fn feed_candidates(
    ctx: &ScrapeContext,
    metadata: &SourceMetadata,
    items: Vec<FeedItem>,
    summary_len: usize,
) -> Vec<ArticleCandidate> {
    let mut seen = SeenUrls::new();
    let mut candidates = Vec::new();
    for item in items {
        if item.title.is_empty() || item.link.is_empty() {
            tracing::debug!(source = metadata.name, "feed item without title or link, skipping");
            continue;
        }
        if !seen.insert(&item.link) {
            continue;
        }
        let (date, fallback) = ctx.resolve_date(metadata.name, &item.link, item.published.as_deref());
        let candidate = ArticleCandidate::new(item.title.clone(), item.link.clone(), date, metadata.name)
            .with_author(item.author.clone().unwrap_or_else(|| metadata.default_author.to_string()))
            .with_summary(item.summary(summary_len))
            .with_image(item.image())
            .with_date_fallback(fallback);
        candidates.push(candidate);
    }
    candidates
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn rss_item(item: &rss::Item) -> FeedItem {
    let author = item
        .dublin_core_ext()
        .and_then(|dc| non_empty(dc.creators().first().map(String::as_str)))
        .or_else(|| non_empty(item.author()));

    let media_image = item.extensions().get("media").and_then(|media| {
        ["content", "thumbnail"].iter().find_map(|tag| {
            media
                .get(*tag)?
                .iter()
                .find(|ext| ext.attrs().get("medium").map_or(true, |m| m == "image"))
                .and_then(|ext| non_empty(ext.attrs().get("url").map(String::as_str)))
        })
    });
    let enclosure_image = item
        .enclosure()
        .filter(|e| e.mime_type().starts_with("image"))
        .and_then(|e| non_empty(Some(e.url())));

    FeedItem {
        title: utils::collapse_whitespace(item.title().unwrap_or("")),
        link: item.link().unwrap_or("").trim().to_string(),
        published: non_empty(item.pub_date()),
        author,
        description: non_empty(item.description()),
        content: non_empty(item.content()),
        image_url: media_image.or(enclosure_image),
    }
}

fn atom_entry(entry: &atom_syndication::Entry) -> FeedItem {
    let link = entry
        .links()
        .iter()
        .find(|l| l.rel() == "alternate")
        .or_else(|| entry.links().first())
        .map(|l| l.href().trim().to_string())
        .unwrap_or_default();
    let published = entry
        .published()
        .copied()
        .unwrap_or_else(|| *entry.updated())
        .to_rfc3339();

    FeedItem {
        title: utils::collapse_whitespace(&entry.title().value),
        link,
        published: Some(published),
        author: entry.authors().first().and_then(|p| non_empty(Some(p.name()))),
        description: entry.summary().and_then(|s| non_empty(Some(&s.value))),
        content: entry.content().and_then(|c| non_empty(c.value())),
        image_url: None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rss() {
        let body = fixtures::rss(&[("First post", "https://a.test/1", "Sun, 05 Jan 2025 10:00:00 GMT")]);
        let items = parse_feed(&body).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.title, "First post");
        assert_eq!(item.link, "https://a.test/1");
        assert_eq!(item.author.as_deref(), Some("Jane Doe"));
        assert_eq!(item.summary(200), "About First post");
        assert_eq!(item.image().as_deref(), Some("https://img.test/10.png"));
    }

    #[test]
    fn test_parse_rss_media_and_enclosure() {
        let body = r#"<?xml version="1.0"?>
            <rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
            <channel><title>F</title><link>https://f.test</link><description>d</description>
            <item><title>A</title><link>https://a.test/a</link>
              <media:content url="https://img.test/media.png" medium="image"/></item>
            <item><title>B</title><link>https://a.test/b</link>
              <enclosure url="https://img.test/enc.jpg" length="1" type="image/jpeg"/></item>
            </channel></rss>"#;
        let items = parse_feed(body).unwrap();
        assert_eq!(items[0].image().as_deref(), Some("https://img.test/media.png"));
        assert_eq!(items[1].image().as_deref(), Some("https://img.test/enc.jpg"));
        assert_eq!(items[1].published, None);
    }

    #[test]
    fn test_parse_atom() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
            <feed xmlns="http://www.w3.org/2005/Atom">
              <title>Release notes</title><id>urn:feed</id><updated>2025-01-10T00:00:00Z</updated>
              <entry>
                <title>Dev Mode updates</title><id>urn:1</id>
                <link rel="alternate" href="https://www.figma.com/release-notes/?title=dev-mode"/>
                <updated>2025-01-10T00:00:00Z</updated>
                <published>2025-01-09T12:00:00Z</published>
                <author><name>Figma</name></author>
                <content type="html">&lt;p&gt;New inspect panel&lt;/p&gt;</content>
              </entry>
            </feed>"#;
        let items = parse_feed(body).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://www.figma.com/release-notes/?title=dev-mode");
        assert!(items[0].published.as_deref().unwrap().starts_with("2025-01-09"));
        assert_eq!(items[0].author.as_deref(), Some("Figma"));
        assert_eq!(items[0].summary(300), "New inspect panel");
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_feed("<html>nope</html>"), Err(Error::Parse(_))));
    }
}
