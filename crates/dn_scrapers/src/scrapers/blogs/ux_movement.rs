use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Result};
use scraper::{ElementRef, Html};

use super::collect_items;
use crate::context::{ScrapeContext, SeenUrls};
use crate::scrapers::feed::{feed_candidates, parse_feed};
use crate::scrapers::{utils, SourceCategory, SourceExtractor, SourceMetadata};

/// WordPress blog. Registered, but excluded by the default configuration.
pub struct UxMovementScraper {
    ctx: Arc<ScrapeContext>,
}

impl UxMovementScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "UX Movement",
        emoji: "🏃",
        default_author: "UX Movement",
        category: SourceCategory::Blog,
        skip_date_filter: false,
    };

    const BASE_URL: &'static str = "https://uxmovement.com/";
    const FEED_URL: &'static str = "https://uxmovement.com/feed/";

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    fn parse_listing(&self, html: &str) -> Result<Vec<ArticleCandidate>> {
        let document = Html::parse_document(html);
        let mut seen = SeenUrls::new();
        collect_items(&document, "article, .post, .entry", &Self::METADATA, &mut seen, |node| {
            self.parse_item(node)
        })
    }

    fn parse_item(&self, node: ElementRef) -> Result<Option<ArticleCandidate>> {
        let sel = utils::selector("h2 a, h1 a, .entry-title a")?;
        let Some(heading) = node.select(&sel).next() else {
            return Ok(None);
        };
        let title = utils::text_of(&heading);
        let Some(href) = heading.value().attr("href") else {
            return Ok(None);
        };
        if title.is_empty() {
            return Ok(None);
        }
        let url = utils::absolute_url(Self::BASE_URL, href)?;

        let date_sel = utils::selector(".entry-date, .published, time")?;
        let raw_date = node.select(&date_sel).next().map(|el| {
            el.value()
                .attr("datetime")
                .map(str::to_string)
                .unwrap_or_else(|| utils::text_of(&el))
        });
        let (date, fallback) = self.ctx.resolve_date(Self::METADATA.name, &url, raw_date.as_deref());

        let author = utils::first_text(&node, ".author, .entry-author")?
            .unwrap_or_else(|| Self::METADATA.default_author.to_string());
        let summary = utils::first_text(&node, ".entry-summary, .excerpt, p")?.unwrap_or_default();
        let image = utils::first_attr(&node, ".post-thumbnail img, .entry-image img", "src")?;

        Ok(Some(
            ArticleCandidate::new(title, url, date, Self::METADATA.name)
                .with_author(author)
                .with_summary(summary)
                .with_image(image)
                .with_date_fallback(fallback),
        ))
    }
}

#[async_trait]
impl SourceExtractor for UxMovementScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let body = self.ctx.fetch_page(Self::BASE_URL).await?;
        let mut candidates = self.parse_listing(&body)?;
        if candidates.is_empty() {
            let feed = self.ctx.fetch_page(Self::FEED_URL).await?;
            candidates = feed_candidates(&self.ctx, &Self::METADATA, parse_feed(&feed)?, 200);
        }
        Ok(self.ctx.keep_in_window(&Self::METADATA, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{context, date};
    use crate::http::StaticFetcher;

    #[tokio::test]
    async fn test_extract_prefers_datetime_attribute() {
        let listing = r#"
            <article class="post">
              <h2 class="entry-title"><a href="/why-buttons-fail/">Why Buttons Fail</a></h2>
              <time class="entry-date" datetime="2025-01-14T09:00:00+00:00">2 weeks ago</time>
              <div class="post-thumbnail"><img src="https://img.test/buttons.jpg"></div>
              <div class="entry-summary">Affordance matters.</div>
            </article>"#;
        let fetcher = StaticFetcher::new().with_page(UxMovementScraper::BASE_URL, listing);
        let scraper = UxMovementScraper::new(context(fetcher));

        let candidates = scraper.extract().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://uxmovement.com/why-buttons-fail/");
        assert_eq!(candidates[0].published_at, date(2025, 1, 14));
        assert_eq!(candidates[0].author, "UX Movement");
        assert_eq!(candidates[0].image_url.as_deref(), Some("https://img.test/buttons.jpg"));
    }
}
