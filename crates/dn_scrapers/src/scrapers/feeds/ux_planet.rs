use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Result};

use crate::context::ScrapeContext;
use crate::scrapers::feed::{feed_candidates, parse_feed};
use crate::scrapers::{SourceCategory, SourceExtractor, SourceMetadata};

/// The one source that keeps its whole feed regardless of the run window.
pub struct UxPlanetScraper {
    ctx: Arc<ScrapeContext>,
}

impl UxPlanetScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "UX Planet",
        emoji: "🪐",
        default_author: "Unknown Author",
        category: SourceCategory::Feed,
        skip_date_filter: true,
    };

    const FEED_URL: &'static str = "https://rss.app/feeds/hlRd5asgRbqTPwPL.xml";

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl SourceExtractor for UxPlanetScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let body = self.ctx.fetch_page(Self::FEED_URL).await?;
        let items = parse_feed(&body)?;
        tracing::debug!(source = Self::METADATA.name, count = items.len(), "feed items");
        let candidates = feed_candidates(&self.ctx, &Self::METADATA, items, 200);
        Ok(self.ctx.keep_in_window(&Self::METADATA, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{context, date};
    use crate::http::StaticFetcher;
    use crate::scrapers::feed::fixtures;

    #[tokio::test]
    async fn test_keeps_items_outside_window() {
        let feed = fixtures::rss(&[
            ("January piece", "https://uxplanet.org/jan", "Sun, 05 Jan 2025 10:00:00 GMT"),
            ("Last summer", "https://uxplanet.org/jun", "Sat, 01 Jun 2024 10:00:00 GMT"),
            ("Undated", "https://uxplanet.org/undated", "not a date"),
        ]);
        let fetcher = StaticFetcher::new().with_page(UxPlanetScraper::FEED_URL, feed);
        let scraper = UxPlanetScraper::new(context(fetcher));

        let candidates = scraper.extract().await.unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[1].published_at, date(2024, 6, 1));
        assert!(candidates[2].date_fallback);
        assert_eq!(candidates[2].published_at, date(2025, 1, 31));
        assert!(candidates.iter().all(|c| c.source == "UX Planet"));
    }
}
