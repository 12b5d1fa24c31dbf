use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Result};
use scraper::Html;

use crate::context::ScrapeContext;
use crate::scrapers::feed::{feed_candidates, parse_feed};
use crate::scrapers::{utils, SourceCategory, SourceExtractor, SourceMetadata};

/// Feed listing plus the article body of each kept item.
pub struct UxMattersScraper {
    ctx: Arc<ScrapeContext>,
}

impl UxMattersScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "UX Matters",
        emoji: "📐",
        default_author: "UX Matters",
        category: SourceCategory::Feed,
        skip_date_filter: false,
    };

    const FEED_URL: &'static str = "https://rss.app/feeds/HgtKv6iccCcVE38g.xml";

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    fn parse_body(html: &str) -> Result<Option<String>> {
        let document = Html::parse_document(html);
        let sel = utils::selector("div.article-content")?;
        Ok(document
            .select(&sel)
            .next()
            .map(|el| utils::text_of(&el))
            .filter(|t| !t.is_empty()))
    }

    /// Article body, or `None` when the page is unavailable.
    async fn fetch_body(&self, url: &str) -> Option<String> {
        let page = match self.ctx.fetch_page(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(source = Self::METADATA.name, url, error = %e, "could not fetch article body");
                return None;
            }
        };
        Self::parse_body(&page).ok().flatten()
    }
}

#[async_trait]
impl SourceExtractor for UxMattersScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let body = self.ctx.fetch_page(Self::FEED_URL).await?;
        let candidates = feed_candidates(&self.ctx, &Self::METADATA, parse_feed(&body)?, 300);

        let mut kept = Vec::new();
        for candidate in self.ctx.keep_in_window(&Self::METADATA, candidates) {
            let content = self.fetch_body(&candidate.url).await;
            // Feed authors are aggregator names, not UX Matters writers.
            kept.push(
                candidate
                    .with_author(Self::METADATA.default_author)
                    .with_content(content),
            );
        }
        Ok(kept)
    }
}
