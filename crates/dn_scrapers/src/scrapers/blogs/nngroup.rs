use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Result};
use scraper::{ElementRef, Html};

use super::collect_items;
use crate::context::{ScrapeContext, SeenUrls};
use crate::scrapers::{utils, SourceCategory, SourceExtractor, SourceMetadata};

pub struct NnGroupScraper {
    ctx: Arc<ScrapeContext>,
}

impl NnGroupScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "NN/g UX Research",
        emoji: "🔬",
        default_author: "Nielsen Norman Group",
        category: SourceCategory::Blog,
        skip_date_filter: false,
    };

    const BASE_URL: &'static str = "https://www.nngroup.com/articles/";

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    fn parse_listing(&self, html: &str) -> Result<Vec<ArticleCandidate>> {
        let document = Html::parse_document(html);
        let mut seen = SeenUrls::new();
        collect_items(&document, ".article.teaser", &Self::METADATA, &mut seen, |node| {
            self.parse_item(node)
        })
    }

    fn parse_item(&self, node: ElementRef) -> Result<Option<ArticleCandidate>> {
        let Some(title) = utils::first_text(&node, "h2, h3, a.title")? else {
            return Ok(None);
        };
        let Some(href) = utils::first_attr(&node, "a", "href")? else {
            return Ok(None);
        };
        let url = utils::absolute_url(Self::BASE_URL, &href)?;

        // Teaser dates read like "March 7, 2025Mar 7, 2025 | Article: 6 minute read".
        let raw_date = utils::first_text(&node, ".date, .pubdate, time")?;
        let (date, fallback) = self.ctx.resolve_date(Self::METADATA.name, &url, raw_date.as_deref());

        let summary = utils::first_text(&node, ".summary, p")?.unwrap_or_default();

        Ok(Some(
            ArticleCandidate::new(title, url, date, Self::METADATA.name)
                .with_author(Self::METADATA.default_author)
                .with_summary(summary)
                .with_date_fallback(fallback),
        ))
    }
}

#[async_trait]
impl SourceExtractor for NnGroupScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let body = self.ctx.fetch_page(Self::BASE_URL).await?;
        let candidates = self.parse_listing(&body)?;
        tracing::debug!(source = Self::METADATA.name, count = candidates.len(), "parsed teasers");
        Ok(self.ctx.keep_in_window(&Self::METADATA, candidates))
    }
}
