use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Result};
use scraper::{ElementRef, Html};

use super::collect_items;
use crate::context::{ScrapeContext, SeenUrls};
use crate::scrapers::feed::{feed_candidates, parse_feed};
use crate::scrapers::{utils, SourceCategory, SourceExtractor, SourceMetadata};

pub struct UxCollectiveScraper {
    ctx: Arc<ScrapeContext>,
}

impl UxCollectiveScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "UX Collective",
        emoji: "✍️",
        default_author: "UX Collective",
        category: SourceCategory::Blog,
        skip_date_filter: false,
    };

    const BASE_URL: &'static str = "https://uxdesign.cc/";
    const FEED_URL: &'static str = "https://uxdesign.cc/feed";
    const SUMMARY_LEN: usize = 200;

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    fn parse_listing(&self, html: &str) -> Result<Vec<ArticleCandidate>> {
        let document = Html::parse_document(html);
        let mut seen = SeenUrls::new();
        collect_items(&document, "article, .postArticle, .js-postEntry", &Self::METADATA, &mut seen, |node| {
            self.parse_item(node)
        })
    }

    fn parse_item(&self, node: ElementRef) -> Result<Option<ArticleCandidate>> {
        let Some(title) = utils::first_text(&node, "h2, h3, .graf--title")? else {
            return Ok(None);
        };
        let Some(href) = utils::first_attr(&node, "a", "href")? else {
            return Ok(None);
        };
        let url = utils::absolute_url(Self::BASE_URL, &href)?;

        let raw_date = utils::first_text(&node, "time, .postMetaInline time")?;
        let (date, fallback) = self.ctx.resolve_date(Self::METADATA.name, &url, raw_date.as_deref());

        let author = utils::first_text(&node, ".postMetaInline-authorLockup, .u-accentColor--textDarken")?
            .unwrap_or_else(|| Self::METADATA.default_author.to_string());
        let summary = utils::first_text(&node, ".graf--subtitle, p")?.unwrap_or_default();
        let image = utils::first_attr(&node, "img", "src")?;

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
impl SourceExtractor for UxCollectiveScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let body = self.ctx.fetch_page(Self::BASE_URL).await?;
        let mut candidates = self.parse_listing(&body)?;

        // The Medium front page is often rendered client-side; the feed has the same posts.
        if candidates.is_empty() {
            tracing::info!(source = Self::METADATA.name, "no articles in listing, reading feed");
            let feed = self.ctx.fetch_page(Self::FEED_URL).await?;
            candidates = feed_candidates(&self.ctx, &Self::METADATA, parse_feed(&feed)?, Self::SUMMARY_LEN);
        }
        Ok(self.ctx.keep_in_window(&Self::METADATA, candidates))
    }
}
