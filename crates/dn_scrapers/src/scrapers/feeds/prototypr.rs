use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Result};

use crate::context::ScrapeContext;
use crate::scrapers::feed::{feed_candidates, parse_feed};
use crate::scrapers::{SourceCategory, SourceExtractor, SourceMetadata};

pub struct PrototyprScraper {
    ctx: Arc<ScrapeContext>,
}

impl PrototyprScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "Prototypr",
        emoji: "🧪",
        default_author: "Prototypr Team",
        category: SourceCategory::Feed,
        skip_date_filter: false,
    };

    const FEED_URL: &'static str = "https://rss.app/feeds/PPd56KV7LlxHucpv.xml";

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl SourceExtractor for PrototyprScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let body = self.ctx.fetch_page(Self::FEED_URL).await?;
        let candidates = feed_candidates(&self.ctx, &Self::METADATA, parse_feed(&body)?, 300);
        Ok(self.ctx.keep_in_window(&Self::METADATA, candidates))
    }
}
