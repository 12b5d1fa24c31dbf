use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Result};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html};

use super::collect_items;
use crate::context::{ScrapeContext, SeenUrls};
use crate::scrapers::{utils, SourceCategory, SourceExtractor, SourceMetadata};

lazy_static! {
    static ref TITLE_BEFORE_DATE: Regex = Regex::new(
        r"(?i)^(.+?)(?:January|February|March|April|May|June|July|August|September|October|November|December)"
    )
    .expect("title pattern");
    static ref LONG_DATE: Regex = Regex::new(
        r"(?i)(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}"
    )
    .expect("date pattern");
    static ref BYLINE: Regex = Regex::new(r"(?i)By\s+([^.]+)\.?\s*").expect("byline pattern");
}

const CARD_CLASS: &str = "blog-text-card";

pub struct FigmaBlogScraper {
    ctx: Arc<ScrapeContext>,
}

impl FigmaBlogScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "Figma Blog",
        emoji: "🎨",
        default_author: "Figma Team",
        category: SourceCategory::Blog,
        skip_date_filter: false,
    };

    const BASE_URL: &'static str = "https://www.figma.com/blog/";

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    /// Text cards first, then long links elsewhere in `<main>` (feature stories
    /// that render title, date and byline inside one anchor).
    fn parse_listing(&self, html: &str) -> Result<Vec<ArticleCandidate>> {
        let document = Html::parse_document(html);
        let mut seen = SeenUrls::new();

        let mut candidates = collect_items(
            &document,
            &format!(".{}", CARD_CLASS),
            &Self::METADATA,
            &mut seen,
            |node| self.parse_card(node),
        )?;
        let stories = collect_items(&document, "main a", &Self::METADATA, &mut seen, |link| {
            self.parse_story_link(link)
        })?;
        candidates.extend(stories);
        Ok(candidates)
    }

    fn parse_card(&self, node: ElementRef) -> Result<Option<ArticleCandidate>> {
        let Some(title) = utils::first_text(&node, "h3, h2, .title")? else {
            return Ok(None);
        };
        let Some(href) = utils::first_attr(&node, "a", "href")? else {
            return Ok(None);
        };
        let url = utils::absolute_url(Self::BASE_URL, &href)?;

        let mut raw_date = utils::first_text(&node, ".date, time, .meta, .published")?;
        if raw_date.is_none() {
            if let Some(parent) = node.parent().and_then(ElementRef::wrap) {
                raw_date = utils::first_text(&parent, ".date, time, .meta, .published")?;
            }
        }
        let (date, fallback) = self.ctx.resolve_date(Self::METADATA.name, &url, raw_date.as_deref());

        let author = utils::first_text(&node, ".author, .byline")?
            .unwrap_or_else(|| Self::METADATA.default_author.to_string());
        let summary = utils::first_text(&node, "p, .excerpt, .description")?.unwrap_or_default();
        let image = utils::first_attr(&node, "img", "src")?;

        Ok(Some(
            ArticleCandidate::new(title, url, date, Self::METADATA.name)
                .with_author(author)
                .with_summary(summary)
                .with_image(image)
                .with_date_fallback(fallback),
        ))
    }

    fn parse_story_link(&self, link: ElementRef) -> Result<Option<ArticleCandidate>> {
        let inside_card = link
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| a.value().classes().any(|c| c == CARD_CLASS));
        if inside_card {
            return Ok(None);
        }
        let Some(href) = link.value().attr("href").filter(|h| h.contains("/blog/")) else {
            return Ok(None);
        };
        let text = utils::text_of(&link);
        if text.chars().count() <= 30 {
            return Ok(None);
        }
        let (Some(title), Some(date_text)) = (TITLE_BEFORE_DATE.captures(&text), LONG_DATE.find(&text)) else {
            return Ok(None);
        };
        let title = title[1].trim().to_string();
        let date_text = date_text.as_str();

        let rest = text.replacen(&title, "", 1).replacen(date_text, "", 1);
        let author = BYLINE
            .captures(&rest)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_else(|| Self::METADATA.default_author.to_string());
        let summary = BYLINE.replace(&rest, "").trim().to_string();

        let url = utils::absolute_url(Self::BASE_URL, href)?;
        let (date, fallback) = self.ctx.resolve_date(Self::METADATA.name, &url, Some(date_text));

        Ok(Some(
            ArticleCandidate::new(title, url, date, Self::METADATA.name)
                .with_author(author)
                .with_summary(summary)
                .with_date_fallback(fallback),
        ))
    }
}

#[async_trait]
impl SourceExtractor for FigmaBlogScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let body = self.ctx.fetch_page(Self::BASE_URL).await?;
        let candidates = self.parse_listing(&body)?;
        Ok(self.ctx.keep_in_window(&Self::METADATA, candidates))
    }
}
