use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Result};
use scraper::{ElementRef, Html};

use super::collect_items;
use crate::context::{ScrapeContext, SeenUrls};
use crate::scrapers::{utils, SourceCategory, SourceExtractor, SourceMetadata};

pub struct SmashingMagazineScraper {
    ctx: Arc<ScrapeContext>,
}

impl SmashingMagazineScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "Smashing Magazine UX",
        emoji: "💥",
        default_author: "Smashing Magazine",
        category: SourceCategory::Blog,
        skip_date_filter: false,
    };

    const BASE_URL: &'static str = "https://www.smashingmagazine.com/category/user-experience/";

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    fn parse_listing(&self, html: &str) -> Result<Vec<ArticleCandidate>> {
        let document = Html::parse_document(html);
        let mut seen = SeenUrls::new();
        collect_items(&document, "article.article--post", &Self::METADATA, &mut seen, |node| {
            self.parse_item(node)
        })
    }

    fn parse_item(&self, node: ElementRef) -> Result<Option<ArticleCandidate>> {
        let title = match utils::first_text(&node, "h2.article__title a")? {
            Some(title) => title,
            None => return Ok(None),
        };
        let href = match utils::first_attr(&node, "h2.article__title a", "href")? {
            Some(href) => href,
            None => return Ok(None),
        };
        let url = utils::absolute_url(Self::BASE_URL, &href)?;

        let raw_date = utils::first_attr(&node, ".article__meta time", "datetime")?;
        let (date, fallback) = self.ctx.resolve_date(Self::METADATA.name, &url, raw_date.as_deref());

        let author = utils::first_text(&node, ".article__author-name")?
            .unwrap_or_else(|| Self::METADATA.default_author.to_string());
        let summary = utils::first_text(&node, ".article__teaser")?.unwrap_or_default();
        let image = utils::first_attr(&node, ".article__image img", "src")?;

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
impl SourceExtractor for SmashingMagazineScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let body = self.ctx.fetch_page(Self::BASE_URL).await?;
        let candidates = self.parse_listing(&body)?;
        Ok(self.ctx.keep_in_window(&Self::METADATA, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{context, date};
    use crate::http::StaticFetcher;

    const LISTING: &str = r#"
        <main>
          <article class="article--post">
            <h2 class="article__title"><a href="/2025/01/designing-forms/">Designing Better Forms</a></h2>
            <div class="article__meta"><time datetime="2025-01-05">January 5, 2025</time></div>
            <span class="article__author-name">Vitaly Friedman</span>
            <p class="article__teaser">Forms are everywhere.</p>
            <div class="article__image"><img src="https://img.test/forms.png"></div>
          </article>
          <article class="article--post">
            <h2 class="article__title"><a href="https://www.smashingmagazine.com/2024/06/old/">Old Piece</a></h2>
            <div class="article__meta"><time datetime="2024-06-01">June 1, 2024</time></div>
          </article>
          <article class="article--post"><p>No title here</p></article>
        </main>"#;

    #[tokio::test]
    async fn test_extract_filters_window() {
        let fetcher = StaticFetcher::new().with_page(SmashingMagazineScraper::BASE_URL, LISTING);
        let scraper = SmashingMagazineScraper::new(context(fetcher));

        let candidates = scraper.extract().await.unwrap();
        assert_eq!(candidates.len(), 1);
        let first = &candidates[0];
        assert_eq!(first.url, "https://www.smashingmagazine.com/2025/01/designing-forms/");
        assert_eq!(first.published_at, date(2025, 1, 5));
        assert_eq!(first.author, "Vitaly Friedman");
        assert_eq!(first.summary, "Forms are everywhere.");
        assert_eq!(first.image_url.as_deref(), Some("https://img.test/forms.png"));
        assert_eq!(first.source, "Smashing Magazine UX");
    }

    #[tokio::test]
    async fn test_extract_fails_on_missing_page() {
        let scraper = SmashingMagazineScraper::new(context(StaticFetcher::new()));
        assert!(scraper.extract().await.is_err());
    }
}
