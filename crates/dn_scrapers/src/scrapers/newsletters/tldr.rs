use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dn_core::{ArticleCandidate, Error, Result};
use scraper::{ElementRef, Html};

use crate::cap::DailyCap;
use crate::context::{ScrapeContext, SeenUrls};
use crate::scrapers::{utils, SourceCategory, SourceExtractor, SourceMetadata};

/// Sections that are off-topic for a design feed.
pub const EXCLUDED_CATEGORIES: &[&str] = &[
    "Information Security",
    "DevOps",
    "Founders",
    "Design",
    "Marketing",
    "Crypto",
];

const SKIPPED_LINK_PARTS: &[&str] = &[
    "tldr.tech/signup",
    "twitter.com",
    "facebook.com",
    "linkedin.com",
    "instagram.com",
    "unsubscribe",
    "advertise",
    "sponsor",
    "goldcast.io",
];

const CONTAINER_SELECTOR: &str = ".issue-container, .newsletter-content, main, .content";

/// One request per day of the window against the daily edition archive.
/// Days without an edition answer non-200 and are skipped.
pub struct TldrScraper {
    ctx: Arc<ScrapeContext>,
}

fn mentions_excluded(text: &str) -> bool {
    EXCLUDED_CATEGORIES.iter().any(|c| text.contains(c))
}

fn url_mentions_excluded(href: &str) -> bool {
    let href = href.to_lowercase();
    EXCLUDED_CATEGORIES
        .iter()
        .any(|c| href.contains(&c.to_lowercase().replace(' ', "")))
}

fn is_noise_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    title.chars().count() < 5
        || lower.contains("sign up")
        || lower.contains("subscribe")
        || lower.contains("follow")
}

impl TldrScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "TLDR Newsletter",
        emoji: "📨",
        default_author: "TLDR - General",
        category: SourceCategory::Newsletter,
        skip_date_filter: false,
    };

    const BASE_URL: &'static str = "https://tldr.tech/tech";

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    fn edition_url(day: NaiveDate) -> String {
        format!("{}/{}", Self::BASE_URL, day.format("%Y-%m-%d"))
    }

    /// Stories of one edition in page order, tagged with their section.
    fn parse_edition(html: &str, day: NaiveDate) -> Result<Vec<ArticleCandidate>> {
        let document = Html::parse_document(html);
        let container_sel = utils::selector(CONTAINER_SELECTOR)?;
        let container = document
            .select(&container_sel)
            .next()
            .unwrap_or_else(|| document.root_element());

        let mut section = String::from("General");
        let mut excluded_section = false;
        let mut seen = SeenUrls::new();
        let mut stories = Vec::new();

        for element in container.descendants().filter_map(ElementRef::wrap) {
            match element.value().name() {
                "h1" | "h2" | "h3" => {
                    // Story titles are headings wrapped in their link.
                    let in_link = element
                        .ancestors()
                        .filter_map(ElementRef::wrap)
                        .any(|a| a.value().name() == "a");
                    if in_link {
                        continue;
                    }
                    let header = utils::text_of(&element);
                    excluded_section = mentions_excluded(&header);
                    if excluded_section {
                        tracing::debug!(section = %header, %day, "skipping excluded section");
                    } else {
                        section = header;
                    }
                }
                "a" if !excluded_section => {
                    if let Some(story) = Self::parse_link(element, &section, day, &seen) {
                        seen.insert(&story.url);
                        stories.push(story);
                    }
                }
                _ => {}
            }
        }
        Ok(stories)
    }

    fn parse_link(link: ElementRef, section: &str, day: NaiveDate, seen: &SeenUrls) -> Option<ArticleCandidate> {
        let href = link.value().attr("href")?.trim();
        if !href.starts_with("http") || seen.contains(href) {
            return None;
        }
        if url_mentions_excluded(href) || SKIPPED_LINK_PARTS.iter().any(|p| href.contains(p)) {
            return None;
        }
        let title = utils::text_of(&link);
        if mentions_excluded(&title) || is_noise_title(&title) {
            return None;
        }

        let mut summary = String::new();
        if let Some(paragraph) = link
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "p")
        {
            summary = utils::text_of(&paragraph).replacen(&title, "", 1).trim().to_string();
            if mentions_excluded(&summary) {
                return None;
            }
        }

        Some(
            ArticleCandidate::new(title, href, day, Self::METADATA.name)
                .with_author(format!("TLDR - {}", section))
                .with_summary(summary),
        )
    }
}

#[async_trait]
impl SourceExtractor for TldrScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let config = self.ctx.config();
        let mut candidates = Vec::new();
        let mut requests = 0usize;
        let mut last_error: Option<Error> = None;

        for (i, day) in self.ctx.window().days().enumerate() {
            if i > 0 {
                self.ctx.pause(config.request_delay).await;
            }
            requests += 1;
            let url = Self::edition_url(day);
            let response = match self.ctx.fetch(&url).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(source = Self::METADATA.name, url = %url, error = %e, "edition request failed");
                    last_error = Some(e);
                    continue;
                }
            };
            if response.status != 200 {
                tracing::debug!(%day, status = response.status, "no edition that day");
                continue;
            }
            match Self::parse_edition(&response.body, day) {
                Ok(stories) => {
                    tracing::debug!(%day, count = stories.len(), "parsed edition");
                    candidates.extend(stories);
                }
                Err(e) => tracing::warn!(source = Self::METADATA.name, %day, error = %e, "unparseable edition"),
            }
        }

        // Every request failing at the transport level means the site is unreachable.
        if candidates.is_empty() && requests > 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let capped = DailyCap::new(config.daily_cap).apply(candidates);
        Ok(self.ctx.keep_in_window(&Self::METADATA, capped))
    }
}
