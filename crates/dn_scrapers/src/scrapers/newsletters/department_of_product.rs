use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html};

use crate::context::{ScrapeContext, SeenUrls};
use crate::scrapers::{utils, SourceCategory, SourceExtractor, SourceMetadata};

lazy_static! {
    static ref SHORT_DATE: Regex =
        Regex::new(r"\b(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2}(\s+•\s+[\w\s]+)?")
            .expect("valid short date regex");
    static ref LONG_DATE: Regex = Regex::new(
        r"\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}"
    )
    .expect("valid long date regex");
}

/// Substack archive. Month archives are tried first, then the paged main archive,
/// then the sitemap for any month still without posts.
pub struct DepartmentOfProductScraper {
    ctx: Arc<ScrapeContext>,
}

impl DepartmentOfProductScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "Department of Product",
        emoji: "📦",
        default_author: "Rich Holmes",
        category: SourceCategory::Newsletter,
        skip_date_filter: false,
    };

    const BASE_URL: &'static str = "https://departmentofproduct.substack.com";

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    fn archive_url() -> String {
        format!("{}/archive", Self::BASE_URL)
    }

    fn month_urls(month: &str) -> [String; 3] {
        [
            format!("{}/{}?sort=new", Self::archive_url(), month),
            format!("{}/archive/{}", Self::BASE_URL, month),
            format!("{}/p/archive/{}", Self::BASE_URL, month),
        ]
    }

    fn sitemap_url() -> String {
        format!("{}/sitemap.xml", Self::BASE_URL)
    }

    fn page_url(page: usize) -> String {
        if page <= 1 {
            format!("{}?sort=new", Self::archive_url())
        } else {
            format!("{}?sort=new&page={}", Self::archive_url(), page)
        }
    }

    /// Post links of one archive page, each dated from its surroundings.
    fn parse_archive(&self, html: &str, seen: &mut SeenUrls) -> Result<Vec<ArticleCandidate>> {
        let document = Html::parse_document(html);
        let link_sel = utils::selector("a[href]")?;
        let mut posts: Vec<(String, String, ElementRef)> = Vec::new();

        for link in document.select(&link_sel) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !href.contains("/p/") || href.contains("/comments") {
                continue;
            }
            let url = match utils::absolute_url(Self::BASE_URL, href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!(href, error = %e, "skipping malformed post link");
                    continue;
                }
            };
            let title = utils::text_of(&link);
            match posts.iter_mut().find(|(u, _, _)| *u == url) {
                // The first non-empty text wins; cover images link without one.
                Some(entry) if entry.1.is_empty() && !title.is_empty() => {
                    entry.1 = title;
                    entry.2 = link;
                }
                Some(_) => {}
                None => posts.push((url, title, link)),
            }
        }

        let mut candidates = Vec::new();
        for (url, title, link) in posts {
            if title.is_empty() || !seen.insert(&url) {
                continue;
            }
            let raw_date = Self::date_near(link);
            let (date, fallback) = self.ctx.resolve_date(Self::METADATA.name, &url, raw_date.as_deref());
            candidates.push(
                ArticleCandidate::new(title, url, date, Self::METADATA.name)
                    .with_author(Self::METADATA.default_author)
                    .with_date_fallback(fallback),
            );
        }
        Ok(candidates)
    }

    /// Walks up from the link: a `time[datetime]` within four levels, or a
    /// "Jan 14 • Author" line within three.
    fn date_near(link: ElementRef) -> Option<String> {
        let time_sel = utils::selector("time[datetime]").ok()?;
        for (level, ancestor) in link.ancestors().filter_map(ElementRef::wrap).take(4).enumerate() {
            if let Some(time) = ancestor.select(&time_sel).next() {
                return time.value().attr("datetime").map(str::to_string);
            }
            if level < 3 {
                let text = utils::text_of(&ancestor);
                if let Some(found) = SHORT_DATE.find(&text) {
                    let date = found.as_str().split('•').next().unwrap_or("").trim();
                    return Some(date.to_string());
                }
            }
        }
        None
    }

    /// Post URLs listed in the sitemap, in document order.
    fn parse_sitemap(xml: &str) -> Result<Vec<String>> {
        let document = Html::parse_document(xml);
        let loc_sel = utils::selector("url loc")?;
        Ok(document
            .select(&loc_sel)
            .map(|loc| utils::text_of(&loc))
            .filter(|url| url.contains("/p/"))
            .collect())
    }

    /// A single post page. Posts without a title or a readable date are skipped.
    fn parse_post(&self, url: &str, html: &str) -> Result<Option<ArticleCandidate>> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let Some(title) = utils::first_text(&root, "h1")? else {
            return Ok(None);
        };
        let raw_date = match utils::first_attr(&root, "time[datetime]", "datetime")? {
            Some(datetime) => Some(datetime),
            None => {
                let text = utils::text_of(&root);
                LONG_DATE
                    .find(&text)
                    .or_else(|| SHORT_DATE.find(&text))
                    .map(|m| m.as_str().split('•').next().unwrap_or("").trim().to_string())
            }
        };
        let Some(date) = raw_date.as_deref().and_then(|d| self.ctx.resolver().resolve(d)) else {
            tracing::debug!(url, "post has no readable date");
            return Ok(None);
        };
        let summary = utils::first_text(&root, ".subtitle, .post-subtitle, .post-summary")?.unwrap_or_default();
        let author = utils::first_text(&root, ".author-name")?
            .unwrap_or_else(|| Self::METADATA.default_author.to_string());

        Ok(Some(
            ArticleCandidate::new(title, url, date, Self::METADATA.name)
                .with_author(author)
                .with_summary(summary),
        ))
    }

    /// Window months that none of `candidates` falls in.
    fn missing_months(&self, candidates: &[ArticleCandidate]) -> Vec<String> {
        let window = self.ctx.window();
        let covered: Vec<String> = candidates
            .iter()
            .filter(|c| window.contains(Some(c.published_at)))
            .map(|c| c.published_at.format("%Y-%m").to_string())
            .collect();
        window.months().into_iter().filter(|m| !covered.contains(m)).collect()
    }

    async fn scrape_sitemap(&self, seen: &mut SeenUrls) -> Vec<ArticleCandidate> {
        let sitemap_url = Self::sitemap_url();
        let urls = match self.ctx.fetch(&sitemap_url).await {
            Ok(response) if response.status == 200 => match Self::parse_sitemap(&response.body) {
                Ok(urls) => urls,
                Err(e) => {
                    tracing::warn!(error = %e, "unparseable sitemap");
                    return Vec::new();
                }
            },
            Ok(response) => {
                tracing::debug!(status = response.status, "sitemap unavailable");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "sitemap request failed");
                return Vec::new();
            }
        };
        tracing::debug!(count = urls.len(), "post urls in sitemap");

        let mut candidates = Vec::new();
        for url in urls {
            if !seen.insert(&url) {
                continue;
            }
            self.ctx.pause(self.ctx.config().request_delay).await;
            let body = match self.ctx.fetch_page(&url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "skipping unreachable post");
                    continue;
                }
            };
            match self.parse_post(&url, &body) {
                Ok(Some(candidate)) => candidates.push(candidate),
                Ok(None) => {}
                Err(e) => tracing::warn!(url = %url, error = %e, "unparseable post"),
            }
        }
        candidates
    }

    async fn scrape_months(&self, seen: &mut SeenUrls) -> Vec<ArticleCandidate> {
        let mut candidates = Vec::new();
        for month in self.ctx.window().months() {
            for url in Self::month_urls(&month) {
                match self.ctx.fetch(&url).await {
                    Ok(response) if response.status == 200 => {
                        match self.parse_archive(&response.body, seen) {
                            Ok(found) => {
                                tracing::debug!(%month, url = %url, count = found.len(), "month archive");
                                candidates.extend(found);
                            }
                            Err(e) => tracing::warn!(url = %url, error = %e, "unparseable month archive"),
                        }
                        break;
                    }
                    Ok(response) => tracing::debug!(url = %url, status = response.status, "month archive unavailable"),
                    Err(e) => tracing::warn!(url = %url, error = %e, "month archive request failed"),
                }
            }
            self.ctx.pause(self.ctx.config().request_delay).await;
        }
        candidates
    }

    async fn scrape_pages(&self, seen: &mut SeenUrls) -> Result<Vec<ArticleCandidate>> {
        let max_pages = self.ctx.config().max_pages;
        let mut candidates = Vec::new();

        for page in 1..=max_pages {
            if page > 1 {
                self.ctx.pause(self.ctx.config().page_delay).await;
            }
            let url = Self::page_url(page);
            let response = self.ctx.fetch(&url).await?;
            if response.status != 200 {
                if page == 1 {
                    return Err(Error::Fetch {
                        url,
                        status: response.status,
                    });
                }
                tracing::debug!(page, status = response.status, "archive pagination ended");
                break;
            }
            let found = self.parse_archive(&response.body, seen)?;
            if found.is_empty() {
                tracing::debug!(page, "archive page had no new posts");
                break;
            }
            candidates.extend(found);
        }
        Ok(candidates)
    }
}

#[async_trait]
impl SourceExtractor for DepartmentOfProductScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let mut seen = SeenUrls::new();
        let mut candidates = self.scrape_months(&mut seen).await;
        if candidates.is_empty() {
            tracing::info!("no month archives, falling back to the main archive");
            candidates = self.scrape_pages(&mut seen).await?;
        }
        let missing = self.missing_months(&candidates);
        if !missing.is_empty() {
            tracing::info!(months = %missing.join(", "), "months without posts, checking the sitemap");
            let found = self.scrape_sitemap(&mut seen).await;
            candidates.extend(found);
        }
        Ok(self.ctx.keep_in_window(&Self::METADATA, candidates))
    }
}
