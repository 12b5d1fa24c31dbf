use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Result};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;

use crate::context::ScrapeContext;
use crate::scrapers::{utils, SourceCategory, SourceExtractor, SourceMetadata};

lazy_static! {
    static ref ISSUE_NUMBER: Regex = Regex::new(r"(?i)Issue\s+#?(\d+)").expect("valid issue regex");
    static ref LONG_DATE: Regex = Regex::new(
        r"(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}"
    )
    .expect("valid long date regex");
}

const SKIPPED_HEADINGS: &[&str] = &["articles", "sponsor", "tools", "resources", "last but not least"];

const ISSUE_SUMMARY: &str = "A curated reading list of the best user experience design links every week.";

/// Weekly issue page; each heading of the latest issue becomes one entry.
pub struct UxDesignWeeklyScraper {
    ctx: Arc<ScrapeContext>,
}

struct Issue {
    number: String,
    raw_date: Option<String>,
    headings: Vec<String>,
}

impl UxDesignWeeklyScraper {
    pub const METADATA: SourceMetadata = SourceMetadata {
        name: "UX Design Weekly",
        emoji: "📬",
        default_author: "UX Design Weekly",
        category: SourceCategory::Newsletter,
        skip_date_filter: false,
    };

    const BASE_URL: &'static str = "https://uxdesignweekly.com/";

    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    fn latest_issue_url(html: &str) -> Result<Option<String>> {
        let document = Html::parse_document(html);
        let sel = utils::selector("a[href]")?;
        let href = document
            .select(&sel)
            .filter_map(|a| a.value().attr("href"))
            .find(|href| href.contains("issue-"));
        href.map(|h| utils::absolute_url(Self::BASE_URL, h)).transpose()
    }

    fn parse_issue(html: &str) -> Result<Issue> {
        let document = Html::parse_document(html);

        let title_sel = utils::selector("title")?;
        let page_title = document.select(&title_sel).next().map(|t| utils::text_of(&t)).unwrap_or_default();
        let number = ISSUE_NUMBER
            .captures(&page_title)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "?".to_string());

        let body_sel = utils::selector("body")?;
        let raw_date = document
            .select(&body_sel)
            .next()
            .and_then(|body| LONG_DATE.find(&utils::text_of(&body)).map(|m| m.as_str().to_string()));

        let heading_sel = utils::selector("h2, h3, strong")?;
        let mut seen = HashSet::new();
        let headings = document
            .select(&heading_sel)
            .map(|h| utils::text_of(&h))
            .filter(|text| text.chars().count() >= 10)
            .filter(|text| {
                let lower = text.to_lowercase();
                !SKIPPED_HEADINGS.iter().any(|s| lower.starts_with(s))
            })
            .filter(|text| seen.insert(text.clone()))
            .collect();

        Ok(Issue {
            number,
            raw_date,
            headings,
        })
    }
}

#[async_trait]
impl SourceExtractor for UxDesignWeeklyScraper {
    fn source_metadata(&self) -> SourceMetadata {
        Self::METADATA
    }

    async fn extract(&self) -> Result<Vec<ArticleCandidate>> {
        let home = self.ctx.fetch_page(Self::BASE_URL).await?;
        let Some(issue_url) = Self::latest_issue_url(&home)? else {
            tracing::warn!(source = Self::METADATA.name, "no issue link on the home page");
            return Ok(Vec::new());
        };
        self.ctx.pause(self.ctx.config().request_delay).await;

        let issue = Self::parse_issue(&self.ctx.fetch_page(&issue_url).await?)?;
        let (date, fallback) = self.ctx.resolve_date(Self::METADATA.name, &issue_url, issue.raw_date.as_deref());

        let candidates = if issue.headings.is_empty() {
            vec![ArticleCandidate::new(
                format!("UX Design Weekly: Issue #{}", issue.number),
                issue_url.clone(),
                date,
                Self::METADATA.name,
            )
            .with_author("Kenny Chen")
            .with_summary(ISSUE_SUMMARY)
            .with_date_fallback(fallback)]
        } else {
            issue
                .headings
                .iter()
                .enumerate()
                .map(|(i, heading)| {
                    let topic = heading.rsplit(':').next().unwrap_or(heading).trim();
                    ArticleCandidate::new(
                        heading.clone(),
                        format!("{}#article{}", issue_url, i + 1),
                        date,
                        Self::METADATA.name,
                    )
                    .with_author(Self::METADATA.default_author)
                    .with_summary(format!("From Issue #{}: {}", issue.number, topic))
                    .with_date_fallback(fallback)
                })
                .collect()
        };

        Ok(self.ctx.keep_in_window(&Self::METADATA, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{context, date};
    use crate::http::StaticFetcher;

    const HOME: &str = r#"<html><body>
        <a href="/about">About</a>
        <a href="/issue-412/">Issue 412</a>
        <a href="/issue-411/">Issue 411</a>
      </body></html>"#;

    #[tokio::test]
    async fn test_extract_headings() {
        let issue = r#"<html><head><title>Issue #412 - UX Design Weekly</title></head><body>
            <p>January 20, 2025</p>
            <h2>Articles</h2>
            <h3>Research: Designing for trust</h3>
            <h3>Research: Designing for trust</h3>
            <strong>Short</strong>
            <h3>Sponsor: Buy our course</h3>
            <h3>Accessible color systems</h3>
          </body></html>"#;
        let fetcher = StaticFetcher::new()
            .with_page("https://uxdesignweekly.com/", HOME)
            .with_page("https://uxdesignweekly.com/issue-412/", issue);
        let scraper = UxDesignWeeklyScraper::new(context(fetcher));

        let candidates = scraper.extract().await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, "https://uxdesignweekly.com/issue-412/#article1");
        assert_eq!(candidates[0].summary, "From Issue #412: Designing for trust");
        assert_eq!(candidates[1].title, "Accessible color systems");
        assert!(candidates.iter().all(|c| c.published_at == date(2025, 1, 20)));
    }

    #[tokio::test]
    async fn test_extract_whole_issue_entry() {
        let issue = r#"<html><head><title>UX Design Weekly Issue 412</title></head><body>
            <p>Published January 21, 2025</p><h2>Tools</h2></body></html>"#;
        let fetcher = StaticFetcher::new()
            .with_page("https://uxdesignweekly.com/", HOME)
            .with_page("https://uxdesignweekly.com/issue-412/", issue);
        let scraper = UxDesignWeeklyScraper::new(context(fetcher));

        let candidates = scraper.extract().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "UX Design Weekly: Issue #412");
        assert_eq!(candidates[0].author, "Kenny Chen");
        assert_eq!(candidates[0].url, "https://uxdesignweekly.com/issue-412/");
    }
}
