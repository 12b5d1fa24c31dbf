use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::DateWindow;
use crate::{Error, Result};

/// Summaries at or below this many characters are considered missing.
pub const MIN_SUMMARY_LEN: usize = 30;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// An article's attributes as produced by an extractor, before it is matched
/// against or inserted into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleCandidate {
    pub title: String,
    pub url: String,
    pub published_at: NaiveDate,
    pub source: String,
    pub author: String,
    pub summary: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    /// Set when no parseable date was found and `published_at` is the run date.
    #[serde(skip)]
    pub date_fallback: bool,
}

impl ArticleCandidate {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        published_at: NaiveDate,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            published_at,
            source: source.into(),
            author: String::new(),
            summary: String::new(),
            content: None,
            image_url: None,
            date_fallback: false,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_content(mut self, content: Option<String>) -> Self {
        self.content = content.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url.filter(|i| !i.trim().is_empty());
        self
    }

    pub fn with_date_fallback(mut self, fallback: bool) -> Self {
        self.date_fallback = fallback;
        self
    }

    /// Checks the fields a stored record cannot do without.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.url.trim().is_empty() {
            missing.push("url");
        }
        if self.source.trim().is_empty() {
            missing.push("source");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "missing {} for candidate {:?}",
                missing.join(", "),
                self.url
            )))
        }
    }

    /// Publication date as a UTC timestamp at midnight.
    pub fn published_at_utc(&self) -> DateTime<Utc> {
        self.published_at.and_time(NaiveTime::MIN).and_utc()
    }
}

/// The stored, normalized article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub author: String,
    pub summary: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub content_fetched: bool,
    pub created_at: DateTime<Utc>,
}

impl ArticleRecord {
    pub fn from_candidate(id: i64, candidate: &ArticleCandidate, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: candidate.title.trim().to_string(),
            url: candidate.url.trim().to_string(),
            published_at: candidate.published_at_utc(),
            source: candidate.source.clone(),
            author: candidate.author.clone(),
            summary: candidate.summary.clone(),
            content: candidate.content.clone(),
            image_url: candidate.image_url.clone(),
            content_fetched: false,
            created_at,
        }
    }

    pub fn needs_summary(&self) -> bool {
        self.summary.trim().chars().count() <= MIN_SUMMARY_LEN
    }

    /// Formatted like "March 07, 2025".
    pub fn published_date(&self) -> String {
        self.published_at.format("%B %d, %Y").to_string()
    }

    /// Short preview text: the content if there is any, otherwise the summary.
    pub fn snippet(&self, length: usize) -> String {
        let text = self
            .content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.summary)
            .trim();
        if text.chars().count() <= length {
            return text.to_string();
        }
        let cut: String = text.chars().take(length.saturating_sub(3)).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Filters for the browsing view.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleQuery {
    pub source: Option<String>,
    pub date_range: Option<DateWindow>,
    pub exclude_sources: Vec<String>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            source: None,
            date_range: None,
            exclude_sources: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ArticleQuery {
    pub fn offset(&self) -> usize {
        self.page.max(1).saturating_sub(1) * self.page_size
    }

    pub fn matches(&self, record: &ArticleRecord) -> bool {
        if self.exclude_sources.iter().any(|s| s == &record.source) {
            return false;
        }
        if let Some(source) = &self.source {
            if &record.source != source {
                return false;
            }
        }
        match &self.date_range {
            Some(window) => window.contains(Some(record.published_at.date_naive())),
            None => true,
        }
    }
}

/// One page of query results plus aggregates over the whole filtered set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticlePage {
    pub items: Vec<ArticleRecord>,
    pub total_count: usize,
    pub min_date: Option<DateTime<Utc>>,
    pub max_date: Option<DateTime<Utc>>,
}
