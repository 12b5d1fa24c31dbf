use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use dn_core::{ArticleCandidate, DateResolver, DateWindow, Result, ScrapeConfig};

use crate::http::{FetchResponse, Fetcher};
use crate::scrapers::SourceMetadata;

/// Shared state every extractor is built with: the run window, the date resolver
/// and the HTTP seam.
pub struct ScrapeContext {
    config: ScrapeConfig,
    resolver: DateResolver,
    fetcher: Arc<dyn Fetcher>,
}

impl ScrapeContext {
    pub fn new(config: ScrapeConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            resolver: DateResolver::new(config.today),
            config,
            fetcher,
        }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    pub fn window(&self) -> DateWindow {
        self.config.window
    }

    pub fn today(&self) -> NaiveDate {
        self.config.today
    }

    pub fn resolver(&self) -> &DateResolver {
        &self.resolver
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        self.fetcher.get(url).await
    }

    /// Body of a page that must exist; non-2xx becomes `Error::Fetch`.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        self.fetch(url).await?.into_body(url)
    }

    pub async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Resolves `text` to a date, falling back to today. The flag is true when
    /// the fallback was used.
    pub fn resolve_date(&self, source: &str, url: &str, text: Option<&str>) -> (NaiveDate, bool) {
        let raw = text.map(str::trim).unwrap_or("");
        match Some(raw).filter(|t| !t.is_empty()).and_then(|t| self.resolver.resolve(t)) {
            Some(date) => (date, false),
            None => {
                tracing::warn!(source, url, raw, "no parseable date, falling back to today");
                (self.today(), true)
            }
        }
    }

    /// Keeps candidates inside the window unless the source opts out of date filtering.
    pub fn keep_in_window(
        &self,
        metadata: &SourceMetadata,
        candidates: Vec<ArticleCandidate>,
    ) -> Vec<ArticleCandidate> {
        if metadata.skip_date_filter {
            return candidates;
        }
        let window = self.window();
        let before = candidates.len();
        let kept: Vec<_> = candidates
            .into_iter()
            .filter(|c| window.contains(Some(c.published_at)))
            .collect();
        if kept.len() < before {
            tracing::debug!(
                source = metadata.name,
                dropped = before - kept.len(),
                from = %window.from,
                to = %window.to,
                "dropped candidates outside window"
            );
        }
        kept
    }
}

/// Per-run set of URLs already emitted by one extractor.
#[derive(Debug, Default)]
pub struct SeenUrls(HashSet<String>);

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `url` is seen.
    pub fn insert(&mut self, url: &str) -> bool {
        self.0.insert(url.trim().to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains(url.trim())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::http::StaticFetcher;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Run day 2025-01-31 with a January window and no delays.
    pub fn context(fetcher: StaticFetcher) -> Arc<ScrapeContext> {
        context_with(fetcher, |c| c)
    }

    pub fn context_with(
        fetcher: StaticFetcher,
        adjust: impl FnOnce(ScrapeConfig) -> ScrapeConfig,
    ) -> Arc<ScrapeContext> {
        let today = date(2025, 1, 31);
        let config = ScrapeConfig::for_today(today)
            .with_window(DateWindow::new(date(2025, 1, 1), today).unwrap())
            .without_delays();
        Arc::new(ScrapeContext::new(adjust(config), fetcher.shared()))
    }
}
