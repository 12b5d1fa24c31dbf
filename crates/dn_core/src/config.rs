use std::collections::BTreeSet;
use std::time::Duration;

use chrono::NaiveDate;

use crate::dates::DateWindow;

pub const DEFAULT_EXCLUDED_SOURCES: &[&str] = &["UX Movement", "UX Design Weekly"];

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Source names that must never be ingested or displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList(BTreeSet<String>);

impl ExclusionList {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            sources
                .into_iter()
                .map(Into::into)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, source: &str) -> bool {
        self.0.contains(source)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// Settings for one ingestion run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub window: DateWindow,
    /// Processing day used for "today" fallbacks and year-less dates.
    pub today: NaiveDate,
    pub excluded_sources: ExclusionList,
    /// Items kept per calendar day for the capped aggregator source.
    pub daily_cap: usize,
    /// Pause between per-day requests.
    pub request_delay: Duration,
    /// Pause between archive pages.
    pub page_delay: Duration,
    pub max_pages: usize,
    /// Sources scraped at the same time by `extract_all`.
    pub concurrency: usize,
    pub user_agent: String,
    pub http_timeout: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::for_today(chrono::Local::now().date_naive())
    }
}

impl ScrapeConfig {
    pub fn for_today(today: NaiveDate) -> Self {
        Self {
            window: DateWindow::until(today),
            today,
            excluded_sources: ExclusionList::new(DEFAULT_EXCLUDED_SOURCES.iter().copied()),
            daily_cap: 10,
            request_delay: Duration::from_millis(500),
            page_delay: Duration::from_secs(1),
            max_pages: 5,
            concurrency: 4,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    /// Moves the processing day to `today` and resets the window to end on it.
    pub fn rolled_to(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self.window = DateWindow::until(today);
        self
    }

    pub fn with_exclusions(mut self, excluded: ExclusionList) -> Self {
        self.excluded_sources = excluded;
        self
    }

    /// No pauses between requests; for tests and local fixtures.
    pub fn without_delays(mut self) -> Self {
        self.request_delay = Duration::ZERO;
        self.page_delay = Duration::ZERO;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_list() {
        let list = ExclusionList::new(["UX Movement", " UX Design Weekly ", ""]);
        assert!(list.contains("UX Movement"));
        assert!(list.contains("UX Design Weekly"));
        assert!(!list.contains("ux movement"));
        assert_eq!(list.iter().count(), 2);
        assert!(ExclusionList::default().is_empty());
    }

    #[test]
    fn test_default_config() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let config = ScrapeConfig::for_today(today).without_delays();
        assert_eq!(config.window.to, today);
        assert_eq!(config.window.from, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(config.excluded_sources.contains("UX Movement"));
        assert_eq!(config.request_delay, Duration::ZERO);
        assert_eq!(config.max_pages, 5);
    }

    #[test]
    fn test_rolled_to_keeps_settings() {
        let day = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
        let config = ScrapeConfig::for_today(day(1, 31))
            .with_exclusions(ExclusionList::new(["Prototypr"]))
            .without_delays()
            .rolled_to(day(2, 1));
        assert_eq!(config.today, day(2, 1));
        assert_eq!(config.window, DateWindow::until(day(2, 1)));
        assert!(config.excluded_sources.contains("Prototypr"));
        assert_eq!(config.page_delay, Duration::ZERO);
    }
}
