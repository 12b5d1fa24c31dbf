use std::sync::Arc;

use dn_core::{ArticleQuery, ArticleRecord, ArticleStore, Result, SummarizationGateway};
use futures::stream::{self, StreamExt};

const SCAN_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    /// Records that needed a summary.
    pub pending: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Fills in summaries for stored articles whose summary is empty or too short.
pub struct SummaryEnricher {
    store: Arc<dyn ArticleStore>,
    gateway: Arc<dyn SummarizationGateway>,
    exclude_sources: Vec<String>,
    concurrency: usize,
}

impl SummaryEnricher {
    pub fn new(store: Arc<dyn ArticleStore>, gateway: Arc<dyn SummarizationGateway>) -> Self {
        Self {
            store,
            gateway,
            exclude_sources: Vec::new(),
            concurrency: 4,
        }
    }

    pub fn with_exclusions(mut self, sources: Vec<String>) -> Self {
        self.exclude_sources = sources;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Newest first, at most `limit` records.
    pub async fn pending(&self, limit: Option<usize>) -> Result<Vec<ArticleRecord>> {
        let mut pending = Vec::new();
        let mut query = ArticleQuery {
            exclude_sources: self.exclude_sources.clone(),
            page_size: SCAN_PAGE_SIZE,
            ..ArticleQuery::default()
        };
        loop {
            let page = self.store.query(&query).await?;
            let exhausted = page.items.len() < SCAN_PAGE_SIZE;
            pending.extend(page.items.into_iter().filter(ArticleRecord::needs_summary));
            if limit.is_some_and(|l| pending.len() >= l) {
                break;
            }
            if exhausted {
                break;
            }
            query.page += 1;
        }
        if let Some(limit) = limit {
            pending.truncate(limit);
        }
        Ok(pending)
    }

    pub async fn run(&self, limit: Option<usize>) -> Result<EnrichReport> {
        let pending = self.pending(limit).await?;
        let mut report = EnrichReport {
            pending: pending.len(),
            ..EnrichReport::default()
        };
        tracing::info!(count = pending.len(), model = self.gateway.name(), "summarizing articles");

        let results: Vec<bool> = stream::iter(pending)
            .map(|record| async move { self.summarize_one(&record).await })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        report.updated = results.iter().filter(|ok| **ok).count();
        report.failed = results.len() - report.updated;
        tracing::info!(updated = report.updated, failed = report.failed, "summarization finished");
        Ok(report)
    }

    /// A gateway or store failure leaves the stored summary as it was.
    async fn summarize_one(&self, record: &ArticleRecord) -> bool {
        let existing = Some(record.summary.as_str()).filter(|s| !s.trim().is_empty());
        let summary = match self.gateway.summarize(&record.title, &record.source, existing).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => {
                tracing::warn!(url = %record.url, "gateway returned an empty summary");
                return false;
            }
            Err(e) => {
                tracing::warn!(url = %record.url, error = %e, "summarization failed");
                return false;
            }
        };
        match self.store.update_summary(&record.url, summary.trim()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(url = %record.url, error = %e, "could not store summary");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummySummarizer;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use dn_core::{ArticleCandidate, Error};
    use dn_storage::MemoryStorage;

    struct FailingGateway;

    #[async_trait]
    impl SummarizationGateway for FailingGateway {
        fn name(&self) -> &str {
            "failing"
        }

        async fn summarize(&self, _title: &str, _source: &str, _existing: Option<&str>) -> Result<String> {
            Err(Error::Gateway("rate limited".to_string()))
        }
    }

    async fn seeded() -> MemoryStorage {
        let storage = MemoryStorage::new();
        let day = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let articles = [
            ArticleCandidate::new("Short blurb", "https://a.test/1", day, "Figma Blog").with_summary("Too short."),
            ArticleCandidate::new("No blurb", "https://a.test/2", day, "Prototypr"),
            ArticleCandidate::new("Long blurb", "https://a.test/3", day, "Figma Blog")
                .with_summary("A long enough description of what this article covers in detail."),
            ArticleCandidate::new("Hidden", "https://a.test/4", day, "UX Movement"),
        ];
        for article in &articles {
            storage.insert(article).await.unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn test_enrich_short_summaries() {
        let storage = seeded().await;
        let enricher = SummaryEnricher::new(Arc::new(storage.clone()), Arc::new(DummySummarizer::new()))
            .with_exclusions(vec!["UX Movement".to_string()]);

        let report = enricher.run(None).await.unwrap();
        assert_eq!(report, EnrichReport { pending: 2, updated: 2, failed: 0 });

        let no_blurb = storage.find_by_url("https://a.test/2").await.unwrap().unwrap();
        assert_eq!(no_blurb.summary, "No blurb (Prototypr)");
        let hidden = storage.find_by_url("https://a.test/4").await.unwrap().unwrap();
        assert!(hidden.summary.is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_existing_summary() {
        let storage = seeded().await;
        let enricher = SummaryEnricher::new(Arc::new(storage.clone()), Arc::new(FailingGateway));

        let report = enricher.run(Some(1)).await.unwrap();
        assert_eq!(report.pending, 1);
        assert_eq!(report.failed, 1);

        let short = storage.find_by_url("https://a.test/1").await.unwrap().unwrap();
        assert_eq!(short.summary, "Too short.");
    }
}
