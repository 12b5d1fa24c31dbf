use std::collections::BTreeMap;
use std::sync::Arc;

use dn_core::{ArticleCandidate, ArticleStore, ScrapeConfig};
use futures::future::join_all;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::context::ScrapeContext;
use crate::http::Fetcher;
use crate::logging::Logger;
use crate::save::{ArticleSaver, SaveOutcome};
use crate::scrapers::SourceKind;

/// Why a source produced no results in a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("no extractor registered for {0:?}")]
    UnknownSource(String),

    #[error("source {0:?} is excluded")]
    Excluded(String),

    #[error("extraction failed: {0}")]
    Failed(String),

    #[error("extractor task panicked: {0}")]
    Panicked(String),
}

/// Outcome of one source in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub source: String,
    /// Candidates that survived filtering, in extraction order.
    pub candidates: Vec<ArticleCandidate>,
    pub count: usize,
    pub inserted: usize,
    pub date_fallbacks: usize,
    pub error: Option<SourceError>,
}

impl SourceReport {
    fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            candidates: Vec::new(),
            count: 0,
            inserted: 0,
            date_fallbacks: 0,
            error: None,
        }
    }

    fn failed(source: impl Into<String>, error: SourceError) -> Self {
        Self {
            error: Some(error),
            ..Self::empty(source)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-source results of `extract_all`, keyed by source name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub reports: BTreeMap<String, SourceReport>,
}

impl RunSummary {
    pub fn get(&self, source: &str) -> Option<&SourceReport> {
        self.reports.get(source)
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn succeeded(&self) -> usize {
        self.reports.values().filter(|r| r.is_ok()).count()
    }

    pub fn inserted(&self) -> usize {
        self.reports.values().map(|r| r.inserted).sum()
    }

    pub fn message(&self) -> String {
        format!(
            "Scraped {} of {} sources successfully, {} new articles",
            self.succeeded(),
            self.total(),
            self.inserted()
        )
    }
}

/// Runs extractors with isolated failures and saves what they find.
pub struct ScraperManager {
    context: Arc<ScrapeContext>,
    saver: Arc<ArticleSaver>,
    sources: Vec<SourceKind>,
    semaphore: Arc<Semaphore>,
}

impl ScraperManager {
    pub fn new(config: ScrapeConfig, fetcher: Arc<dyn Fetcher>, store: Arc<dyn ArticleStore>) -> Self {
        let saver = ArticleSaver::new(store, config.excluded_sources.clone());
        let permits = config.concurrency.max(1);
        Self {
            context: Arc::new(ScrapeContext::new(config, fetcher)),
            saver: Arc::new(saver),
            sources: SourceKind::ALL.to_vec(),
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Restricts the registry this manager runs over.
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = SourceKind>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    pub fn context(&self) -> &Arc<ScrapeContext> {
        &self.context
    }

    pub fn saver(&self) -> &Arc<ArticleSaver> {
        &self.saver
    }

    /// Registered sources minus the excluded ones.
    pub fn active_sources(&self) -> Vec<SourceKind> {
        let excluded = &self.context.config().excluded_sources;
        self.sources
            .iter()
            .copied()
            .filter(|k| !excluded.contains(k.name()))
            .collect()
    }

    pub async fn extract_all(&self) -> RunSummary {
        let sources = self.active_sources();
        let logger = Logger::new().with_prefix("📰");
        logger.info(&format!("Starting extraction for {} sources", sources.len()));

        let handles: Vec<_> = sources
            .iter()
            .map(|&kind| {
                let context = self.context.clone();
                let saver = self.saver.clone();
                let semaphore = self.semaphore.clone();
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    Self::run_source(kind, context, saver).await
                })
            })
            .collect();

        let mut summary = RunSummary::default();
        for (kind, joined) in sources.into_iter().zip(join_all(handles).await) {
            let report = joined.unwrap_or_else(|e| {
                logger.error(&format!("{} task failed: {}", kind.name(), e));
                SourceReport::failed(kind.name(), SourceError::Panicked(e.to_string()))
            });
            summary.reports.insert(kind.name().to_string(), report);
        }

        logger.info(&summary.message());
        summary
    }

    /// Runs a single source by name or CLI alias. Unknown and excluded names
    /// produce an empty report carrying the reason.
    pub async fn extract_one(&self, name: &str) -> SourceReport {
        let Some(kind) = SourceKind::from_name(name).filter(|k| self.sources.contains(k)) else {
            tracing::error!(source = name, "no extractor registered");
            return SourceReport::failed(name, SourceError::UnknownSource(name.to_string()));
        };
        if self.context.config().excluded_sources.contains(kind.name()) {
            tracing::warn!(source = kind.name(), "refusing to run excluded source");
            return SourceReport::failed(kind.name(), SourceError::Excluded(kind.name().to_string()));
        }

        let _permit = self.semaphore.acquire().await.ok();
        Self::run_source(kind, self.context.clone(), self.saver.clone()).await
    }

    async fn run_source(kind: SourceKind, context: Arc<ScrapeContext>, saver: Arc<ArticleSaver>) -> SourceReport {
        let metadata = kind.metadata();
        let logger = Logger::new()
            .with_prefix(metadata.emoji)
            .with_prefix(format!("[{}]", metadata.name));
        logger.info("Starting extraction");

        let extractor = kind.build(context);
        let candidates = match extractor.extract().await {
            Ok(candidates) => candidates,
            Err(e) => {
                logger.error(&format!("Extraction failed: {}", e));
                return SourceReport::failed(metadata.name, SourceError::Failed(e.to_string()));
            }
        };

        let mut report = SourceReport::empty(metadata.name);
        report.count = candidates.len();
        report.date_fallbacks = candidates.iter().filter(|c| c.date_fallback).count();

        for candidate in &candidates {
            match saver.save(candidate).await {
                Ok(SaveOutcome::Inserted(record)) => {
                    report.inserted += 1;
                    logger.debug(&format!("🆕 {} - {}", record.title, record.url));
                }
                Ok(SaveOutcome::Existing(_)) => {}
                Ok(SaveOutcome::Skipped(reason)) => {
                    logger.debug(&format!("⏭️ {} ({})", candidate.url, reason));
                }
                Err(e) => logger.warn(&format!("Failed to save {}: {}", candidate.url, e)),
            }
        }

        if report.date_fallbacks > 0 {
            logger.warn(&format!("{} articles used today's date as a fallback", report.date_fallbacks));
        }
        logger.info(&format!(
            "Found {} articles, {} new",
            report.count, report.inserted
        ));
        report.candidates = candidates;
        report
    }
}
