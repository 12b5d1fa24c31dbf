use std::fmt;
use std::sync::Arc;

use dn_core::{ArticleCandidate, ArticleRecord, ArticleStore, Error, ExclusionList, Result};

use crate::scrapers::SourceKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The source is on the exclusion list.
    Excluded,
    /// A required field is missing.
    Invalid(String),
    /// The source name is not a registered extractor.
    UnknownSource,
    /// Another writer inserted the same url between lookup and insert.
    RaceDuplicate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Excluded => f.write_str("excluded source"),
            SkipReason::Invalid(reason) => write!(f, "invalid: {}", reason),
            SkipReason::UnknownSource => f.write_str("unknown source"),
            SkipReason::RaceDuplicate => f.write_str("inserted concurrently"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Inserted(ArticleRecord),
    /// The url was already stored; nothing was written.
    Existing(ArticleRecord),
    Skipped(SkipReason),
}

impl SaveOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, SaveOutcome::Inserted(_))
    }

    pub fn record(&self) -> Option<&ArticleRecord> {
        match self {
            SaveOutcome::Inserted(record) | SaveOutcome::Existing(record) => Some(record),
            SaveOutcome::Skipped(_) => None,
        }
    }
}

/// Idempotent write path keyed on url. The exclusion list is enforced here as
/// well as in the orchestrator, so no caller can store an excluded source.
pub struct ArticleSaver {
    store: Arc<dyn ArticleStore>,
    excluded: ExclusionList,
}

impl ArticleSaver {
    pub fn new(store: Arc<dyn ArticleStore>, excluded: ExclusionList) -> Self {
        Self { store, excluded }
    }

    pub fn store(&self) -> &Arc<dyn ArticleStore> {
        &self.store
    }

    pub async fn save(&self, candidate: &ArticleCandidate) -> Result<SaveOutcome> {
        if self.excluded.contains(&candidate.source) {
            tracing::info!(source = %candidate.source, url = %candidate.url, "skipping article from excluded source");
            return Ok(SaveOutcome::Skipped(SkipReason::Excluded));
        }
        if SourceKind::from_name(&candidate.source).map(SourceKind::name) != Some(candidate.source.as_str()) {
            tracing::warn!(source = %candidate.source, url = %candidate.url, "unknown source, not saving");
            return Ok(SaveOutcome::Skipped(SkipReason::UnknownSource));
        }

        if let Some(existing) = self.store.find_by_url(candidate.url.trim()).await? {
            if self.excluded.contains(&existing.source) {
                return Ok(SaveOutcome::Skipped(SkipReason::Excluded));
            }
            tracing::debug!(url = %existing.url, "already stored");
            return Ok(SaveOutcome::Existing(existing));
        }

        if let Err(e) = candidate.validate() {
            tracing::warn!(url = %candidate.url, error = %e, "invalid article");
            return Ok(SaveOutcome::Skipped(SkipReason::Invalid(e.to_string())));
        }

        match self.store.insert(candidate).await {
            Ok(record) => Ok(SaveOutcome::Inserted(record)),
            Err(Error::DuplicateKey(url)) => {
                tracing::debug!(%url, "lost insert race, treating as existing");
                Ok(SaveOutcome::Skipped(SkipReason::RaceDuplicate))
            }
            Err(e) => Err(e),
        }
    }

    /// The stored record for `candidate.url`, inserting it first if absent.
    /// `None` when the candidate was skipped.
    pub async fn save_if_absent(&self, candidate: &ArticleCandidate) -> Result<Option<ArticleRecord>> {
        match self.save(candidate).await? {
            SaveOutcome::Inserted(record) | SaveOutcome::Existing(record) => Ok(Some(record)),
            SaveOutcome::Skipped(SkipReason::RaceDuplicate) => self.store.find_by_url(candidate.url.trim()).await,
            SaveOutcome::Skipped(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dn_storage::backends::memory::MemoryStorage;

    fn candidate(url: &str, source: &str) -> ArticleCandidate {
        ArticleCandidate::new(
            "Designing onboarding",
            url,
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            source,
        )
    }

    fn saver() -> (ArticleSaver, MemoryStorage) {
        let storage = MemoryStorage::new();
        let excluded = ExclusionList::new(["UX Movement"]);
        (ArticleSaver::new(Arc::new(storage.clone()), excluded), storage)
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let (saver, storage) = saver();
        let first = saver.save(&candidate("https://a.test/1", "Figma Blog")).await.unwrap();
        assert!(first.is_inserted());

        let again = saver.save(&candidate("https://a.test/1", "Figma Blog")).await.unwrap();
        assert!(matches!(again, SaveOutcome::Existing(_)));
        assert_eq!(again.record().map(|r| r.id), first.record().map(|r| r.id));
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_excluded_source_never_stored() {
        let (saver, storage) = saver();
        let outcome = saver.save(&candidate("https://a.test/2", "UX Movement")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::Excluded));
        assert!(saver.save_if_absent(&candidate("https://a.test/2", "UX Movement")).await.unwrap().is_none());
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_skipped() {
        let (saver, storage) = saver();
        let unknown = saver.save(&candidate("https://a.test/3", "Hacker News")).await.unwrap();
        assert_eq!(unknown, SaveOutcome::Skipped(SkipReason::UnknownSource));

        let untitled = ArticleCandidate::new(" ", "https://a.test/4", NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(), "Figma Blog");
        assert!(matches!(saver.save(&untitled).await.unwrap(), SaveOutcome::Skipped(SkipReason::Invalid(_))));
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_save_if_absent_returns_stored_record() {
        let (saver, _storage) = saver();
        let stored = saver
            .save_if_absent(&candidate("https://a.test/5", "Prototypr"))
            .await
            .unwrap()
            .unwrap();
        let again = saver
            .save_if_absent(&candidate("https://a.test/5", "Prototypr"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, again);
    }
}
