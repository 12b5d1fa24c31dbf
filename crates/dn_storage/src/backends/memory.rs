use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dn_core::{ArticleCandidate, ArticlePage, ArticleQuery, ArticleRecord, ArticleStore, Error, Result};
use tokio::sync::RwLock;

use crate::StorageBackend;

#[derive(Default)]
pub struct MemoryStore {
    next_id: i64,
    by_url: HashMap<String, usize>,
    articles: Vec<ArticleRecord>,
}

impl MemoryStore {
    pub fn find_by_url(&self, url: &str) -> Option<ArticleRecord> {
        self.by_url.get(url.trim()).map(|&i| self.articles[i].clone())
    }

    pub fn insert(&mut self, article: &ArticleCandidate) -> Result<ArticleRecord> {
        article.validate()?;
        let url = article.url.trim().to_string();
        if self.by_url.contains_key(&url) {
            return Err(Error::DuplicateKey(url));
        }
        self.next_id += 1;
        let record = ArticleRecord::from_candidate(self.next_id, article, Utc::now());
        self.by_url.insert(url, self.articles.len());
        self.articles.push(record.clone());
        Ok(record)
    }

    pub fn query(&self, query: &ArticleQuery) -> ArticlePage {
        let mut matching: Vec<&ArticleRecord> =
            self.articles.iter().filter(|a| query.matches(a)).collect();
        matching.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));

        ArticlePage {
            total_count: matching.len(),
            min_date: matching.iter().map(|a| a.published_at).min(),
            max_date: matching.iter().map(|a| a.published_at).max(),
            items: matching
                .into_iter()
                .skip(query.offset())
                .take(query.page_size)
                .cloned()
                .collect(),
        }
    }

    pub fn distinct_sources(&self) -> Vec<String> {
        self.articles
            .iter()
            .map(|a| a.source.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn update_summary(&mut self, url: &str, summary: &str) -> Result<()> {
        let index = *self
            .by_url
            .get(url.trim())
            .ok_or_else(|| Error::Storage(format!("no article stored for {}", url)))?;
        self.articles[index].summary = summary.to_string();
        Ok(())
    }
}

/// Process-local store; the default backend and the one tests run against.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.articles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn open(_url: Option<&str>) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleStore for MemoryStorage {
    async fn find_by_url(&self, url: &str) -> Result<Option<ArticleRecord>> {
        Ok(self.store.read().await.find_by_url(url))
    }

    async fn insert(&self, article: &ArticleCandidate) -> Result<ArticleRecord> {
        // Check and insert under one write lock so concurrent runs cannot both win.
        self.store.write().await.insert(article)
    }

    async fn query(&self, query: &ArticleQuery) -> Result<ArticlePage> {
        Ok(self.store.read().await.query(query))
    }

    async fn distinct_sources(&self) -> Result<Vec<String>> {
        Ok(self.store.read().await.distinct_sources())
    }

    async fn update_summary(&self, url: &str, summary: &str) -> Result<()> {
        self.store.write().await.update_summary(url, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dn_core::DateWindow;

    fn candidate(url: &str, source: &str, y: i32, m: u32, d: u32) -> ArticleCandidate {
        ArticleCandidate::new(
            format!("Article at {}", url),
            url,
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            source,
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_url() {
        let storage = MemoryStorage::new();
        let first = storage
            .insert(&candidate("https://a.test/1", "Figma Blog", 2025, 1, 5))
            .await
            .unwrap();
        assert_eq!(first.id, 1);

        let err = storage
            .insert(&candidate("https://a.test/1", "UX Planet", 2025, 2, 5))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(storage.len().await, 1);

        let found = storage.find_by_url("https://a.test/1").await.unwrap().unwrap();
        assert_eq!(found.source, "Figma Blog");
        assert!(storage.find_by_url("https://a.test/2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_validates() {
        let storage = MemoryStorage::new();
        let err = storage
            .insert(&candidate("", "Figma Blog", 2025, 1, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_keep_one_record() {
        let storage = MemoryStorage::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    storage
                        .insert(&candidate("https://a.test/race", "Figma Blog", 2025, 1, 5))
                        .await
                })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_query_filters_and_paginates() {
        let storage = MemoryStorage::new();
        for day in 1..=25 {
            storage
                .insert(&candidate(&format!("https://a.test/{}", day), "Figma Blog", 2025, 1, day))
                .await
                .unwrap();
        }
        storage
            .insert(&candidate("https://b.test/1", "UX Planet", 2024, 6, 1))
            .await
            .unwrap();

        let all = storage.query(&ArticleQuery::default()).await.unwrap();
        assert_eq!(all.total_count, 26);
        assert_eq!(all.items.len(), 20);
        assert_eq!(all.items[0].url, "https://a.test/25");
        assert_eq!(all.min_date.unwrap().date_naive(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

        let second = storage
            .query(&ArticleQuery { page: 2, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(second.items.len(), 6);

        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
        )
        .unwrap();
        let ranged = storage
            .query(&ArticleQuery {
                source: Some("Figma Blog".to_string()),
                date_range: Some(window),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ranged.total_count, 3);
        assert_eq!(ranged.max_date.unwrap().date_naive(), window.to);

        let excluded = storage
            .query(&ArticleQuery {
                exclude_sources: vec!["Figma Blog".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(excluded.total_count, 1);
    }

    #[tokio::test]
    async fn test_distinct_sources_and_update_summary() {
        let storage = MemoryStorage::new();
        storage.insert(&candidate("https://a.test/1", "UX Planet", 2025, 1, 1)).await.unwrap();
        storage.insert(&candidate("https://a.test/2", "Figma Blog", 2025, 1, 2)).await.unwrap();
        storage.insert(&candidate("https://a.test/3", "Figma Blog", 2025, 1, 3)).await.unwrap();

        assert_eq!(
            storage.distinct_sources().await.unwrap(),
            vec!["Figma Blog".to_string(), "UX Planet".to_string()]
        );

        storage.update_summary("https://a.test/2", "A fresh summary").await.unwrap();
        let updated = storage.find_by_url("https://a.test/2").await.unwrap().unwrap();
        assert_eq!(updated.summary, "A fresh summary");
        assert!(storage.update_summary("https://missing.test", "x").await.is_err());
    }
}
