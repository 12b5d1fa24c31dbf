use async_trait::async_trait;
use crate::types::{ArticleCandidate, ArticlePage, ArticleQuery, ArticleRecord};
use crate::Result;

/// Persistence for normalized articles. Implementations must enforce
/// uniqueness of `url` themselves rather than relying on callers to
/// check before inserting.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Look up an article by its natural key
    async fn find_by_url(&self, url: &str) -> Result<Option<ArticleRecord>>;

    /// Insert a new article. Fails with `Error::DuplicateKey` when the url
    /// is already stored.
    async fn insert(&self, article: &ArticleCandidate) -> Result<ArticleRecord>;

    /// Filtered, paginated listing ordered newest first
    async fn query(&self, query: &ArticleQuery) -> Result<ArticlePage>;

    /// Every source name that has at least one stored article, sorted
    async fn distinct_sources(&self) -> Result<Vec<String>>;

    /// Replace the summary of a stored article
    async fn update_summary(&self, url: &str, summary: &str) -> Result<()>;
}
