use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use dn_core::{ArticleCandidate, ArticlePage, ArticleQuery, ArticleRecord, ArticleStore, Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::StorageBackend;

const DEFAULT_DB_PATH: &str = "articles.db";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        published_at TEXT NOT NULL,
        source TEXT NOT NULL,
        author TEXT NOT NULL DEFAULT '',
        summary TEXT NOT NULL DEFAULT '',
        content TEXT,
        image_url TEXT,
        content_fetched INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles (published_at)",
    "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles (source)",
];

pub struct SQLiteStorage {
    pool: SqlitePool,
    location: String,
}

fn db_error(context: &str, e: sqlx::Error) -> Error {
    Error::Database(format!("{}: {}", context, e))
}

/// Timestamps are stored as fixed-width UTC strings so text order is time order.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn decode_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("bad timestamp {:?} in articles table: {}", value, e)))
}

fn day_bound(date: NaiveDate, end_of_day: bool) -> String {
    let time = if end_of_day { "23:59:59" } else { "00:00:00" };
    format!("{}T{}Z", date.format("%Y-%m-%d"), time)
}

fn row_to_record(row: &SqliteRow) -> Result<ArticleRecord> {
    let get_err = |e| db_error("failed to read article row", e);
    Ok(ArticleRecord {
        id: row.try_get("id").map_err(get_err)?,
        title: row.try_get("title").map_err(get_err)?,
        url: row.try_get("url").map_err(get_err)?,
        published_at: decode_timestamp(&row.try_get::<String, _>("published_at").map_err(get_err)?)?,
        source: row.try_get("source").map_err(get_err)?,
        author: row.try_get("author").map_err(get_err)?,
        summary: row.try_get("summary").map_err(get_err)?,
        content: row.try_get("content").map_err(get_err)?,
        image_url: row.try_get("image_url").map_err(get_err)?,
        content_fetched: row.try_get("content_fetched").map_err(get_err)?,
        created_at: decode_timestamp(&row.try_get::<String, _>("created_at").map_err(get_err)?)?,
    })
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ArticleQuery) {
    builder.push(" WHERE 1 = 1");
    if let Some(source) = &query.source {
        builder.push(" AND source = ").push_bind(source.clone());
    }
    for excluded in &query.exclude_sources {
        builder.push(" AND source != ").push_bind(excluded.clone());
    }
    if let Some(window) = &query.date_range {
        builder
            .push(" AND published_at >= ")
            .push_bind(day_bound(window.from, false))
            .push(" AND published_at <= ")
            .push_bind(day_bound(window.to, true));
    }
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be available at ./articles.db or DATABASE_URL"
    }

    async fn open(url: Option<&str>) -> Result<Self> {
        match url {
            Some(url) if url.starts_with("sqlite:") => {
                let options = SqliteConnectOptions::from_str(url)
                    .map_err(|e| db_error("invalid database url", e))?
                    .create_if_missing(true);
                Self::connect(options, url.to_string()).await
            }
            Some(path) => Self::new_with_path(&PathBuf::from(path)).await,
            None => Self::new_with_path(&PathBuf::from(DEFAULT_DB_PATH)).await,
        }
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        Self::connect(options, db_path.display().to_string()).await
    }

    async fn connect(options: SqliteConnectOptions, location: String) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| db_error("failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| db_error(&format!("failed to run migration {}", i), e))?;
        }

        tracing::debug!(location = %location, "opened sqlite article store");
        Ok(Self { pool, location })
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

#[async_trait]
impl ArticleStore for SQLiteStorage {
    async fn find_by_url(&self, url: &str) -> Result<Option<ArticleRecord>> {
        let row = sqlx::query("SELECT * FROM articles WHERE url = ?")
            .bind(url.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to look up article", e))?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn insert(&self, article: &ArticleCandidate) -> Result<ArticleRecord> {
        article.validate()?;
        let record = ArticleRecord::from_candidate(0, article, Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO articles
            (title, url, published_at, source, author, summary, content, image_url, content_fetched, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.title)
        .bind(&record.url)
        .bind(encode_timestamp(&record.published_at))
        .bind(&record.source)
        .bind(&record.author)
        .bind(&record.summary)
        .bind(record.content.as_deref())
        .bind(record.image_url.as_deref())
        .bind(record.content_fetched)
        .bind(encode_timestamp(&record.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(ArticleRecord {
                id: done.last_insert_rowid(),
                ..record
            }),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::DuplicateKey(record.url))
            }
            Err(e) => Err(db_error("failed to store article", e)),
        }
    }

    async fn query(&self, query: &ArticleQuery) -> Result<ArticlePage> {
        let mut totals = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS total, MIN(published_at) AS min_date, MAX(published_at) AS max_date FROM articles",
        );
        push_filters(&mut totals, query);
        let row = totals
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("failed to count articles", e))?;

        let total: i64 = row.try_get("total").map_err(|e| db_error("failed to count articles", e))?;
        let min_date: Option<String> = row.try_get("min_date").map_err(|e| db_error("failed to count articles", e))?;
        let max_date: Option<String> = row.try_get("max_date").map_err(|e| db_error("failed to count articles", e))?;

        let mut page = QueryBuilder::<Sqlite>::new("SELECT * FROM articles");
        push_filters(&mut page, query);
        page.push(" ORDER BY published_at DESC, id DESC LIMIT ")
            .push_bind(query.page_size as i64)
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);
        let rows = page
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("failed to query articles", e))?;

        Ok(ArticlePage {
            items: rows.iter().map(row_to_record).collect::<Result<Vec<_>>>()?,
            total_count: total as usize,
            min_date: min_date.as_deref().map(decode_timestamp).transpose()?,
            max_date: max_date.as_deref().map(decode_timestamp).transpose()?,
        })
    }

    async fn distinct_sources(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT source FROM articles ORDER BY source")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("failed to list sources", e))?;
        rows.iter()
            .map(|row| row.try_get("source").map_err(|e| db_error("failed to list sources", e)))
            .collect()
    }

    async fn update_summary(&self, url: &str, summary: &str) -> Result<()> {
        let done = sqlx::query("UPDATE articles SET summary = ? WHERE url = ?")
            .bind(summary)
            .bind(url.trim())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("failed to update summary", e))?;
        if done.rows_affected() == 0 {
            return Err(Error::Storage(format!("no article stored for {}", url)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dn_core::DateWindow;
    use tempfile::tempdir;

    fn candidate(url: &str, source: &str, day: u32) -> ArticleCandidate {
        ArticleCandidate::new(
            format!("Article {}", day),
            url,
            NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            source,
        )
        .with_author("Someone")
        .with_summary("A summary long enough to not need another pass.")
    }

    async fn open_temp() -> (SQLiteStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("articles.db");
        let storage = SQLiteStorage::new_with_path(&path).await.unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (storage, _dir) = open_temp().await;
        let stored = storage
            .insert(&candidate("https://a.test/1", "Figma Blog", 5).with_content(Some("Body".into())))
            .await
            .unwrap();
        assert!(stored.id > 0);

        let found = storage.find_by_url("https://a.test/1").await.unwrap().unwrap();
        assert_eq!(found.id, stored.id);
        assert_eq!(found.published_at, stored.published_at);
        assert_eq!(found.content.as_deref(), Some("Body"));
        assert!(!found.content_fetched);
    }

    #[tokio::test]
    async fn test_unique_url_maps_to_duplicate_key() {
        let (storage, _dir) = open_temp().await;
        storage.insert(&candidate("https://a.test/1", "Figma Blog", 5)).await.unwrap();
        let err = storage
            .insert(&candidate("https://a.test/1", "UX Planet", 6))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn test_query_window_and_aggregates() {
        let (storage, _dir) = open_temp().await;
        for day in 1..=5 {
            storage
                .insert(&candidate(&format!("https://a.test/{}", day), "Figma Blog", day))
                .await
                .unwrap();
        }
        storage.insert(&candidate("https://b.test/1", "UX Planet", 9)).await.unwrap();

        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(),
        )
        .unwrap();
        let page = storage
            .query(&ArticleQuery {
                date_range: Some(window),
                page_size: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].url, "https://a.test/4");
        assert_eq!(page.min_date.unwrap().date_naive(), window.from);

        let others = storage
            .query(&ArticleQuery {
                exclude_sources: vec!["Figma Blog".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(others.total_count, 1);
        assert_eq!(others.items[0].source, "UX Planet");

        assert_eq!(
            storage.distinct_sources().await.unwrap(),
            vec!["Figma Blog".to_string(), "UX Planet".to_string()]
        );
    }

    #[tokio::test]
    async fn test_reopen_keeps_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("articles.db");
        {
            let storage = SQLiteStorage::new_with_path(&path).await.unwrap();
            storage.insert(&candidate("https://a.test/1", "Figma Blog", 5)).await.unwrap();
            storage.update_summary("https://a.test/1", "Rewritten").await.unwrap();
        }
        let storage = SQLiteStorage::open(path.to_str()).await.unwrap();
        let found = storage.find_by_url("https://a.test/1").await.unwrap().unwrap();
        assert_eq!(found.summary, "Rewritten");
    }
}
