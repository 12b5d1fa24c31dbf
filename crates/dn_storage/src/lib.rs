use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleStore, Error, Result};

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: ArticleStore + Sized {
    fn get_error_message() -> &'static str;

    /// Open the backend, optionally at an explicit location.
    async fn open(url: Option<&str>) -> Result<Self>;
}

/// Names accepted by `create_storage`.
pub fn available_backends() -> Vec<&'static str> {
    let mut names = vec!["memory"];
    if cfg!(feature = "sqlite") {
        names.push("sqlite");
    }
    names
}

pub async fn create_storage(kind: &str, url: Option<&str>) -> Result<Arc<dyn ArticleStore>> {
    match kind {
        "memory" => Ok(Arc::new(MemoryStorage::open(url).await?)),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let storage = SQLiteStorage::open(url).await.map_err(|e| {
                tracing::error!(error = %e, "{}", SQLiteStorage::get_error_message());
                e
            })?;
            Ok(Arc::new(storage))
        }
        other => Err(Error::Config(format!(
            "unknown storage backend {:?}, expected one of: {}",
            other,
            available_backends().join(", ")
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageBackend};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_storage() {
        assert!(create_storage("memory", None).await.is_ok());
        let err = create_storage("postgres", None).await.err().unwrap();
        assert!(err.to_string().contains("unknown storage backend"));
    }
}
