pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use config::{ExclusionList, ScrapeConfig};
pub use dates::{in_range, DateResolver, DateWindow};
pub use error::{Error, Result};
pub use models::SummarizationGateway;
pub use storage::ArticleStore;
pub use types::{ArticleCandidate, ArticlePage, ArticleQuery, ArticleRecord};
