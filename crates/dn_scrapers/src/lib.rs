pub mod cap;
pub mod cli;
pub mod context;
pub mod http;
pub mod logging;
pub mod manager;
pub mod save;
pub mod scrapers;

pub use cap::DailyCap;
pub use cli::{handle_command, Interval, ScraperArgs, ScraperCommands};
pub use context::ScrapeContext;
pub use http::{Fetcher, ReqwestFetcher, StaticFetcher};
pub use manager::{RunSummary, ScraperManager, SourceError, SourceReport};
pub use save::{ArticleSaver, SaveOutcome, SkipReason};
pub use scrapers::{SourceExtractor, SourceKind, SourceMetadata};

pub mod prelude {
    pub use super::scrapers::{SourceExtractor, SourceKind};
    pub use dn_core::{ArticleCandidate, Error, Result};
}
