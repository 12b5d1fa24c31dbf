pub mod enrich;
pub mod models;

pub use enrich::{EnrichReport, SummaryEnricher};
pub use models::{available_summarizers, create_summarizer};

pub mod prelude {
    pub use super::enrich::SummaryEnricher;
    pub use super::models::create_summarizer;
    pub use dn_core::{Error, Result, SummarizationGateway};
}
