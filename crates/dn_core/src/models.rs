use async_trait::async_trait;
use crate::Result;

/// Produces short article summaries, typically backed by an LLM.
#[async_trait]
pub trait SummarizationGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Summarize an article from its title, source and any existing blurb.
    /// Fails with `Error::Gateway` on network or API failure.
    async fn summarize(&self, title: &str, source: &str, existing_summary: Option<&str>) -> Result<String>;
}
