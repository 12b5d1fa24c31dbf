use std::fmt;

use async_trait::async_trait;
use dn_core::{Result, SummarizationGateway};

/// Offline summarizer: the first 20 words of the existing blurb, or the title and source.
#[derive(Default)]
pub struct DummySummarizer;

impl fmt::Debug for DummySummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummySummarizer").finish()
    }
}

impl DummySummarizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SummarizationGateway for DummySummarizer {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn summarize(&self, title: &str, source: &str, existing_summary: Option<&str>) -> Result<String> {
        let existing = existing_summary.map(str::trim).filter(|s| !s.is_empty());
        let summary = match existing {
            Some(text) => {
                // First 20 words
                let words: Vec<&str> = text.split_whitespace().take(20).collect();
                words.join(" ")
            }
            None => format!("{} ({})", title.trim(), source),
        };
        Ok(summary)
    }
}
