use std::sync::Arc;

use dn_core::{Error, Result, SummarizationGateway};

pub mod dummy;
pub mod openai;

pub use dummy::DummySummarizer;
pub use openai::OpenAiSummarizer;

/// Names accepted by `create_summarizer`.
pub fn available_summarizers() -> Vec<&'static str> {
    vec!["openai", "dummy"]
}

/// Builds a summarizer by name. `openai` needs an API key.
pub fn create_summarizer(name: &str, api_key: Option<String>) -> Result<Arc<dyn SummarizationGateway>> {
    match name {
        "openai" => {
            let api_key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))?;
            Ok(Arc::new(OpenAiSummarizer::new(api_key)?))
        }
        "dummy" => Ok(Arc::new(DummySummarizer::new())),
        other => Err(Error::Config(format!(
            "unknown summarizer {:?}, expected one of: {}",
            other,
            available_summarizers().join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_summarizer() {
        assert_eq!(create_summarizer("dummy", None).unwrap().name(), "Dummy");
        assert_eq!(create_summarizer("openai", Some("sk-test".into())).unwrap().name(), "OpenAI");
        assert!(matches!(create_summarizer("openai", None), Err(Error::Config(_))));
        assert!(create_summarizer("deepseek", None).is_err());
    }
}
