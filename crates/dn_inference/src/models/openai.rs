use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dn_core::{Error, Result, SummarizationGateway};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that creates concise article summaries for a product design news aggregator.";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

/// Chat-completions backed summarizer.
pub struct OpenAiSummarizer {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client: Arc::new(client),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn prompt(title: &str, source: &str, existing_summary: Option<&str>) -> String {
        let mut prompt = format!(
            "Create a concise 1-2 sentence summary of this article titled '{}' from {}.",
            title, source
        );
        if let Some(summary) = existing_summary.map(str::trim).filter(|s| !s.is_empty()) {
            prompt.push_str(&format!(" Existing description: {}", summary));
        }
        prompt
    }

    fn request(&self, title: &str, source: &str, existing_summary: Option<&str>) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::prompt(title, source, existing_summary),
                },
            ],
            max_tokens: 100,
            temperature: 0.7,
        }
    }

    fn first_choice(response: ChatResponse) -> Result<String> {
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Gateway("empty completion".to_string()))
    }
}

impl fmt::Debug for OpenAiSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSummarizer")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl SummarizationGateway for OpenAiSummarizer {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn summarize(&self, title: &str, source: &str, existing_summary: Option<&str>) -> Result<String> {
        let request = self.request(title, source, existing_summary);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!("{}: {}", status, body)));
        }

        let response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::Gateway(e.to_string()))?;
        Self::first_choice(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let model = OpenAiSummarizer::new("sk-test").unwrap();
        let request = model.request("Design tokens", "Prototypr", Some("Tokens keep teams aligned."));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(
            json["messages"][1]["content"],
            "Create a concise 1-2 sentence summary of this article titled 'Design tokens' from Prototypr. \
             Existing description: Tokens keep teams aligned."
        );
    }

    #[test]
    fn test_prompt_without_summary() {
        let prompt = OpenAiSummarizer::prompt("Design tokens", "Prototypr", Some("  "));
        assert!(!prompt.contains("Existing description"));
    }

    #[test]
    fn test_first_choice() {
        let ok: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":" A summary. "}}]}"#).unwrap();
        assert_eq!(OpenAiSummarizer::first_choice(ok).unwrap(), "A summary.");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(OpenAiSummarizer::first_choice(empty), Err(Error::Gateway(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let model = OpenAiSummarizer::new("sk-secret").unwrap();
        assert!(!format!("{:?}", model).contains("sk-secret"));
    }
}
