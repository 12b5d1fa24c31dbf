use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{Error, Result, ScrapeConfig};

/// Status code and body of one GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body, or `Error::Fetch` for a non-2xx status.
    pub fn into_body(self, url: &str) -> Result<String> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(Error::Fetch {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// Network seam used by every extractor. Non-2xx is a normal response, not an `Err`;
/// `Err` is reserved for transport failures.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn shared(config: &ScrapeConfig) -> Result<Arc<dyn Fetcher>> {
        Ok(Arc::new(Self::new(config)?))
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(url, status, bytes = body.len(), "fetched");
        Ok(FetchResponse { status, body })
    }
}

/// Canned responses keyed by exact URL; anything else is a 404.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, FetchResponse>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(
            url.into(),
            FetchResponse {
                status: 200,
                body: body.into(),
            },
        );
        self
    }

    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.pages.insert(
            url.into(),
            FetchResponse {
                status,
                body: String::new(),
            },
        );
        self
    }

    pub fn shared(self) -> Arc<dyn Fetcher> {
        Arc::new(self)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        Ok(self.pages.get(url).cloned().unwrap_or(FetchResponse {
            status: 404,
            body: String::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher() {
        let fetcher = StaticFetcher::new()
            .with_page("https://a.test/", "<html></html>")
            .with_status("https://a.test/down", 500);

        let ok = fetcher.get("https://a.test/").await.unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.into_body("https://a.test/").unwrap(), "<html></html>");

        let down = fetcher.get("https://a.test/down").await.unwrap();
        let err = down.into_body("https://a.test/down").unwrap_err();
        assert!(matches!(err, Error::Fetch { status: 500, .. }));

        assert_eq!(fetcher.get("https://a.test/missing").await.unwrap().status, 404);
    }
}
