use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};

const USER_AGENT_STRING: &str = "today-news/1.0";

/// Minimum amount of readable text before a page counts as extracted.
const MIN_CONTENT_CHARS: usize = 200;

/// Downloads article pages and reduces them to readable plain text.
pub struct PageExtractor {
    client: Client,
}

impl PageExtractor {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT_STRING)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// Fetch a page and extract its readable text.
    pub async fn extract(&self, article_url: &str) -> Result<String> {
        if Url::parse(article_url).is_err() {
            return Err(AppError::Extract(format!("not a valid url: {article_url}")));
        }

        let response = self.client.get(article_url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Extract(format!(
                "HTTP {} from {}",
                response.status(),
                article_url
            )));
        }

        let html = response.text().await?;

        let text = match html2text::from_read(html.as_bytes(), 80) {
            Ok(t) => t,
            Err(e) => {
                return Err(AppError::Extract(format!(
                    "could not convert {article_url} to text: {e}"
                )))
            }
        };

        // Clean up the text - remove excessive whitespace
        let cleaned: String = text
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if cleaned.len() < MIN_CONTENT_CHARS {
            return Err(AppError::Extract(format!(
                "extracted content too short ({} chars)",
                cleaned.len()
            )));
        }

        Ok(cleaned)
    }

    /// Extract several pages concurrently. A failed page fails only itself.
    pub async fn extract_many(&self, urls: Vec<String>) -> Vec<(String, Result<String>)> {
        stream::iter(urls)
            .map(|url| async move {
                let result = self.extract(&url).await;
                if let Err(e) = &result {
                    tracing::debug!("extraction failed for {}: {}", url, e);
                }
                (url, result)
            })
            .buffer_unordered(4)
            .collect()
            .await
    }
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}
