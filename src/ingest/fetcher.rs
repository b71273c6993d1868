use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::HeadlineEntry;

const TOP_HEADLINES_URL: &str = "https://newsapi.org/v2/top-headlines";

#[derive(Debug, Deserialize)]
struct TopHeadlinesResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawHeadline>,
}

#[derive(Debug, Deserialize)]
struct RawHeadline {
    source: Option<RawSource>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "urlToImage")]
    url_to_image: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

pub struct HeadlineFetcher {
    client: Client,
    api_key: String,
}

impl HeadlineFetcher {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("today-news/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self { client, api_key }
    }

    /// Fetch the current top headlines, ranked by their position in the feed.
    pub async fn top_headlines(&self, country: &str, page_size: u32) -> Result<Vec<HeadlineEntry>> {
        let page_size = page_size.to_string();
        let response = self
            .client
            .get(TOP_HEADLINES_URL)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("country", country),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(
                anyhow::anyhow!("top-headlines request failed: HTTP {}", response.status()).into(),
            );
        }

        let body: TopHeadlinesResponse = response.json().await?;
        if body.status != "ok" {
            return Err(AppError::NewsApi(
                body.message
                    .unwrap_or_else(|| format!("unexpected status {:?}", body.status)),
            ));
        }

        let entries = body
            .articles
            .into_iter()
            .filter(|raw| raw.url.as_deref().is_some_and(|u| !u.trim().is_empty()))
            .enumerate()
            .map(|(i, raw)| HeadlineEntry {
                url: raw.url.unwrap_or_default(),
                title: raw.title,
                description: raw.description,
                url_to_image: raw.url_to_image,
                source_name: raw.source.and_then(|s| s.name),
                author: raw.author,
                published_at: raw.published_at,
                rank: Some(i as i64 + 1),
                category: None,
            })
            .collect();

        Ok(entries)
    }
}
