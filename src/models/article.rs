use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A deduplicated news item, keyed by its URL. One row exists per URL no
/// matter how many days reference it.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub source_name: Option<String>,
    pub author: Option<String>,
    pub url_to_image: Option<String>,
    /// Kept verbatim from the feed; not necessarily parseable.
    pub published_at: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub fetched: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub fetch_source: Option<String>,
    pub summary_short: Option<String>,
    pub summary_long: Option<String>,
    pub summary_model: Option<String>,
    pub summary_updated_at: Option<DateTime<Utc>>,
    pub inserted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-side projection of an [`Article`]. Fetch provenance and audit
/// timestamps stay internal.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub source_name: Option<String>,
    pub author: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub summary_short: Option<String>,
    pub summary_long: Option<String>,
}

impl Article {
    pub fn view(&self) -> ArticleView {
        ArticleView {
            id: self.id,
            url: self.url.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            content: self.content.clone(),
            source_name: self.source_name.clone(),
            author: self.author.clone(),
            url_to_image: self.url_to_image.clone(),
            published_at: self.published_at.clone(),
            summary_short: self.summary_short.clone(),
            summary_long: self.summary_long.clone(),
        }
    }
}

/// Fields accepted by the article upsert. `None` leaves the stored value
/// untouched; no field is ever reset to null through this path. Supplying
/// `fetch_source` marks the article as fetched and stamps `fetched_at`.
#[derive(Debug, Clone, Default)]
pub struct ArticleUpsert {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub source_name: Option<String>,
    pub author: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub fetch_source: Option<String>,
}

/// One entry of an ingestion batch, as the feed delivers it. Field names
/// follow the wire format (`urlToImage`, `publishedAt`), with snake_case
/// aliases accepted for hand-written batches.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeadlineEntry {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "urlToImage", alias = "url_to_image")]
    pub url_to_image: Option<String>,
    #[serde(alias = "source")]
    pub source_name: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "publishedAt", alias = "published_at")]
    pub published_at: Option<String>,
    /// Position in the day's list; defaults to 0 when the feed does not rank.
    pub rank: Option<i64>,
    /// Explicit category; when absent the keyword classifier decides.
    #[serde(alias = "cat")]
    pub category: Option<String>,
}

/// Either side of the Article key pair: surrogate id or natural URL.
#[derive(Debug, Clone)]
pub enum ArticleRef {
    Id(i64),
    Url(String),
}

impl fmt::Display for ArticleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleRef::Id(id) => write!(f, "article #{id}"),
            ArticleRef::Url(url) => write!(f, "article {url}"),
        }
    }
}

/// Partial update for the summary triple. `None` fields keep their stored
/// value; the update timestamp is stamped regardless.
#[derive(Debug, Clone, Default)]
pub struct SummaryPatch {
    pub short: Option<String>,
    pub long: Option<String>,
    pub model: Option<String>,
}
