use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::article::ArticleView;

/// One row per calendar date. Created lazily, never auto-deleted. A day owns
/// its article associations; the articles themselves are shared.
#[derive(Debug, Clone, Serialize)]
pub struct Day {
    pub id: i64,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of a day's ordered article list, as returned to readers.
#[derive(Debug, Clone, Serialize)]
pub struct RankedArticle {
    pub rank: i64,
    pub category: String,
    pub article: ArticleView,
}
