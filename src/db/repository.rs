use chrono::NaiveDate;
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Article, ArticleRef, ArticleUpsert, Day, HeadlineEntry, RankedArticle, SummaryPatch};

use super::ops;
use super::schema::SCHEMA;

/// Async facade over the SQLite store. Every write runs in its own
/// transaction that commits at the end of the call; an error rolls the whole
/// call back. For multi-call batching use [`ops`] against one transaction.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    pub async fn upsert_article(&self, input: ArticleUpsert) -> Result<Article> {
        let article = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let article = ops::upsert_article(&tx, &input).map_err(into_call_error)?;
                tx.commit()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    pub async fn ensure_day(&self, date: NaiveDate) -> Result<Day> {
        let day = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let day = ops::ensure_day(&tx, date).map_err(into_call_error)?;
                tx.commit()?;
                Ok(day)
            })
            .await?;
        Ok(day)
    }

    /// Reconcile the article set for a date. Atomic: on any store failure the
    /// day keeps its previous associations.
    pub async fn set_day_articles(
        &self,
        date: NaiveDate,
        entries: Vec<HeadlineEntry>,
    ) -> Result<usize> {
        let stored = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let stored = ops::set_day_articles(&tx, date, &entries).map_err(into_call_error)?;
                tx.commit()?;
                Ok(stored)
            })
            .await?;
        Ok(stored)
    }

    pub async fn get_day_articles(&self, date: NaiveDate) -> Result<Vec<RankedArticle>> {
        let articles = self
            .conn
            .call(move |conn| ops::get_day_articles(conn, date).map_err(into_call_error))
            .await?;
        Ok(articles)
    }

    pub async fn get_article(&self, key: ArticleRef) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| ops::get_article(conn, &key).map_err(into_call_error))
            .await?;
        Ok(article)
    }

    pub async fn save_article_summary(
        &self,
        key: ArticleRef,
        patch: SummaryPatch,
    ) -> Result<Article> {
        let article = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let article =
                    ops::save_article_summary(&tx, &key, &patch).map_err(into_call_error)?;
                tx.commit()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }
}

fn into_call_error(err: crate::error::AppError) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(err))
}
