//! Transaction-scoped store operations.
//!
//! Every function takes an explicit connection handle (a
//! [`rusqlite::Transaction`] derefs to one) and never commits on its own.
//! [`Repository`](super::Repository) wraps each call in a transaction that
//! commits at the end; callers that want to batch several operations into one
//! commit run them against their own transaction instead.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{AppError, Result};
use crate::ingest::category;
use crate::models::{Article, ArticleRef, ArticleUpsert, Day, HeadlineEntry, RankedArticle, SummaryPatch};

/// Insert or update an Article by URL and return the stored row.
///
/// Provided fields overwrite, absent fields are left untouched; nothing is
/// ever reset to null through this path. This is the single code path through
/// which ingestion creates or updates article metadata.
pub fn upsert_article(conn: &Connection, input: &ArticleUpsert) -> Result<Article> {
    if input.url.trim().is_empty() {
        return Err(AppError::Validation(
            "url is required to upsert an article".into(),
        ));
    }

    conn.execute(
        r#"INSERT INTO articles (url, title, description, content, source_name, author,
                                 url_to_image, published_at, language, country,
                                 fetch_source, fetched, fetched_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                   CASE WHEN ?11 IS NULL THEN 0 ELSE 1 END,
                   CASE WHEN ?11 IS NULL THEN NULL ELSE datetime('now') END)
           ON CONFLICT(url) DO UPDATE SET
               title = COALESCE(excluded.title, articles.title),
               description = COALESCE(excluded.description, articles.description),
               content = COALESCE(excluded.content, articles.content),
               source_name = COALESCE(excluded.source_name, articles.source_name),
               author = COALESCE(excluded.author, articles.author),
               url_to_image = COALESCE(excluded.url_to_image, articles.url_to_image),
               published_at = COALESCE(excluded.published_at, articles.published_at),
               language = COALESCE(excluded.language, articles.language),
               country = COALESCE(excluded.country, articles.country),
               fetch_source = COALESCE(excluded.fetch_source, articles.fetch_source),
               fetched = MAX(articles.fetched, excluded.fetched),
               fetched_at = COALESCE(excluded.fetched_at, articles.fetched_at),
               updated_at = datetime('now')"#,
        params![
            input.url,
            input.title,
            input.description,
            input.content,
            input.source_name,
            input.author,
            input.url_to_image,
            input.published_at,
            input.language,
            input.country,
            input.fetch_source,
        ],
    )?;

    get_article(conn, &ArticleRef::Url(input.url.clone()))?
        .ok_or_else(|| AppError::Store(format!("article {} missing after upsert", input.url)))
}

/// Ensure a day row exists for `date` and return it.
pub fn ensure_day(conn: &Connection, date: NaiveDate) -> Result<Day> {
    conn.execute(
        "INSERT INTO days (date) VALUES (?1) ON CONFLICT(date) DO NOTHING",
        params![date.to_string()],
    )?;
    let day = conn.query_row(
        "SELECT id, date, created_at, updated_at FROM days WHERE date = ?1",
        params![date.to_string()],
        day_from_row,
    )?;
    Ok(day)
}

/// Replace the article set for `date` with the given batch.
///
/// Entries without a URL are skipped; duplicate URLs keep the metadata of the
/// last occurrence while the association order follows the first. Existing
/// associations are updated in place (notes preserved), missing ones are
/// created, and associations for URLs absent from the batch are deleted. The
/// underlying articles are never deleted. Returns the size of the new set.
pub fn set_day_articles(
    conn: &Connection,
    date: NaiveDate,
    entries: &[HeadlineEntry],
) -> Result<usize> {
    let day = ensure_day(conn, date)?;

    let mut order: Vec<&str> = Vec::new();
    let mut by_url: HashMap<&str, &HeadlineEntry> = HashMap::new();
    for entry in entries {
        let url = entry.url.trim();
        if url.is_empty() {
            tracing::debug!("skipping headline entry without url");
            continue;
        }
        if by_url.insert(url, entry).is_none() {
            order.push(url);
        }
    }

    let mut desired_ids: Vec<i64> = Vec::with_capacity(order.len());
    for url in &order {
        let entry = by_url[*url];
        let article = upsert_article(
            conn,
            &ArticleUpsert {
                url: (*url).to_string(),
                title: entry.title.clone(),
                description: entry.description.clone(),
                url_to_image: entry.url_to_image.clone(),
                source_name: entry.source_name.clone(),
                author: entry.author.clone(),
                published_at: entry.published_at.clone(),
                ..ArticleUpsert::default()
            },
        )?;

        let rank = entry.rank.unwrap_or(0);
        let category = match entry.category.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(c) => c.to_string(),
            None => category::classify(
                entry.title.as_deref().unwrap_or(""),
                entry.description.as_deref().unwrap_or(""),
            )
            .to_string(),
        };

        conn.execute(
            r#"INSERT INTO day_articles (day_id, article_id, rank, category)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(day_id, article_id) DO UPDATE SET
                   rank = excluded.rank,
                   category = excluded.category"#,
            params![day.id, article.id, rank, category],
        )?;
        desired_ids.push(article.id);
    }

    // Drop associations no longer in the batch; the articles themselves stay.
    if desired_ids.is_empty() {
        conn.execute("DELETE FROM day_articles WHERE day_id = ?1", params![day.id])?;
    } else {
        let placeholders = vec!["?"; desired_ids.len()].join(", ");
        let sql = format!(
            "DELETE FROM day_articles WHERE day_id = ? AND article_id NOT IN ({placeholders})"
        );
        let mut sql_params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(desired_ids.len() + 1);
        sql_params.push(&day.id);
        for id in &desired_ids {
            sql_params.push(id);
        }
        conn.execute(&sql, &sql_params[..])?;
    }

    Ok(desired_ids.len())
}

/// Return the articles stored for `date`, rank ascending. Equal ranks come
/// back in insertion order. An unknown date yields an empty list.
pub fn get_day_articles(conn: &Connection, date: NaiveDate) -> Result<Vec<RankedArticle>> {
    let day_id: Option<i64> = conn
        .query_row(
            "SELECT id FROM days WHERE date = ?1",
            params![date.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(day_id) = day_id else {
        return Ok(Vec::new());
    };

    let mut stmt = conn.prepare(
        r#"SELECT a.id, a.url, a.title, a.description, a.content, a.source_name, a.author,
                  a.url_to_image, a.published_at, a.language, a.country, a.fetched,
                  a.fetched_at, a.fetch_source, a.summary_short, a.summary_long,
                  a.summary_model, a.summary_updated_at, a.inserted_at, a.updated_at,
                  da.rank, da.category
           FROM day_articles da
           JOIN articles a ON a.id = da.article_id
           WHERE da.day_id = ?1
           ORDER BY da.rank ASC, da.id ASC"#,
    )?;
    let articles = stmt
        .query_map(params![day_id], |row| {
            let article = article_from_row(row)?;
            Ok(RankedArticle {
                rank: row.get(20)?,
                category: row.get(21)?,
                article: article.view(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(articles)
}

/// Look up an Article by id or URL.
pub fn get_article(conn: &Connection, key: &ArticleRef) -> Result<Option<Article>> {
    let article = match key {
        ArticleRef::Id(id) => conn
            .query_row(
                r#"SELECT id, url, title, description, content, source_name, author,
                          url_to_image, published_at, language, country, fetched,
                          fetched_at, fetch_source, summary_short, summary_long,
                          summary_model, summary_updated_at, inserted_at, updated_at
                   FROM articles WHERE id = ?1"#,
                params![id],
                article_from_row,
            )
            .optional()?,
        ArticleRef::Url(url) => conn
            .query_row(
                r#"SELECT id, url, title, description, content, source_name, author,
                          url_to_image, published_at, language, country, fetched,
                          fetched_at, fetch_source, summary_short, summary_long,
                          summary_model, summary_updated_at, inserted_at, updated_at
                   FROM articles WHERE url = ?1"#,
                params![url],
                article_from_row,
            )
            .optional()?,
    };
    Ok(article)
}

/// Attach generated summary fields to an Article. Absent fields keep their
/// stored value; `summary_updated_at` is stamped on every call since invoking
/// the writer is itself a summarization event.
pub fn save_article_summary(
    conn: &Connection,
    key: &ArticleRef,
    patch: &SummaryPatch,
) -> Result<Article> {
    if let ArticleRef::Url(url) = key {
        if url.trim().is_empty() {
            return Err(AppError::Validation(
                "an article id or url is required to save a summary".into(),
            ));
        }
    }

    let article = get_article(conn, key)?
        .ok_or_else(|| AppError::NotFound(format!("{key} has no stored article")))?;

    conn.execute(
        r#"UPDATE articles SET
               summary_short = COALESCE(?1, summary_short),
               summary_long = COALESCE(?2, summary_long),
               summary_model = COALESCE(?3, summary_model),
               summary_updated_at = datetime('now'),
               updated_at = datetime('now')
           WHERE id = ?4"#,
        params![patch.short, patch.long, patch.model, article.id],
    )?;

    get_article(conn, &ArticleRef::Id(article.id))?
        .ok_or_else(|| AppError::Store(format!("article #{} missing after update", article.id)))
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC 3339 first (e.g. "2025-01-01T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g. "2025-01-01 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        content: row.get(4)?,
        source_name: row.get(5)?,
        author: row.get(6)?,
        url_to_image: row.get(7)?,
        published_at: row.get(8)?,
        language: row.get(9)?,
        country: row.get(10)?,
        fetched: row.get::<_, i64>(11)? != 0,
        fetched_at: row
            .get::<_, Option<String>>(12)?
            .and_then(|s| parse_datetime(&s)),
        fetch_source: row.get(13)?,
        summary_short: row.get(14)?,
        summary_long: row.get(15)?,
        summary_model: row.get(16)?,
        summary_updated_at: row
            .get::<_, Option<String>>(17)?
            .and_then(|s| parse_datetime(&s)),
        inserted_at: row
            .get::<_, String>(18)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(19)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

fn day_from_row(row: &Row) -> rusqlite::Result<Day> {
    let date_str: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Day {
        id: row.get(0)?,
        date,
        created_at: row
            .get::<_, String>(2)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(3)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::SCHEMA;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(SCHEMA).expect("schema");
        conn
    }

    fn entry(url: &str) -> HeadlineEntry {
        HeadlineEntry {
            url: url.to_string(),
            ..HeadlineEntry::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn day_article_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM day_articles", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn upsert_requires_url() {
        let conn = test_conn();
        let err = upsert_article(&conn, &ArticleUpsert::default()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn upsert_is_a_partial_update() {
        let conn = test_conn();
        upsert_article(
            &conn,
            &ArticleUpsert {
                url: "https://example.com/a".into(),
                title: Some("First title".into()),
                description: Some("A description".into()),
                ..ArticleUpsert::default()
            },
        )
        .unwrap();

        let updated = upsert_article(
            &conn,
            &ArticleUpsert {
                url: "https://example.com/a".into(),
                title: Some("Second title".into()),
                ..ArticleUpsert::default()
            },
        )
        .unwrap();

        assert_eq!(updated.title.as_deref(), Some("Second title"));
        assert_eq!(updated.description.as_deref(), Some("A description"));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM articles", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn upsert_with_fetch_source_marks_fetched() {
        let conn = test_conn();
        let article = upsert_article(
            &conn,
            &ArticleUpsert {
                url: "https://example.com/a".into(),
                content: Some("Full text".into()),
                fetch_source: Some("web".into()),
                ..ArticleUpsert::default()
            },
        )
        .unwrap();
        assert!(article.fetched);
        assert!(article.fetched_at.is_some());
    }

    #[test]
    fn ensure_day_is_idempotent() {
        let conn = test_conn();
        let first = ensure_day(&conn, date("2025-01-01")).unwrap();
        let second = ensure_day(&conn, date("2025-01-01")).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.date, date("2025-01-01"));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let conn = test_conn();
        let d = date("2025-01-01");
        let batch = vec![
            HeadlineEntry {
                rank: Some(1),
                title: Some("One".into()),
                ..entry("https://example.com/1")
            },
            HeadlineEntry {
                rank: Some(2),
                title: Some("Two".into()),
                ..entry("https://example.com/2")
            },
        ];

        set_day_articles(&conn, d, &batch).unwrap();
        let first = get_day_articles(&conn, d).unwrap();
        set_day_articles(&conn, d, &batch).unwrap();
        let second = get_day_articles(&conn, d).unwrap();

        assert_eq!(day_article_count(&conn), 2);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.rank, b.rank);
            assert_eq!(a.category, b.category);
            assert_eq!(a.article.id, b.article.id);
            assert_eq!(a.article.title, b.article.title);
        }
    }

    #[test]
    fn reconcile_replaces_the_association_set() {
        let conn = test_conn();
        let d = date("2025-01-01");
        set_day_articles(
            &conn,
            d,
            &[entry("https://example.com/1"), entry("https://example.com/2")],
        )
        .unwrap();
        set_day_articles(
            &conn,
            d,
            &[entry("https://example.com/2"), entry("https://example.com/3")],
        )
        .unwrap();

        let urls: Vec<String> = get_day_articles(&conn, d)
            .unwrap()
            .into_iter()
            .map(|ra| ra.article.url)
            .collect();
        assert_eq!(urls, vec!["https://example.com/2", "https://example.com/3"]);

        // The dropped association does not delete the article itself.
        let orphan = get_article(&conn, &ArticleRef::Url("https://example.com/1".into())).unwrap();
        assert!(orphan.is_some());
    }

    #[test]
    fn duplicate_urls_keep_the_last_metadata() {
        let conn = test_conn();
        let d = date("2025-01-01");
        set_day_articles(
            &conn,
            d,
            &[
                HeadlineEntry {
                    title: Some("Early".into()),
                    rank: Some(1),
                    ..entry("https://example.com/dup")
                },
                HeadlineEntry {
                    title: Some("Late".into()),
                    rank: Some(2),
                    ..entry("https://example.com/dup")
                },
            ],
        )
        .unwrap();

        let stored = get_day_articles(&conn, d).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rank, 2);
        assert_eq!(stored[0].article.title.as_deref(), Some("Late"));
        assert_eq!(day_article_count(&conn), 1);
    }

    #[test]
    fn entries_without_url_are_skipped() {
        let conn = test_conn();
        let d = date("2025-01-01");
        let stored = set_day_articles(
            &conn,
            d,
            &[
                HeadlineEntry {
                    title: Some("No url".into()),
                    ..HeadlineEntry::default()
                },
                entry("https://example.com/1"),
            ],
        )
        .unwrap();
        assert_eq!(stored, 1);
        assert_eq!(get_day_articles(&conn, d).unwrap().len(), 1);
    }

    #[test]
    fn read_orders_by_rank_ascending() {
        let conn = test_conn();
        let d = date("2025-01-01");
        set_day_articles(
            &conn,
            d,
            &[
                HeadlineEntry {
                    rank: Some(3),
                    ..entry("https://example.com/c")
                },
                HeadlineEntry {
                    rank: Some(1),
                    ..entry("https://example.com/a")
                },
                HeadlineEntry {
                    rank: Some(2),
                    ..entry("https://example.com/b")
                },
            ],
        )
        .unwrap();

        let ranks: Vec<i64> = get_day_articles(&conn, d)
            .unwrap()
            .into_iter()
            .map(|ra| ra.rank)
            .collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn read_unknown_date_is_empty() {
        let conn = test_conn();
        assert!(get_day_articles(&conn, date("1999-12-31")).unwrap().is_empty());
    }

    #[test]
    fn rank_and_category_defaults() {
        let conn = test_conn();
        let d = date("2025-01-01");
        set_day_articles(&conn, d, &[entry("https://example.com/plain")]).unwrap();
        let stored = get_day_articles(&conn, d).unwrap();
        assert_eq!(stored[0].rank, 0);
        assert_eq!(stored[0].category, "general");
    }

    #[test]
    fn classifier_fills_missing_category() {
        let conn = test_conn();
        let d = date("2025-01-01");
        set_day_articles(
            &conn,
            d,
            &[HeadlineEntry {
                title: Some("Fed raises rates".into()),
                rank: Some(1),
                ..entry("https://example.com/fed")
            }],
        )
        .unwrap();
        let stored = get_day_articles(&conn, d).unwrap();
        assert_eq!(stored[0].category, "economy");
    }

    #[test]
    fn explicit_category_wins_over_classifier() {
        let conn = test_conn();
        let d = date("2025-01-01");
        set_day_articles(
            &conn,
            d,
            &[HeadlineEntry {
                title: Some("Fed raises rates".into()),
                category: Some("business".into()),
                ..entry("https://example.com/fed")
            }],
        )
        .unwrap();
        let stored = get_day_articles(&conn, d).unwrap();
        assert_eq!(stored[0].category, "business");
    }

    #[test]
    fn reconcile_preserves_notes_and_summaries() {
        let conn = test_conn();
        let d = date("2025-01-01");
        let batch = vec![HeadlineEntry {
            rank: Some(1),
            title: Some("Kept".into()),
            ..entry("https://example.com/keep")
        }];
        set_day_articles(&conn, d, &batch).unwrap();

        conn.execute("UPDATE day_articles SET notes = 'editor pick'", [])
            .unwrap();
        save_article_summary(
            &conn,
            &ArticleRef::Url("https://example.com/keep".into()),
            &SummaryPatch {
                short: Some("A short summary.".into()),
                ..SummaryPatch::default()
            },
        )
        .unwrap();

        set_day_articles(&conn, d, &batch).unwrap();

        let notes: Option<String> = conn
            .query_row("SELECT notes FROM day_articles", [], |r| r.get(0))
            .unwrap();
        assert_eq!(notes.as_deref(), Some("editor pick"));

        let article = get_article(&conn, &ArticleRef::Url("https://example.com/keep".into()))
            .unwrap()
            .unwrap();
        assert_eq!(article.summary_short.as_deref(), Some("A short summary."));
    }

    #[test]
    fn summary_writer_requires_an_existing_article() {
        let conn = test_conn();
        let err = save_article_summary(
            &conn,
            &ArticleRef::Url("https://example.com/missing".into()),
            &SummaryPatch::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = save_article_summary(
            &conn,
            &ArticleRef::Url("  ".into()),
            &SummaryPatch::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn summary_writer_stamps_even_an_empty_patch() {
        let conn = test_conn();
        upsert_article(
            &conn,
            &ArticleUpsert {
                url: "https://example.com/a".into(),
                title: Some("Title".into()),
                ..ArticleUpsert::default()
            },
        )
        .unwrap();

        let article = save_article_summary(
            &conn,
            &ArticleRef::Url("https://example.com/a".into()),
            &SummaryPatch::default(),
        )
        .unwrap();
        assert!(article.summary_updated_at.is_some());
        assert!(article.summary_short.is_none());
    }

    #[test]
    fn summary_writer_partial_update_by_id() {
        let conn = test_conn();
        let created = upsert_article(
            &conn,
            &ArticleUpsert {
                url: "https://example.com/a".into(),
                title: Some("Title".into()),
                ..ArticleUpsert::default()
            },
        )
        .unwrap();

        save_article_summary(
            &conn,
            &ArticleRef::Id(created.id),
            &SummaryPatch {
                short: Some("Short.".into()),
                long: Some("Much longer.".into()),
                model: Some("test-model".into()),
            },
        )
        .unwrap();

        let article = save_article_summary(
            &conn,
            &ArticleRef::Id(created.id),
            &SummaryPatch {
                short: Some("Replaced.".into()),
                ..SummaryPatch::default()
            },
        )
        .unwrap();

        assert_eq!(article.summary_short.as_deref(), Some("Replaced."));
        assert_eq!(article.summary_long.as_deref(), Some("Much longer."));
        assert_eq!(article.summary_model.as_deref(), Some("test-model"));
        assert_eq!(article.title.as_deref(), Some("Title"));
    }
}
