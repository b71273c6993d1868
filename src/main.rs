use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use today_news::ai::summarizer::{self, Summarizer};
use today_news::config::Config;
use today_news::db::Repository;
use today_news::error::{AppError, Result};
use today_news::ingest::fetcher::HeadlineFetcher;
use today_news::models::{ArticleRef, ArticleUpsert, SummaryPatch};
use today_news::services::extractor::PageExtractor;

const USAGE: &str = "\
Usage:
  today-news --ingest [YYYY-MM-DD]   fetch top headlines and store them for the date (default: today)
  today-news --show <YYYY-MM-DD>     print the stored articles for a date as JSON
  today-news --summarize <URL>       summarize a stored article and cache the result
  today-news --extract <URL>...      fetch pages and print their readable text";

const SHORT_SUMMARY_MAX_CHARS: usize = 400;
const LONG_SUMMARY_MAX_CHARS: usize = 1200;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = Config::load()?;

    match args.get(1).map(String::as_str) {
        Some("--ingest") => {
            let date = parse_date_arg(args.get(2))?;
            let repo = Repository::new(&config.db_path).await?;
            ingest(&config, &repo, date).await?;
        }
        Some("--show") => {
            let date_arg = args
                .get(2)
                .ok_or_else(|| AppError::Validation("--show needs a date".into()))?;
            let date = parse_date(date_arg)?;
            let repo = Repository::new(&config.db_path).await?;
            let articles = repo.get_day_articles(date).await?;
            println!("{}", serde_json::to_string_pretty(&articles)?);
        }
        Some("--summarize") => {
            let url = args
                .get(2)
                .ok_or_else(|| AppError::Validation("--summarize needs a url".into()))?;
            let repo = Repository::new(&config.db_path).await?;
            summarize(&config, &repo, url).await?;
        }
        Some("--extract") => {
            let urls: Vec<String> = args[2..].to_vec();
            if urls.is_empty() {
                return Err(AppError::Validation("--extract needs at least one url".into()));
            }
            extract(&config, urls).await?;
        }
        _ => {
            eprintln!("{USAGE}");
        }
    }

    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| AppError::Validation(format!("invalid date {s}: {e}")))
}

fn parse_date_arg(arg: Option<&String>) -> Result<NaiveDate> {
    match arg {
        Some(s) => parse_date(s),
        None => Ok(Local::now().date_naive()),
    }
}

async fn ingest(config: &Config, repo: &Repository, date: NaiveDate) -> Result<()> {
    let api_key = config
        .news_api_key
        .clone()
        .ok_or_else(|| AppError::Config("news_api_key is not configured".into()))?;

    let fetcher = HeadlineFetcher::new(api_key);
    let headlines = fetcher
        .top_headlines(&config.country, config.page_size)
        .await?;
    tracing::info!("fetched {} headlines", headlines.len());

    let stored = repo.set_day_articles(date, headlines).await?;
    println!("Stored {stored} articles for {date}");
    Ok(())
}

async fn summarize(config: &Config, repo: &Repository, url: &str) -> Result<()> {
    let key = ArticleRef::Url(url.to_string());
    let article = repo
        .get_article(key.clone())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("article {url}")))?;

    // Backfill content from the page when the feed only gave us a headline.
    let text = match article.content.clone().or_else(|| article.description.clone()) {
        Some(text) => text,
        None => {
            let extractor = PageExtractor::new(Duration::from_secs(config.fetch_timeout_secs));
            let text = extractor.extract(url).await?;
            repo.upsert_article(ArticleUpsert {
                url: url.to_string(),
                content: Some(text.clone()),
                fetch_source: Some("web".to_string()),
                ..ArticleUpsert::default()
            })
            .await?;
            text
        }
    };

    let title = article.title.as_deref().unwrap_or("");

    let (short, long, model) = match config.claude_api_key.clone() {
        Some(api_key) => {
            let summarizer = Summarizer::new(api_key);
            match summarizer.summarize(title, &text).await {
                Ok(generated) => (
                    generated.short,
                    generated.long,
                    summarizer.model_version().to_string(),
                ),
                Err(e) => {
                    tracing::warn!("remote summarization failed, using fallback: {e}");
                    naive_summaries(&text)
                }
            }
        }
        None => naive_summaries(&text),
    };

    let updated = repo
        .save_article_summary(
            key,
            SummaryPatch {
                short: Some(short),
                long: Some(long),
                model: Some(model),
            },
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&updated.view())?);
    Ok(())
}

fn naive_summaries(text: &str) -> (String, String, String) {
    (
        summarizer::naive_summarize(text, SHORT_SUMMARY_MAX_CHARS),
        summarizer::naive_summarize(text, LONG_SUMMARY_MAX_CHARS),
        summarizer::NAIVE_MODEL.to_string(),
    )
}

#[derive(Debug, Serialize)]
struct ExtractResult {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn extract(config: &Config, urls: Vec<String>) -> Result<()> {
    let extractor = PageExtractor::new(Duration::from_secs(config.fetch_timeout_secs));
    let results: Vec<ExtractResult> = extractor
        .extract_many(urls)
        .await
        .into_iter()
        .map(|(url, result)| match result {
            Ok(text) => {
                let summary = summarizer::naive_summarize(&text, SHORT_SUMMARY_MAX_CHARS);
                ExtractResult {
                    url,
                    text: Some(text),
                    summary: Some(summary),
                    error: None,
                }
            }
            Err(e) => ExtractResult {
                url,
                text: None,
                summary: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
