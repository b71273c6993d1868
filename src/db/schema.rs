pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- articles table: one row per unique URL
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    description TEXT,
    content TEXT,
    source_name TEXT,
    author TEXT,
    url_to_image TEXT,
    published_at TEXT,
    language TEXT,
    country TEXT,
    fetched INTEGER NOT NULL DEFAULT 0,
    fetched_at TEXT,
    fetch_source TEXT,
    summary_short TEXT,
    summary_long TEXT,
    summary_model TEXT,
    summary_updated_at TEXT,
    inserted_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_articles_url ON articles(url);
CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at);

-- days table: one row per calendar date
CREATE TABLE IF NOT EXISTS days (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- day_articles table: ranked, categorized membership of an article in a day.
-- Deleting a day removes its associations; articles are shared and stay.
CREATE TABLE IF NOT EXISTS day_articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    day_id INTEGER NOT NULL REFERENCES days(id) ON DELETE CASCADE,
    article_id INTEGER NOT NULL REFERENCES articles(id),
    rank INTEGER NOT NULL DEFAULT 0,
    category TEXT NOT NULL DEFAULT 'general',
    notes TEXT,
    inserted_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(day_id, article_id)
);

CREATE INDEX IF NOT EXISTS idx_day_articles_day_id ON day_articles(day_id);
CREATE INDEX IF NOT EXISTS idx_day_articles_article_id ON day_articles(article_id);
"#;
