use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub news_api_key: Option<String>,
    pub claude_api_key: Option<String>,

    #[serde(default = "default_country")]
    pub country: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("today-news");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("today.db").to_string_lossy().to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_page_size() -> u32 {
    20
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            news_api_key: None,
            claude_api_key: None,
            country: default_country(),
            page_size: default_page_size(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        // Environment variables win over the file for the keys, so cron jobs
        // can run without a key on disk.
        if let Ok(key) = std::env::var("NEWS_API_KEY") {
            config.news_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("CLAUDE_API_KEY") {
            config.claude_api_key = Some(key);
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("today-news")
            .join("config.toml")
    }
}
