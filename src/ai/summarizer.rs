use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_MODEL: &str = "claude-3-5-haiku-20241022";

/// Model identifier recorded when the sentence-truncation fallback produced
/// the summary instead of the remote model.
pub const NAIVE_MODEL: &str = "naive";

const SHORT_SYSTEM_PROMPT: &str = r#"You summarize news for elderly readers.
Write 2-3 short, clear, friendly sentences. Use simple everyday language and
avoid jargon. Do not invent facts."#;

const LONG_SYSTEM_PROMPT: &str = r#"You explain news articles to elderly readers.
Write a patient, plain-language explanation in 2-3 short paragraphs. Explain
any technical terms in everyday words. Do not invent facts."#;

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    content_type: String,
    text: Option<String>,
}

/// Short and long renditions of one article, from the same model.
#[derive(Debug, Clone)]
pub struct GeneratedSummary {
    pub short: String,
    pub long: String,
}

pub struct Summarizer {
    client: Client,
    api_key: String,
}

impl Summarizer {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, api_key }
    }

    /// Generate both summary renditions for an article.
    pub async fn summarize(&self, title: &str, text: &str) -> Result<GeneratedSummary> {
        // Truncate content if too long
        let text = if text.len() > 10000 {
            let mut end = 10000;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            &text[..end]
        } else {
            text
        };

        let user_message = format!(
            "Please summarize the following article:\n\nTitle: {}\n\nContent:\n{}",
            title, text
        );

        let short = self
            .request(SHORT_SYSTEM_PROMPT, user_message.clone())
            .await?;
        let long = self.request(LONG_SYSTEM_PROMPT, user_message).await?;

        Ok(GeneratedSummary { short, long })
    }

    async fn request(&self, system_prompt: &str, user_message: String) -> Result<String> {
        let request = MessageRequest {
            model: CLAUDE_MODEL.to_string(),
            max_tokens: 1024,
            messages: vec![Message {
                role: "user".to_string(),
                content: user_message,
            }],
            system: Some(system_prompt.to_string()),
        };

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::ClaudeApi(format!("API error: {}", error_text)));
        }

        let message_response: MessageResponse = response.json().await?;

        let summary = message_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(summary)
    }

    pub fn model_version(&self) -> &'static str {
        CLAUDE_MODEL
    }
}

/// Fallback summarizer: the leading sentences of `text`, up to `max_chars`.
/// Used when no API key is configured or the remote call fails.
pub fn naive_summarize(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.len() <= max_chars {
        return text.to_string();
    }

    let mut cut = 0;
    if let Ok(boundary) = Regex::new(r"[.!?]\s") {
        for m in boundary.find_iter(text) {
            if m.start() + 1 > max_chars {
                break;
            }
            // keep the terminator, drop the whitespace
            cut = m.start() + 1;
        }
    }

    if cut == 0 {
        // No sentence boundary fits; cut at the last whole word.
        let mut limit = max_chars.min(text.len());
        while !text.is_char_boundary(limit) {
            limit -= 1;
        }
        let head = &text[..limit];
        return match head.rsplit_once(' ') {
            Some((words, _)) => format!("{}...", words.trim_end()),
            None => format!("{}...", head),
        };
    }

    text[..cut].trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_returned_whole() {
        assert_eq!(naive_summarize("A brief note.", 400), "A brief note.");
    }

    #[test]
    fn truncates_at_a_sentence_boundary() {
        let text = "First sentence. Second sentence. Third sentence goes on for a while.";
        assert_eq!(naive_summarize(text, 40), "First sentence. Second sentence.");
    }

    #[test]
    fn falls_back_to_word_boundary() {
        let text = "one two three four five six seven eight nine ten";
        let out = naive_summarize(text, 20);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 24);
    }
}
