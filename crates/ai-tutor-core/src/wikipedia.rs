//! Wikipedia client: resolves a topic to an article and fetches its plain-text intro.
//!
//! Two resolution strategies:
//! - `SearchExtract` (default): opensearch for the best title, then one extract call.
//! - `DirectTitle`: extract calls on the raw topic and its case/stop-word variants, first hit wins.
//!
//! Every transport, status or parse problem is reported as [`LookupFailure::Transient`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::WikipediaSettings;
use crate::error::LookupFailure;
use crate::intent::strip_stop_words;

pub const CHUNK_SEPARATOR: &str = "\n---\n";

/// Title and intro extract of one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    pub title: String,
    pub extract: String,
}

impl WikiPage {
    /// Answer text shown in the widget; the extract is split into `chunk_chars` segments.
    pub fn answer_text(&self, chunk_chars: usize) -> String {
        format!(
            "Here’s the scoop on '{}' from Wikipedia:\n{}",
            self.title,
            chunk_extract(&self.extract, chunk_chars).join(CHUNK_SEPARATOR)
        )
    }

    pub fn illustration_prompt(&self) -> String {
        format!("Sci-fi illustration of {}", self.title)
    }
}

/// Something that can turn a topic into an article summary.
#[async_trait]
pub trait SummarySource: Send + Sync {
    async fn fetch_summary(&self, topic: &str) -> Result<WikiPage, LookupFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStrategy {
    SearchExtract,
    DirectTitle,
}

/// Split `text` into segments of at most `max_chars` characters. Joining the segments gives
/// back `text` unchanged.
pub fn chunk_extract(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    title: Option<String>,
    extract: Option<String>,
    missing: Option<serde_json::Value>,
    invalid: Option<serde_json::Value>,
}

/// What an extract call found for one title.
#[derive(Debug)]
enum ExtractOutcome {
    Found(WikiPage),
    /// The page exists (or was echoed back) but carries no usable extract.
    Empty,
}

pub struct WikipediaClient {
    client: reqwest::Client,
    api_url: String,
    strategy: ResolveStrategy,
    sentences: u32,
}

impl WikipediaClient {
    pub fn new(settings: &WikipediaSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            strategy: settings.strategy,
            sentences: settings.sentence_limit(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, LookupFailure> {
        let res = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .await
            .map_err(|e| LookupFailure::Transient(format!("request: {}", e)))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| LookupFailure::Transient(format!("body: {}", e)))?;

        if !status.is_success() {
            return Err(LookupFailure::Transient(format!("HTTP {}", status.as_u16())));
        }

        serde_json::from_str(&text).map_err(|e| LookupFailure::Transient(format!("parse: {}", e)))
    }

    /// Best-matching canonical title for `topic`, if any.
    async fn search_title(&self, topic: &str) -> Result<Option<String>, LookupFailure> {
        let data: Vec<serde_json::Value> = self
            .get_json(&[
                ("action", "opensearch"),
                ("format", "json"),
                ("search", topic),
                ("limit", "1"),
            ])
            .await?;

        Ok(data
            .get(1)
            .and_then(|titles| titles.as_array())
            .and_then(|titles| titles.first())
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    async fn extract(&self, title: &str) -> Result<ExtractOutcome, LookupFailure> {
        let sentences = self.sentences.to_string();
        let data: ExtractResponse = self
            .get_json(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "extracts"),
                ("titles", title),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exsentences", sentences.as_str()),
                ("redirects", "1"),
            ])
            .await?;

        let page = data
            .query
            .and_then(|q| q.pages.into_values().next());

        let Some(page) = page else {
            return Ok(ExtractOutcome::Empty);
        };
        if page.missing.is_some() || page.invalid.is_some() {
            return Ok(ExtractOutcome::Empty);
        }
        match page.extract {
            Some(extract) if !extract.trim().is_empty() => Ok(ExtractOutcome::Found(WikiPage {
                title: page.title.unwrap_or_else(|| title.to_string()),
                extract,
            })),
            _ => Ok(ExtractOutcome::Empty),
        }
    }

    async fn search_then_extract(&self, topic: &str) -> Result<WikiPage, LookupFailure> {
        let Some(title) = self.search_title(topic).await? else {
            return Err(LookupFailure::NotFound(topic.to_string()));
        };
        tracing::debug!(target: "tutor::wiki", topic = %topic, title = %title, "resolved title");
        match self.extract(&title).await? {
            ExtractOutcome::Found(page) => Ok(page),
            ExtractOutcome::Empty => Err(LookupFailure::NoContent(title)),
        }
    }

    async fn direct_title(&self, topic: &str) -> Result<WikiPage, LookupFailure> {
        for candidate in title_candidates(topic) {
            if let ExtractOutcome::Found(page) = self.extract(&candidate).await? {
                return Ok(page);
            }
            tracing::debug!(
                target: "tutor::wiki",
                candidate = %candidate,
                "no extract for title variant"
            );
        }
        Err(LookupFailure::NotFound(topic.to_string()))
    }
}

#[async_trait]
impl SummarySource for WikipediaClient {
    async fn fetch_summary(&self, topic: &str) -> Result<WikiPage, LookupFailure> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(LookupFailure::NotFound(String::new()));
        }
        let result = match self.strategy {
            ResolveStrategy::SearchExtract => self.search_then_extract(topic).await,
            ResolveStrategy::DirectTitle => self.direct_title(topic).await,
        };
        match &result {
            Ok(page) => tracing::info!(
                target: "tutor::wiki",
                topic = %topic,
                title = %page.title,
                "Wikipedia summary fetched"
            ),
            Err(LookupFailure::Transient(reason)) => tracing::warn!(
                target: "tutor::wiki",
                topic = %topic,
                reason = %reason,
                "Wikipedia API error"
            ),
            Err(e) => tracing::info!(
                target: "tutor::wiki",
                topic = %topic,
                outcome = %e,
                "Wikipedia miss"
            ),
        }
        result
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Raw topic, first-letter capitalized, upper-cased and stop-word-stripped; deduplicated.
fn title_candidates(topic: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for c in [
        topic.to_string(),
        capitalize_first(topic),
        topic.to_uppercase(),
        strip_stop_words(topic),
    ] {
        if !c.is_empty() && !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_bounded_and_lossless() {
        let text = "é".repeat(1234);
        let chunks = chunk_extract(&text, 500);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn short_extract_is_one_chunk() {
        assert_eq!(chunk_extract("tiny", 500), vec!["tiny".to_string()]);
    }

    #[test]
    fn answer_text_uses_separator() {
        let page = WikiPage {
            title: "Mars".into(),
            extract: "a".repeat(600),
        };
        let text = page.answer_text(500);
        assert!(text.starts_with("Here’s the scoop on 'Mars' from Wikipedia:\n"));
        assert_eq!(text.matches(CHUNK_SEPARATOR).count(), 1);
        assert_eq!(page.illustration_prompt(), "Sci-fi illustration of Mars");
    }

    #[test]
    fn candidates_are_deduplicated_in_order() {
        assert_eq!(
            title_candidates("the moon"),
            vec!["the moon", "The moon", "THE MOON", "moon"]
        );
        assert_eq!(title_candidates("NASA"), vec!["NASA"]);
    }
}
