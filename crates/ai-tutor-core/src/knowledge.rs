//! Static knowledge base: an ordered list of `{keyword, response, chart?}` records loaded once
//! at startup and shared read-only by every request.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::normalizer::normalize;

/// One knowledge-base record. `chart` is an opaque chart description handed to the widget as-is.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KnowledgeTopic {
    pub keyword: String,
    pub response: String,
    #[serde(default)]
    pub chart: Option<serde_json::Value>,
}

/// How a query is compared with a topic keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Query equals the keyword.
    Exact,
    /// Query contains the keyword.
    Substring,
}

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("knowledge file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("knowledge file {path} is malformed: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("knowledge entry #{index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    topics: Vec<KnowledgeTopic>,
}

impl KnowledgeBase {
    /// Build from records, normalizing keywords so they compare against normalized queries.
    pub fn new(topics: Vec<KnowledgeTopic>) -> Result<Self, KnowledgeError> {
        let mut out = Vec::with_capacity(topics.len());
        for (index, mut topic) in topics.into_iter().enumerate() {
            topic.keyword = normalize(&topic.keyword);
            if topic.keyword.is_empty() {
                return Err(KnowledgeError::EmptyField { index, field: "keyword" });
            }
            if topic.response.trim().is_empty() {
                return Err(KnowledgeError::EmptyField { index, field: "response" });
            }
            out.push(topic);
        }
        Ok(Self { topics: out })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, KnowledgeError> {
        let topics: Vec<KnowledgeTopic> =
            serde_json::from_str(json).map_err(|source| KnowledgeError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        Self::new(topics)
    }

    /// Load the definition file. A missing file gives an empty base; a malformed one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KnowledgeError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    target: "tutor::knowledge",
                    path = %path_str,
                    "Knowledge file not found; tutor mode will fall through to Wikipedia"
                );
                return Ok(Self::empty());
            }
            Err(source) => return Err(KnowledgeError::Io { path: path_str, source }),
        };
        let topics: Vec<KnowledgeTopic> =
            serde_json::from_str(&raw).map_err(|source| KnowledgeError::Parse {
                path: path_str.clone(),
                source,
            })?;
        let kb = Self::new(topics)?;
        tracing::info!(
            target: "tutor::knowledge",
            path = %path_str,
            topics = kb.len(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    /// First topic in declared order that matches `query` under `policy`.
    pub fn lookup(&self, query: &str, policy: MatchPolicy) -> Option<&KnowledgeTopic> {
        if query.is_empty() {
            return None;
        }
        self.topics.iter().find(|t| match policy {
            MatchPolicy::Exact => query == t.keyword,
            MatchPolicy::Substring => query.contains(t.keyword.as_str()),
        })
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
