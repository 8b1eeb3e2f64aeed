//! Error taxonomy for the ask pipeline and the single classification step that turns each
//! failure into a response status plus the conversational message shown in the widget.

use serde::Serialize;
use thiserror::Error;

use crate::media::MediaError;

/// Failure of a Wikipedia lookup. Transport and parse problems all collapse into `Transient`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    #[error("no article matches '{0}'")]
    NotFound(String),

    #[error("article '{0}' has no extract")]
    NoContent(String),

    #[error("transient lookup failure: {0}")]
    Transient(String),
}

/// Machine-readable outcome carried next to the answer text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Ok,
    NotFound,
    NoContent,
    Transient,
    MissingInput,
    NoContext,
}

/// Everything that can go wrong while answering a question.
#[derive(Error, Debug)]
pub enum TutorError {
    #[error("no article found for '{topic}'")]
    NotFound {
        topic: String,
        last_topic: Option<String>,
    },

    #[error("article '{title}' has no usable extract for '{topic}'")]
    NoContent { title: String, topic: String },

    #[error("lookup for '{topic}' failed: {reason}")]
    Transient { topic: String, reason: String },

    #[error("empty query")]
    MissingInput,

    #[error("'!wiki' given without a topic")]
    MissingTopic,

    #[error("follow-up question without a previous topic")]
    NoContext,

    #[error("media generation failed: {0}")]
    MediaGenerationFailed(#[from] MediaError),
}

pub const PROMPT_FOR_INPUT: &str = "Yo, hit me with a question, my man!";
pub const PROMPT_FOR_WIKI_TOPIC: &str = "Yo, give me something to search for after '!wiki'!";
pub const NEED_CONTEXT: &str = "Yo, I need some context! Ask about someone or something first.";

impl TutorError {
    /// Attach request context to a raw lookup failure.
    pub fn from_lookup(failure: LookupFailure, topic: &str, last_topic: Option<String>) -> Self {
        match failure {
            LookupFailure::NotFound(_) => TutorError::NotFound {
                topic: topic.to_string(),
                last_topic,
            },
            LookupFailure::NoContent(title) => TutorError::NoContent {
                title,
                topic: topic.to_string(),
            },
            LookupFailure::Transient(reason) => TutorError::Transient {
                topic: topic.to_string(),
                reason,
            },
        }
    }

    /// Status and user-facing message for this failure.
    pub fn classify(&self) -> (AnswerStatus, String) {
        match self {
            TutorError::NotFound { topic, last_topic } => (
                AnswerStatus::NotFound,
                format!(
                    "Yo, I can’t find '{}'. Try something like '{}'!",
                    topic,
                    last_topic.as_deref().unwrap_or("another topic")
                ),
            ),
            TutorError::NoContent { title, topic } => (
                AnswerStatus::NoContent,
                format!(
                    "Yo, I found '{}' but got no details on '{}'. Try again!",
                    title, topic
                ),
            ),
            TutorError::Transient { topic, .. } => (
                AnswerStatus::Transient,
                format!("Oops, something went wrong with '{}'!", topic),
            ),
            TutorError::MissingInput => (AnswerStatus::MissingInput, PROMPT_FOR_INPUT.to_string()),
            TutorError::MissingTopic => {
                (AnswerStatus::MissingInput, PROMPT_FOR_WIKI_TOPIC.to_string())
            }
            TutorError::NoContext => (AnswerStatus::NoContext, NEED_CONTEXT.to_string()),
            // Media failures never replace the text answer; the media fields stay unset.
            TutorError::MediaGenerationFailed(_) => (AnswerStatus::Ok, String::new()),
        }
    }
}
