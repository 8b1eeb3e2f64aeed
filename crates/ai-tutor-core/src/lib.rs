//! AI Tutor — Core library.
//! Query routing, the static knowledge base, the Wikipedia client and media orchestration
//! behind the `/api/tutor/ask` endpoint.

pub mod config;
pub mod error;
pub mod intent;
pub mod knowledge;
pub mod media;
pub mod normalizer;
pub mod response;
pub mod session;
pub mod tutor;
pub mod wikipedia;

pub use config::{KnowledgeSettings, MediaSettings, TutorConfig, WikipediaSettings};
pub use error::{AnswerStatus, LookupFailure, TutorError};
pub use intent::{route, RouteDecision, RouteError};
pub use knowledge::{KnowledgeBase, KnowledgeError, KnowledgeTopic, MatchPolicy};
pub use media::{
    MediaError, MediaGenerator, MediaPayload, MediaRequest, NoMedia, ScriptMediaGenerator,
};
pub use normalizer::normalize;
pub use response::TutorResponse;
pub use session::{ConversationState, SessionId};
pub use tutor::{AskRequest, MediaKind, Tutor, TutorOptions};
pub use wikipedia::{chunk_extract, ResolveStrategy, SummarySource, WikiPage, WikipediaClient};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
