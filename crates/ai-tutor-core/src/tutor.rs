//! Ask pipeline: normalize → route (knowledge base, session context) → Wikipedia → media →
//! response. Every failure becomes a conversational answer; nothing here returns an error.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::TutorConfig;
use crate::error::TutorError;
use crate::intent::{route, RouteDecision, RouteError};
use crate::knowledge::{KnowledgeBase, MatchPolicy};
use crate::media::{MediaError, MediaGenerator, MediaRequest, NoMedia, ScriptMediaGenerator};
use crate::normalizer::normalize;
use crate::response::TutorResponse;
use crate::session::{ConversationState, SessionId};
use crate::wikipedia::{SummarySource, WikiPage, WikipediaClient};

pub const TUTOR_MODE: &str = "tutor";

/// Which illustration the caller wants alongside a Wikipedia answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    None,
}

/// Body of `POST /api/tutor/ask`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[serde(default)]
    pub query: Option<String>,
    /// `"tutor"` selects knowledge-base-first routing; anything else is open lookup.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub media: Option<MediaKind>,
    /// Also synthesize speech for the answer.
    #[serde(default)]
    pub speak: bool,
}

impl AskRequest {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn is_tutor_mode(&self) -> bool {
        self.mode.as_deref() == Some(TUTOR_MODE)
    }
}

#[derive(Debug, Clone)]
pub struct TutorOptions {
    pub tutor_policy: MatchPolicy,
    pub open_mode_lookup: bool,
    pub chunk_chars: usize,
}

impl TutorOptions {
    pub fn from_config(config: &TutorConfig) -> Self {
        Self {
            tutor_policy: config.knowledge.tutor_policy,
            open_mode_lookup: config.knowledge.open_mode_lookup,
            chunk_chars: config.wikipedia.chunk_chars,
        }
    }
}

impl Default for TutorOptions {
    fn default() -> Self {
        Self::from_config(&TutorConfig::default())
    }
}

pub struct Tutor {
    knowledge: Arc<KnowledgeBase>,
    wiki: Arc<dyn SummarySource>,
    media: Arc<dyn MediaGenerator>,
    sessions: ConversationState,
    options: TutorOptions,
}

impl Tutor {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        wiki: Arc<dyn SummarySource>,
        media: Arc<dyn MediaGenerator>,
        sessions: ConversationState,
        options: TutorOptions,
    ) -> Self {
        Self {
            knowledge,
            wiki,
            media,
            sessions,
            options,
        }
    }

    /// Production wiring: Wikipedia over HTTPS and script-backed media when configured.
    pub fn from_config(
        config: &TutorConfig,
        knowledge: KnowledgeBase,
    ) -> Result<Self, reqwest::Error> {
        let wiki = WikipediaClient::new(&config.wikipedia)?;
        let scripts = ScriptMediaGenerator::from_settings(&config.media);
        let media: Arc<dyn MediaGenerator> = if scripts.is_enabled() {
            Arc::new(scripts)
        } else {
            info!(target: "tutor::media", "No media scripts configured; answers will be text only");
            Arc::new(NoMedia)
        };
        Ok(Self::new(
            Arc::new(knowledge),
            Arc::new(wiki),
            media,
            ConversationState::new(config.max_sessions),
            TutorOptions::from_config(config),
        ))
    }

    pub fn sessions(&self) -> &ConversationState {
        &self.sessions
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Answer one question. Always yields a response; failures are carried in `status`.
    pub async fn ask(&self, request: AskRequest) -> TutorResponse {
        let session = SessionId::from_request(request.session_id.as_deref());
        let normalized = normalize(request.query.as_deref().unwrap_or(""));
        if normalized.is_empty() {
            return TutorResponse::from_error(&TutorError::MissingInput);
        }

        let last_topic = self.sessions.last_topic(&session);
        let decision = route(&normalized, last_topic.as_deref());
        info!(
            target: "tutor::router",
            session = %session.as_str(),
            tutor_mode = request.is_tutor_mode(),
            query = %normalized,
            decision = ?decision,
            "Routing question"
        );

        if request.is_tutor_mode() && consults_tutor_knowledge(&decision) {
            let policy = self.options.tutor_policy;
            if let Some(response) = self
                .answer_from_knowledge(&session, &normalized, policy, &request)
                .await
            {
                return response;
            }
        }

        match decision {
            RouteDecision::CannedReply(text) => TutorResponse::answer(text),
            RouteDecision::Error(RouteError::MissingTopic) => {
                TutorResponse::from_error(&TutorError::MissingTopic)
            }
            RouteDecision::Error(RouteError::NoContext) => {
                TutorResponse::from_error(&TutorError::NoContext)
            }
            RouteDecision::ExplicitWiki(topic) | RouteDecision::FollowUp(topic) => {
                self.answer_from_wikipedia(&session, &topic, last_topic, &request).await
            }
            RouteDecision::StructuredLookup(topic) | RouteDecision::KeywordLookup(topic) => {
                if self.options.open_mode_lookup {
                    if let Some(response) = self
                        .answer_from_knowledge(&session, &topic, MatchPolicy::Exact, &request)
                        .await
                    {
                        return response;
                    }
                }
                self.answer_from_wikipedia(&session, &topic, last_topic, &request).await
            }
        }
    }

    async fn answer_from_knowledge(
        &self,
        session: &SessionId,
        query: &str,
        policy: MatchPolicy,
        request: &AskRequest,
    ) -> Option<TutorResponse> {
        let topic = self.knowledge.lookup(query, policy)?;
        info!(
            target: "tutor::knowledge",
            keyword = %topic.keyword,
            policy = ?policy,
            "Knowledge base hit"
        );
        self.sessions.remember(session, &topic.keyword);
        let response = TutorResponse::from_topic(topic);
        Some(self.attach_speech(response, request).await)
    }

    async fn answer_from_wikipedia(
        &self,
        session: &SessionId,
        topic: &str,
        last_topic: Option<String>,
        request: &AskRequest,
    ) -> TutorResponse {
        match self.wiki.fetch_summary(topic).await {
            Ok(page) => {
                self.sessions.remember(session, topic);
                let response = TutorResponse::answer(page.answer_text(self.options.chunk_chars));
                let response = self.attach_illustration(response, &page, request).await;
                self.attach_speech(response, request).await
            }
            Err(failure) => {
                TutorResponse::from_error(&TutorError::from_lookup(failure, topic, last_topic))
            }
        }
    }

    async fn attach_illustration(
        &self,
        response: TutorResponse,
        page: &WikiPage,
        request: &AskRequest,
    ) -> TutorResponse {
        let kind = request.media.unwrap_or_default();
        if kind == MediaKind::None {
            return response;
        }
        let media_request = MediaRequest::Illustration {
            prompt: page.illustration_prompt(),
            video: kind == MediaKind::Video,
        };
        self.generate_into(response, media_request).await
    }

    async fn attach_speech(&self, response: TutorResponse, request: &AskRequest) -> TutorResponse {
        if !request.speak || response.answer.trim().is_empty() {
            return response;
        }
        let media_request = MediaRequest::Speech {
            text: response.answer.clone(),
        };
        self.generate_into(response, media_request).await
    }

    /// Run one media request; on failure log it and leave the text answer untouched.
    async fn generate_into(&self, response: TutorResponse, request: MediaRequest) -> TutorResponse {
        match self.media.generate(request).await {
            Ok(payload) => response.with_media(payload),
            Err(MediaError::Disabled) => {
                debug!(target: "tutor::media", "media generation disabled");
                response
            }
            Err(e) => {
                let err = TutorError::from(e);
                warn!(
                    target: "tutor::media",
                    error = %err,
                    "Generation error; returning text only"
                );
                response
            }
        }
    }
}

/// Tutor mode checks the knowledge base first, except for canned replies and explicit `!wiki`.
fn consults_tutor_knowledge(decision: &RouteDecision) -> bool {
    !matches!(
        decision,
        RouteDecision::CannedReply(_)
            | RouteDecision::ExplicitWiki(_)
            | RouteDecision::Error(RouteError::MissingTopic)
    )
}
