//! Conversation state: the last successfully resolved topic, kept per session.
//!
//! Callers without a session id share the `default` session, which reproduces the single
//! process-wide "last topic" for anonymous widgets.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Session for an optional caller-supplied id; blank or absent ids map to the default session.
    pub fn from_request(id: Option<&str>) -> Self {
        match id.map(str::trim) {
            Some(id) if !id.is_empty() => Self(id.to_string()),
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self(DEFAULT_SESSION.to_string())
    }
}

/// Last-topic cells keyed by session. Bounded: inserting a new session into a full map
/// evicts an arbitrary existing one.
#[derive(Debug, Clone)]
pub struct ConversationState {
    topics: Arc<DashMap<SessionId, String>>,
    max_sessions: usize,
}

impl ConversationState {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn last_topic(&self, session: &SessionId) -> Option<String> {
        self.topics.get(session).map(|t| t.value().clone())
    }

    /// Record a successfully resolved topic. Blank topics are ignored.
    ///
    /// A new session inserted into a full table evicts other sessions until the table is back
    /// within `max_sessions`; concurrent inserts may evict more than one.
    pub fn remember(&self, session: &SessionId, topic: &str) {
        let topic = topic.trim();
        if topic.is_empty() {
            return;
        }
        match self.topics.entry(session.clone()) {
            Entry::Occupied(mut slot) => {
                slot.insert(topic.to_string());
                return;
            }
            Entry::Vacant(slot) => {
                slot.insert(topic.to_string());
            }
        }
        while self.topics.len() > self.max_sessions {
            let victim = self
                .topics
                .iter()
                .find(|e| e.key() != session)
                .map(|e| e.key().clone());
            let Some(victim) = victim else { break };
            self.topics.remove(&victim);
            tracing::debug!(
                target: "tutor::session",
                evicted = %victim.as_str(),
                "session table full"
            );
        }
    }

    pub fn session_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_SESSIONS)
    }
}
