//! Intent matcher: routes a normalized query to a canned reply, an explicit `!wiki` lookup,
//! a follow-up on the last topic, a structured question template, or a keyword lookup.
//!
//! Every table is an ordered list evaluated top to bottom; the first match wins.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Words dropped by the keyword fallback (and by the direct-title stop-word variant).
pub const STOP_WORDS: &[&str] = &[
    "who", "what", "where", "when", "why", "how", "is", "are", "the", "a", "an", "of", "in",
    "on", "at",
];

const WIKI_COMMAND: &str = "!wiki";

/// Outcome of routing one normalized query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    CannedReply(String),
    ExplicitWiki(String),
    /// Follow-up on the caller's last topic; carries that topic.
    FollowUp(String),
    StructuredLookup(String),
    KeywordLookup(String),
    Error(RouteError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    /// `!wiki` with nothing after it.
    MissingTopic,
    /// Follow-up asked before any topic was resolved.
    NoContext,
}

struct CannedPattern {
    pattern: Regex,
    reply: &'static str,
}

struct QuestionTemplate {
    name: &'static str,
    pattern: Regex,
    resolver: fn(&Captures) -> String,
}

fn canned(pattern: &str, reply: &'static str) -> CannedPattern {
    CannedPattern {
        pattern: Regex::new(pattern).expect("valid canned pattern"),
        reply,
    }
}

fn template(
    name: &'static str,
    pattern: &str,
    resolver: fn(&Captures) -> String,
) -> QuestionTemplate {
    QuestionTemplate {
        name,
        pattern: Regex::new(pattern).expect("valid question template"),
        resolver,
    }
}

static CANNED_REPLIES: Lazy<Vec<CannedPattern>> = Lazy::new(|| {
    vec![
        canned(
            r"(?i)^(?:hi|hello|hey|yo|sup)(?: there)?$",
            "Yo, what's good, my man?",
        ),
        canned(
            r"(?i)^who (?:made|created|built) you$",
            "A couple of folks who wanted a tutor that talks like a human put me together. Ask me anything!",
        ),
        canned(
            r"(?i)^what can you do$",
            "Ask me about anything and I'll pull the scoop from Wikipedia. Flip to tutor mode for lessons on algebra, calculus, physics, chemistry, world war and the renaissance, or type '!wiki <topic>' to search directly.",
        ),
        canned(
            r"(?i)^(?:thanks|thank you|thx)(?: (?:man|bro|a lot))?$",
            "Anytime, my man!",
        ),
        canned(
            r"(?i)^(?:how are you|how's it going|what's up)$",
            "All good on my end! Hit me with a question.",
        ),
    ]
});

static FOLLOW_UP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bwhat(?:'s| is)?\s*\b(?:he|she|it|they)\b\s*(?:doing|up to)")
        .expect("valid follow-up pattern")
});

fn first_group(caps: &Captures) -> String {
    caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
}

fn first_group_without_stop_words(caps: &Captures) -> String {
    let group = first_group(caps);
    let stripped = strip_stop_words(&group);
    if stripped.is_empty() {
        group
    } else {
        stripped
    }
}

static QUESTION_TEMPLATES: Lazy<Vec<QuestionTemplate>> = Lazy::new(|| {
    vec![
        // The country article carries the capital in its intro.
        template(
            "capital-of",
            r"(?i)^what(?:'s| is) the capital(?: city)? of (?:the )?(.+)$",
            first_group,
        ),
        template(
            "deal-with",
            r"(?i)^what(?:'s| is) the deal with (?:the )?(.+)$",
            first_group,
        ),
        template(
            "who-is",
            r"(?i)^who(?:'s| is| was| are| were) (.+)$",
            first_group,
        ),
        template(
            "what-is",
            r"(?i)^what(?:'s| is| are| was| were) (?:an? |the )?(.+)$",
            first_group,
        ),
        template(
            "tell-me-about",
            r"(?i)^(?:tell me about|explain) (?:an? |the )?(.+)$",
            first_group,
        ),
        template("who-what", r"(?i)^(?:who|what) (.+)$", first_group_without_stop_words),
    ]
});

/// Remove [`STOP_WORDS`] from a whitespace-separated query.
pub fn strip_stop_words(text: &str) -> String {
    text.split_whitespace()
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Route a normalized query. Pure: depends only on `normalized` and `last_topic`.
pub fn route(normalized: &str, last_topic: Option<&str>) -> RouteDecision {
    if let Some(c) = CANNED_REPLIES.iter().find(|c| c.pattern.is_match(normalized)) {
        return RouteDecision::CannedReply(c.reply.to_string());
    }

    if let Some(rest) = normalized.strip_prefix(WIKI_COMMAND) {
        let topic = rest.trim();
        if topic.is_empty() {
            return RouteDecision::Error(RouteError::MissingTopic);
        }
        return RouteDecision::ExplicitWiki(topic.to_string());
    }

    if FOLLOW_UP.is_match(normalized) {
        return match last_topic {
            Some(t) if !t.trim().is_empty() => RouteDecision::FollowUp(t.to_string()),
            _ => RouteDecision::Error(RouteError::NoContext),
        };
    }

    for t in QUESTION_TEMPLATES.iter() {
        if let Some(caps) = t.pattern.captures(normalized) {
            let topic = (t.resolver)(&caps);
            if !topic.is_empty() {
                tracing::debug!(
                    target: "tutor::router",
                    template = t.name,
                    topic = %topic,
                    "structured match"
                );
                return RouteDecision::StructuredLookup(topic);
            }
        }
    }

    let stripped = strip_stop_words(normalized);
    if stripped.is_empty() {
        RouteDecision::KeywordLookup(normalized.to_string())
    } else {
        RouteDecision::KeywordLookup(stripped)
    }
}
