//! End-to-end ask pipeline against fake Wikipedia and media collaborators.
//!
//! Run with: `cargo test -p ai_tutor_core --test tutor_flow_test`

use ai_tutor_core::{
    AnswerStatus, AskRequest, ConversationState, KnowledgeBase, LookupFailure, MediaError,
    MediaGenerator, MediaKind, MediaPayload, MediaRequest, SummarySource, Tutor, TutorOptions,
    WikiPage,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeWiki {
    pages: HashMap<String, WikiPage>,
    transient: bool,
    calls: AtomicUsize,
    topics: Mutex<Vec<String>>,
}

impl FakeWiki {
    fn with_pages(pages: &[(&str, &str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(topic, title, extract)| {
                    (
                        topic.to_string(),
                        WikiPage {
                            title: title.to_string(),
                            extract: extract.to_string(),
                        },
                    )
                })
                .collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummarySource for FakeWiki {
    async fn fetch_summary(&self, topic: &str) -> Result<WikiPage, LookupFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.topics.lock().unwrap().push(topic.to_string());
        if self.transient {
            return Err(LookupFailure::Transient("HTTP 503".into()));
        }
        self.pages
            .get(topic)
            .cloned()
            .ok_or_else(|| LookupFailure::NotFound(topic.to_string()))
    }
}

enum MediaBehavior {
    Succeed,
    Fail,
}

struct FakeMedia {
    behavior: MediaBehavior,
    requests: Mutex<Vec<MediaRequest>>,
}

impl FakeMedia {
    fn new(behavior: MediaBehavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaGenerator for FakeMedia {
    async fn generate(&self, request: MediaRequest) -> Result<MediaPayload, MediaError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.behavior {
            MediaBehavior::Fail => Err(MediaError::Script("Image generation error: boom".into())),
            MediaBehavior::Succeed => Ok(match request {
                MediaRequest::Illustration { video: true, .. } => {
                    MediaPayload::Video("data:video/mp4;base64,AAAA".into())
                }
                MediaRequest::Illustration { .. } => {
                    MediaPayload::Image("data:image/png;base64,AAAA".into())
                }
                MediaRequest::Speech { .. } => {
                    MediaPayload::Audio("data:audio/wav;base64,AAAA".into())
                }
            }),
        }
    }
}

fn knowledge() -> KnowledgeBase {
    KnowledgeBase::from_json(
        r#"[
            {"keyword": "physics", "response": "Physics is the study of matter, energy and motion.",
             "chart": {"type": "bar", "data": {"labels": ["mass", "energy"], "values": [1, 2]}}},
            {"keyword": "algebra", "response": "Algebra swaps numbers for symbols."}
        ]"#,
    )
    .unwrap()
}

struct Harness {
    tutor: Tutor,
    wiki: Arc<FakeWiki>,
    media: Arc<FakeMedia>,
}

fn harness_with(wiki: FakeWiki, media: MediaBehavior, options: TutorOptions) -> Harness {
    let wiki = Arc::new(wiki);
    let media = Arc::new(FakeMedia::new(media));
    let tutor = Tutor::new(
        Arc::new(knowledge()),
        wiki.clone(),
        media.clone(),
        ConversationState::new(64),
        options,
    );
    Harness { tutor, wiki, media }
}

fn harness(wiki: FakeWiki, media: MediaBehavior) -> Harness {
    harness_with(wiki, media, TutorOptions::default())
}

fn standard_wiki() -> FakeWiki {
    FakeWiki::with_pages(&[
        ("photosynthesis", "Photosynthesis", "Photosynthesis converts light into chemical energy."),
        ("mars", "Mars", "Mars is the fourth planet from the Sun."),
        ("jupiter", "Jupiter", "Jupiter is the largest planet."),
    ])
}

fn ask(query: &str) -> AskRequest {
    AskRequest::query(query)
}

fn ask_in(session: &str, query: &str) -> AskRequest {
    AskRequest {
        session_id: Some(session.to_string()),
        ..AskRequest::query(query)
    }
}

#[tokio::test]
async fn greeting_is_canned_without_network() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    let r = h.tutor.ask(ask("hi")).await;
    assert_eq!(r.status, AnswerStatus::Ok);
    assert_eq!(r.answer, "Yo, what's good, my man?");
    assert!(r.chart.is_none());
    assert_eq!(h.wiki.calls(), 0);
    assert_eq!(h.media.calls(), 0);
}

#[tokio::test]
async fn empty_tutor_query_prompts_for_input() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    let r = h
        .tutor
        .ask(AskRequest {
            query: Some("   ".into()),
            mode: Some("tutor".into()),
            ..AskRequest::default()
        })
        .await;
    assert_eq!(r.status, AnswerStatus::MissingInput);
    assert_eq!(r.answer, "Yo, hit me with a question, my man!");
    assert_eq!(h.wiki.calls(), 0);

    let missing = h.tutor.ask(AskRequest::default()).await;
    assert_eq!(missing.status, AnswerStatus::MissingInput);
}

#[tokio::test]
async fn tutor_mode_knowledge_hit_short_circuits() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    let r = h
        .tutor
        .ask(AskRequest {
            mode: Some("tutor".into()),
            ..AskRequest::query("Can you teach me some physics today?")
        })
        .await;
    assert_eq!(r.status, AnswerStatus::Ok);
    assert_eq!(r.answer, "Physics is the study of matter, energy and motion.");
    assert_eq!(r.chart.as_ref().unwrap()["type"], "bar");
    assert_eq!(h.wiki.calls(), 0);
    assert_eq!(h.media.calls(), 0);
    assert_eq!(
        h.tutor.sessions().last_topic(&Default::default()).as_deref(),
        Some("physics")
    );
}

#[tokio::test]
async fn open_mode_checks_knowledge_for_exact_topic() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    let r = h.tutor.ask(ask("What is algebra?")).await;
    assert_eq!(r.answer, "Algebra swaps numbers for symbols.");
    assert_eq!(h.wiki.calls(), 0);

    // Substring containment is tutor-mode only.
    let r = h.tutor.ask(ask("what is linear algebra")).await;
    assert_eq!(r.status, AnswerStatus::NotFound);
    assert_eq!(h.wiki.calls(), 1);
}

#[tokio::test]
async fn open_mode_knowledge_can_be_disabled() {
    let options = TutorOptions {
        open_mode_lookup: false,
        ..TutorOptions::default()
    };
    let h = harness_with(standard_wiki(), MediaBehavior::Succeed, options);
    let r = h.tutor.ask(ask("what is algebra")).await;
    assert_eq!(r.status, AnswerStatus::NotFound);
    assert_eq!(h.wiki.calls(), 1);
}

#[tokio::test]
async fn follow_up_without_context_makes_no_call() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    let r = h.tutor.ask(ask("what's it up to?")).await;
    assert_eq!(r.status, AnswerStatus::NoContext);
    assert_eq!(
        r.answer,
        "Yo, I need some context! Ask about someone or something first."
    );
    assert_eq!(h.wiki.calls(), 0);
}

#[tokio::test]
async fn explicit_wiki_answers_with_illustration() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    let r = h.tutor.ask(ask("!wiki Photosynthesis")).await;
    assert_eq!(r.status, AnswerStatus::Ok);
    assert!(r
        .answer
        .starts_with("Here’s the scoop on 'Photosynthesis' from Wikipedia:\n"));
    assert!(r.answer.contains("chemical energy"));
    assert_eq!(r.image_url.as_deref(), Some("data:image/png;base64,AAAA"));
    assert!(r.video_url.is_none());
    assert_eq!(h.wiki.topics.lock().unwrap().as_slice(), ["photosynthesis"]);

    let requests = h.media.requests.lock().unwrap();
    assert_eq!(
        requests.as_slice(),
        [MediaRequest::Illustration {
            prompt: "Sci-fi illustration of Photosynthesis".into(),
            video: false,
        }]
    );
}

#[tokio::test]
async fn empty_wiki_command_asks_for_topic() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    let r = h.tutor.ask(ask("!wiki")).await;
    assert_eq!(r.status, AnswerStatus::MissingInput);
    assert_eq!(r.answer, "Yo, give me something to search for after '!wiki'!");
    assert_eq!(h.wiki.calls(), 0);
}

#[tokio::test]
async fn follow_up_looks_up_last_topic() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    h.tutor.ask(ask("tell me about mars")).await;
    let r = h.tutor.ask(ask("What is it doing now?")).await;
    assert_eq!(r.status, AnswerStatus::Ok);
    assert!(r.answer.contains("fourth planet"));
    assert_eq!(h.wiki.topics.lock().unwrap().as_slice(), ["mars", "mars"]);
}

#[tokio::test]
async fn miss_mentions_topic_and_keeps_last_topic() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    h.tutor.ask(ask("!wiki mars")).await;
    let r = h.tutor.ask(ask("!wiki zzyzx flarb")).await;
    assert_eq!(r.status, AnswerStatus::NotFound);
    assert_eq!(r.answer, "Yo, I can’t find 'zzyzx flarb'. Try something like 'mars'!");
    assert!(r.image_url.is_none());
    // The failed lookup did not overwrite the remembered topic.
    assert_eq!(
        h.tutor.sessions().last_topic(&Default::default()).as_deref(),
        Some("mars")
    );
}

#[tokio::test]
async fn transient_failure_is_a_friendly_message() {
    let wiki = FakeWiki {
        transient: true,
        ..standard_wiki()
    };
    let h = harness(wiki, MediaBehavior::Succeed);
    let r = h.tutor.ask(ask("volcanoes")).await;
    assert_eq!(r.status, AnswerStatus::Transient);
    assert_eq!(r.answer, "Oops, something went wrong with 'volcanoes'!");
    assert_eq!(h.media.calls(), 0);
}

#[tokio::test]
async fn media_failure_keeps_text_answer() {
    let h = harness(standard_wiki(), MediaBehavior::Fail);
    let r = h
        .tutor
        .ask(AskRequest {
            speak: true,
            ..ask("!wiki mars")
        })
        .await;
    assert_eq!(r.status, AnswerStatus::Ok);
    assert!(!r.answer.is_empty());
    assert!(r.image_url.is_none());
    assert!(r.video_url.is_none());
    assert!(r.audio_url.is_none());
    assert_eq!(h.media.calls(), 2);
}

#[tokio::test]
async fn video_and_speech_requests() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    let r = h
        .tutor
        .ask(AskRequest {
            media: Some(MediaKind::Video),
            speak: true,
            ..ask("!wiki jupiter")
        })
        .await;
    assert!(r.image_url.is_none());
    assert_eq!(r.video_url.as_deref(), Some("data:video/mp4;base64,AAAA"));
    assert_eq!(r.audio_url.as_deref(), Some("data:audio/wav;base64,AAAA"));
}

#[tokio::test]
async fn media_none_skips_illustration() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    let r = h
        .tutor
        .ask(AskRequest {
            media: Some(MediaKind::None),
            ..ask("!wiki jupiter")
        })
        .await;
    assert_eq!(r.status, AnswerStatus::Ok);
    assert_eq!(h.media.calls(), 0);
}

#[tokio::test]
async fn sessions_do_not_share_last_topic() {
    let h = harness(standard_wiki(), MediaBehavior::Succeed);
    h.tutor.ask(ask_in("alice", "!wiki mars")).await;
    h.tutor.ask(ask_in("bob", "!wiki jupiter")).await;

    let alice = h.tutor.ask(ask_in("alice", "what's it up to")).await;
    let bob = h.tutor.ask(ask_in("bob", "what's it up to")).await;
    let anon = h.tutor.ask(ask("what's it up to")).await;

    assert!(alice.answer.contains("'Mars'"));
    assert!(bob.answer.contains("'Jupiter'"));
    assert_eq!(anon.status, AnswerStatus::NoContext);
}

#[tokio::test]
async fn concurrent_sessions_follow_their_own_topic() {
    let h = Arc::new(harness(standard_wiki(), MediaBehavior::Succeed));
    let mut handles = Vec::new();
    for (i, topic) in ["mars", "jupiter", "photosynthesis"].iter().cycle().take(12).enumerate() {
        let h = Arc::clone(&h);
        let topic = topic.to_string();
        handles.push(tokio::spawn(async move {
            let session = format!("s{}", i);
            h.tutor.ask(ask_in(&session, &format!("!wiki {}", topic))).await;
            let r = h.tutor.ask(ask_in(&session, "what is it doing")).await;
            (topic, r)
        }));
    }
    for handle in handles {
        let (topic, r) = handle.await.unwrap();
        assert_eq!(r.status, AnswerStatus::Ok);
        assert!(r.answer.to_lowercase().contains(&format!("'{}'", topic)));
    }
}
