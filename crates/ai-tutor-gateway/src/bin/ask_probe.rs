//! Session probe: concurrent learners each resolve a topic, then ask a follow-up, and the
//! follow-up must come back about their own topic.
//! Run with the gateway up: cargo run -p ai-tutor-gateway --bin ask_probe [base_url]

use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
const CONCURRENT_LEARNERS: usize = 8;

const TOPICS: &[&str] = &[
    "mars",
    "photosynthesis",
    "ada lovelace",
    "the eiffel tower",
    "jupiter",
    "black holes",
];

/// Outcome of one learner's two-step conversation.
enum Probe {
    Consistent,
    /// The first lookup failed; the follow-up has nothing to check against.
    Skipped,
    Leaked,
    Failed,
}

async fn ask(client: &Client, base_url: &str, session: &str, query: &str) -> Option<Value> {
    let res = client
        .post(format!("{}/api/tutor/ask", base_url))
        .json(&json!({ "query": query, "sessionId": session, "media": "none" }))
        .send()
        .await
        .ok()?;
    if !res.status().is_success() {
        return None;
    }
    res.json().await.ok()
}

async fn converse(
    client: &Client,
    base_url: &str,
    learner: usize,
    latencies: &RwLock<Vec<u64>>,
) -> Probe {
    let session = format!("probe-{}", learner);
    let topic = TOPICS[learner % TOPICS.len()];

    let start = Instant::now();
    let Some(first) = ask(client, base_url, &session, &format!("!wiki {}", topic)).await else {
        return Probe::Failed;
    };
    latencies.write().await.push(start.elapsed().as_millis() as u64);
    if first["status"] != "ok" {
        return Probe::Skipped;
    }

    let start = Instant::now();
    let Some(second) = ask(client, base_url, &session, "what is it up to?").await else {
        return Probe::Failed;
    };
    latencies.write().await.push(start.elapsed().as_millis() as u64);

    // Both answers open with "Here’s the scoop on '<title>'"; same session, same title.
    let title_of = |v: &Value| {
        v["answer"]
            .as_str()
            .and_then(|a| a.lines().next())
            .map(str::to_string)
    };
    if second["status"] == "ok" && title_of(&first) == title_of(&second) {
        Probe::Consistent
    } else {
        Probe::Leaked
    }
}

#[tokio::main]
async fn main() {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    println!(
        "[ASK PROBE] {} learners x 2 questions against {}",
        CONCURRENT_LEARNERS, base_url
    );

    let consistent = Arc::new(AtomicU32::new(0));
    let skipped = Arc::new(AtomicU32::new(0));
    let leaked = Arc::new(AtomicU32::new(0));
    let failed = Arc::new(AtomicU32::new(0));
    let latencies: Arc<RwLock<Vec<u64>>> = Arc::new(RwLock::new(Vec::new()));

    let client = Client::new();
    let mut handles = Vec::new();
    for learner in 0..CONCURRENT_LEARNERS {
        let client = client.clone();
        let base_url = base_url.clone();
        let counters = (
            Arc::clone(&consistent),
            Arc::clone(&skipped),
            Arc::clone(&leaked),
            Arc::clone(&failed),
        );
        let latencies = Arc::clone(&latencies);

        handles.push(tokio::spawn(async move {
            let counter = match converse(&client, &base_url, learner, &latencies).await {
                Probe::Consistent => counters.0,
                Probe::Skipped => counters.1,
                Probe::Leaked => counters.2,
                Probe::Failed => counters.3,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    let guard = latencies.read().await;
    let avg_latency_ms = if guard.is_empty() {
        0.0
    } else {
        guard.iter().sum::<u64>() as f64 / guard.len() as f64
    };
    let leaked = leaked.load(Ordering::Relaxed);

    println!(
        "[ASK PROBE] Consistent: {} | Skipped: {} | Leaked: {} | Failed: {}",
        consistent.load(Ordering::Relaxed),
        skipped.load(Ordering::Relaxed),
        leaked,
        failed.load(Ordering::Relaxed)
    );
    println!("[ASK PROBE] Average latency: {:.0}ms", avg_latency_ms);

    if leaked > 0 {
        std::process::exit(1);
    }
}
