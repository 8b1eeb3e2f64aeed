//! AI Tutor Gateway: `POST /api/tutor/ask` plus health and the bundled landing page.
//! Configuration comes from `config/tutor.toml` (or `TUTOR_CONFIG`) and `TUTOR__*` env vars.

use ai_tutor_core::{AskRequest, KnowledgeBase, Tutor, TutorConfig, TutorResponse};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::Request,
    middleware::Next,
    response::{Html, Response},
    routing::{get, post},
    Json, Router,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    tutor: Arc<Tutor>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match TutorConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(target: "tutor::gateway", error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let knowledge = match KnowledgeBase::load(&config.knowledge_path) {
        Ok(kb) => kb,
        Err(e) => {
            tracing::error!(
                target: "tutor::gateway",
                error = %e,
                "Knowledge base could not be loaded"
            );
            std::process::exit(1);
        }
    };
    let tutor = match Tutor::from_config(&config, knowledge) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(target: "tutor::gateway", error = %e, "HTTP client could not be built");
            std::process::exit(1);
        }
    };

    tracing::info!(
        target: "tutor::gateway",
        topics = tutor.knowledge().len(),
        path = %config.knowledge_path,
        "Knowledge base ready"
    );

    let app = build_app(Arc::new(tutor), config.static_dir.as_deref().map(Path::new));

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(target: "tutor::gateway", addr = %addr, error = %e, "Cannot bind");
            std::process::exit(1);
        }
    };
    tracing::info!(
        target: "tutor::gateway",
        "AI Tutor v{} listening on http://{}",
        ai_tutor_core::version(),
        addr
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(target: "tutor::gateway", error = %e, "Server stopped");
        std::process::exit(1);
    }
}

fn build_app(tutor: Arc<Tutor>, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/", get(serve_landing_page))
        .route("/api/tutor/ask", post(ask_handler))
        .with_state(AppState { tutor });

    match static_dir {
        Some(dir) if dir.is_dir() => {
            tracing::info!(target: "tutor::gateway", dir = %dir.display(), "Serving static files");
            app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
        }
        Some(dir) => {
            tracing::warn!(
                target: "tutor::gateway",
                dir = %dir.display(),
                "static_dir does not exist; skipping"
            )
        }
        None => {}
    }

    app.layer(axum::middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        target: "tutor::gateway",
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn health() -> &'static str {
    "OK"
}

async fn serve_landing_page() -> Html<&'static str> {
    const INDEX: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/index.html"));
    Html(INDEX)
}

/// Always HTTP 200; outcomes are carried in the body's `status`. An unreadable body is
/// answered like an empty question.
async fn ask_handler(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Json<TutorResponse> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(target: "tutor::gateway", error = %rejection, "Unreadable ask body");
            AskRequest::default()
        }
    };
    Json(state.tutor.ask(request).await)
}
