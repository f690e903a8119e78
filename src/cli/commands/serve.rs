//! HTTP API server.
//!
//! Provides the query, feedback and health endpoints used by the web frontend.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{RetrievalSettings, Settings};
use crate::feedback::{FeedbackEntry, FeedbackLog};
use crate::orchestrator::Orchestrator;
use crate::rag::{Answer, AnswerPipeline};
use crate::retrieval::validate_query;
use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Shared application state.
pub struct AppState {
    pub pipeline: Arc<AnswerPipeline>,
    pub feedback: Arc<FeedbackLog>,
    pub retrieval: RetrievalSettings,
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(alive))
        .route("/health", get(alive))
        .route("/ping", get(ping))
        .route("/query", get(query))
        .route("/feedback", post(feedback))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'lawdecoder doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let retrieval = settings.retrieval.clone();

    let spinner = Output::spinner("Loading corpus and embedding model...");
    let orchestrator = Orchestrator::new(settings);
    spinner.finish_and_clear();
    let orchestrator = orchestrator?;

    let state = Arc::new(AppState {
        pipeline: orchestrator.pipeline(),
        feedback: orchestrator.feedback(),
        retrieval,
    });

    let app = router(state.clone());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("LawDecoder API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Query", "GET  /query?text=...&top_k=5");
    Output::kv("Feedback", "POST /feedback");
    Output::kv("Ping", "GET  /ping");
    println!();
    Output::kv("Corpus", &format!("{} sections", state.pipeline.retriever().corpus().len()));
    Output::kv("Feedback log", &state.feedback.path().display().to_string());
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
struct QueryParams {
    text: Option<String>,
    top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueryResponse {
    final_answer: String,
    top_sections: Vec<SectionInfo>,
    server_down: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SectionInfo {
    id: String,
    law_name: String,
    law_code: String,
    chapter: Option<String>,
    title: String,
    content: String,
    score: f32,
}

impl From<Answer> for QueryResponse {
    fn from(answer: Answer) -> Self {
        Self {
            final_answer: answer.text,
            top_sections: answer
                .top_sections
                .into_iter()
                .map(|s| SectionInfo {
                    id: s.entry.id,
                    law_name: s.entry.law_name,
                    law_code: s.entry.law_code,
                    chapter: s.entry.chapter,
                    title: s.entry.title,
                    content: s.entry.content,
                    score: s.score,
                })
                .collect(),
            server_down: answer.degraded,
            model: answer.model,
            details: None,
        }
    }
}

impl QueryResponse {
    fn internal_error(details: String) -> Self {
        Self {
            final_answer: "Internal server error while generating answer.".to_string(),
            top_sections: Vec::new(),
            server_down: true,
            model: None,
            details: Some(details),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn alive() -> StatusCode {
    StatusCode::OK
}

async fn ping() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "message": "Server is alive" }))
}

async fn query(State(state): State<Arc<AppState>>, Query(params): Query<QueryParams>) -> Response {
    let text = match params.text.as_deref().map(validate_query) {
        Some(Ok(text)) => text.to_string(),
        _ => {
            warn!("Query parameter missing");
            return error_response(StatusCode::BAD_REQUEST, "Missing query parameter");
        }
    };
    let top_k = state.retrieval.resolve_top_k(params.top_k);

    // Dropping this handler (client disconnect) cancels in-flight completion attempts.
    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    let pipeline = state.pipeline.clone();
    let task = tokio::spawn(async move { pipeline.answer(&text, top_k, &cancel).await });

    match task.await {
        Ok(Ok(answer)) => Json(QueryResponse::from(answer)).into_response(),
        Ok(Err(e)) if e.is_validation() => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Ok(Err(e)) => {
            error!("Query failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(QueryResponse::internal_error(e.to_string())),
            )
                .into_response()
        }
        Err(e) => {
            error!("Query task aborted: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(QueryResponse::internal_error("internal error".to_string())),
            )
                .into_response()
        }
    }
}

async fn feedback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FeedbackRequest>,
) -> Response {
    let entry = match FeedbackEntry::new(req.query, req.answer, req.feedback, req.comment) {
        Ok(entry) => entry,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.feedback.append(&entry).await {
        Ok(()) => Json(MessageResponse {
            message: "Feedback recorded successfully.".to_string(),
        })
        .into_response(),
        Err(e) => {
            error!("Error saving feedback: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save feedback.")
        }
    }
}
