//! HTTP API server for web front ends.
//!
//! Exposes course question answering with per-session history, the course
//! catalog summary and session reset.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::SyllabusError;
use crate::orchestrator::Orchestrator;
use crate::rag::SourceAttribution;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Run the HTTP API server.
///
/// Course documents in `general.docs_dir` are loaded before the listener
/// binds; courses already in the index are left as they are.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let docs_dir = orchestrator.settings().docs_dir();
    if docs_dir.is_dir() {
        let spinner = Output::spinner(&format!("Loading courses from {}...", docs_dir.display()));
        let report = orchestrator.ingest_folder(&docs_dir, false).await;
        spinner.finish_and_clear();
        let report = report?;
        Output::success(&format!(
            "Loaded {} new course(s), {} chunks",
            report.ingested.len(),
            report.total_chunks()
        ));
        for (path, reason) in &report.failed {
            Output::warning(&format!("Skipped {}: {}", path.display(), reason));
        }
    } else {
        Output::warning(&format!("Docs folder {} not found, serving the existing index", docs_dir.display()));
    }

    let app = router(Arc::new(orchestrator));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Syllabus API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Query", "POST   /api/query");
    Output::kv("Courses", "GET    /api/courses");
    Output::kv("End session", "DELETE /api/session/{id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes over a shared orchestrator, with permissive CORS.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .route("/api/session/{id}", delete(end_session))
        .layer(cors)
        .with_state(orchestrator)
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    /// Continue this session; a new one is created when absent.
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<SourceInfo>,
    session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SourceInfo {
    text: String,
    url: Option<String>,
}

impl From<SourceAttribution> for SourceInfo {
    fn from(source: SourceAttribution) -> Self {
        Self {
            text: source.label(),
            url: source.lesson_link,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StatusResponse {
    status: String,
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: SyllabusError) -> Response {
    let status = match e {
        SyllabusError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(State(orchestrator): State<Arc<Orchestrator>>, Json(req): Json<QueryRequest>) -> Response {
    let session_id = req
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| orchestrator.create_session());

    match orchestrator.query(&session_id, &req.query).await {
        Ok(response) => Json(QueryResponse {
            answer: response.answer,
            sources: response.sources.into_iter().map(SourceInfo::from).collect(),
            session_id,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn courses(State(orchestrator): State<Arc<Orchestrator>>) -> Response {
    match orchestrator.course_analytics().await {
        Ok(analytics) => Json(analytics).into_response(),
        Err(e) => error_response(e),
    }
}

/// Clearing is idempotent: an unknown or already cleared session is fine.
async fn end_session(State(orchestrator): State<Arc<Orchestrator>>, Path(id): Path<String>) -> Json<StatusResponse> {
    let message = if orchestrator.clear_session(&id) {
        info!("Session {} cleared", id);
        format!("Session {} cleared", id)
    } else {
        format!("Session {} was not active", id)
    };
    Json(StatusResponse {
        status: "ok".to_string(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::SEARCH_TOOL;
    use crate::config::Prompts;
    use crate::rag::CourseAnalytics;
    use crate::testing::{ScriptedModel, WordEmbedder, MCP_COURSE};
    use crate::vector_store::MemoryVectorStore;
    use serde_json::json;

    /// Serve `model` on an ephemeral port with the MCP course loaded.
    async fn spawn(model: ScriptedModel) -> String {
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(WordEmbedder),
            Arc::new(model),
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mcp.txt"), MCP_COURSE).unwrap();
        orchestrator.ingest_folder(dir.path(), false).await.unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(orchestrator));
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_query_creates_session_and_returns_sources() {
        let base = spawn(
            ScriptedModel::new()
                .tool_call(SEARCH_TOOL, json!({"query": "what is mcp", "course_name": "MCP", "lesson_number": 1}))
                .text("MCP connects models to tools."),
        )
        .await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/query", base))
            .json(&json!({"query": "What is MCP?"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK.as_u16());

        let body: QueryResponse = response.json().await.unwrap();
        assert_eq!(body.answer, "MCP connects models to tools.");
        assert!(!body.session_id.is_empty());
        assert_eq!(
            body.sources[0].text,
            "MCP: Build Rich-Context AI Apps with Anthropic - Lesson 1"
        );
        assert_eq!(body.sources[0].url.as_deref(), Some("https://example.com/mcp/1"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_500() {
        let base = spawn(ScriptedModel::new().failure("upstream down")).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/query", base))
            .json(&json!({"query": "What is MCP?", "session_id": "s1"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR.as_u16());

        let body: ErrorResponse = response.json().await.unwrap();
        assert!(body.error.contains("upstream down"));
    }

    #[tokio::test]
    async fn test_blank_query_is_400() {
        let base = spawn(ScriptedModel::new()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/query", base))
            .json(&json!({"query": "   "}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST.as_u16());
    }

    #[tokio::test]
    async fn test_courses_and_session_reset() {
        let base = spawn(ScriptedModel::new().text("Hello.")).await;
        let client = reqwest::Client::new();

        let analytics: CourseAnalytics = client
            .get(format!("{}/api/courses", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(analytics.total_courses, 1);

        let body: QueryResponse = client
            .post(format!("{}/api/query", base))
            .json(&json!({"query": "hi"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let url = format!("{}/api/session/{}", base, body.session_id);
        for _ in 0..2 {
            let response = client.delete(&url).send().await.unwrap();
            assert_eq!(response.status(), StatusCode::OK.as_u16());
            let status: StatusResponse = response.json().await.unwrap();
            assert_eq!(status.status, "ok");
        }
    }
}
