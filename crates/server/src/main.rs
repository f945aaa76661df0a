//! Clarity Server
//!
//! Axum server exposing the idea analysis pipeline over HTTP, plus a CLI
//! mode that runs a single analysis without the server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};

use clarity_core::generation::OpenAiPort;
use clarity_core::models::ModelConfig;
use clarity_core::pipeline::{Orchestrator, PipelineOutcome};
use clarity_core::render::render_markdown;
use clarity_core::store::{RunStatus, RunStore, SqliteRunStore};

/// Application state shared by all handlers.
struct AppState {
    store: Arc<dyn RunStore>,
    orchestrator: Arc<Orchestrator>,
}

type SharedState = Arc<AppState>;

// === API Types ===

#[derive(Deserialize, ToSchema)]
struct IdeaInput {
    /// The startup idea to analyze
    idea: String,
}

#[derive(Serialize, ToSchema)]
struct RunResponse {
    run_id: String,
}

#[derive(Deserialize, ToSchema)]
struct FeedbackInput {
    /// Map of question IDs to answers
    answers: std::collections::BTreeMap<String, String>,
}

#[derive(Serialize, ToSchema)]
struct FeedbackResponse {
    status: String,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    detail: String,
}

#[derive(Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %e, "request failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clarity API",
        version = "0.1.0",
        description = "API for running AI-powered market analysis on startup ideas"
    ),
    paths(
        start_analysis,
        list_analyses,
        get_analysis,
        submit_feedback,
        export_markdown
    ),
    components(schemas(IdeaInput, RunResponse, FeedbackInput, FeedbackResponse, ErrorResponse)),
    tags(
        (name = "analysis", description = "Analysis run management"),
        (name = "export", description = "Report export")
    )
)]
struct ApiDoc;

// === API Handlers ===

/// Start a new analysis
#[utoipa::path(
    post,
    path = "/api/v1/analysis/run",
    tag = "analysis",
    request_body = IdeaInput,
    responses(
        (status = 200, description = "Run created and pipeline started", body = RunResponse)
    )
)]
async fn start_analysis(
    State(state): State<SharedState>,
    Json(input): Json<IdeaInput>,
) -> Result<Json<RunResponse>, ApiError> {
    let run_id = state.store.create_run(&input.idea).map_err(internal_error)?;
    tracing::info!(run_id, "analysis requested");

    spawn_analysis(&state, run_id.clone(), input.idea);

    Ok(Json(RunResponse { run_id }))
}

/// List recent analyses
#[utoipa::path(
    get,
    path = "/api/v1/analysis",
    tag = "analysis",
    params(("limit" = Option<usize>, Query, description = "Maximum number of runs to return")),
    responses(
        (status = 200, description = "Recent runs, newest first")
    )
)]
async fn list_analyses(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let runs = state
        .store
        .list_runs(params.limit.unwrap_or(50))
        .map_err(internal_error)?;
    Ok(Json(serde_json::to_value(runs).map_err(internal_error)?))
}

/// Get analysis status
#[utoipa::path(
    get,
    path = "/api/v1/analysis/{run_id}",
    tag = "analysis",
    params(("run_id" = String, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run status, artifacts, events, and report if available"),
        (status = 404, description = "Run not found", body = ErrorResponse)
    )
)]
async fn get_analysis(
    State(state): State<SharedState>,
    Path(run_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let view = state
        .store
        .get_run(&run_id)
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Run not found"))?;
    Ok(Json(serde_json::to_value(view).map_err(internal_error)?))
}

/// Submit answers to interview questions
#[utoipa::path(
    post,
    path = "/api/v1/analysis/{run_id}/feedback",
    tag = "analysis",
    params(("run_id" = String, Path, description = "Run ID")),
    request_body = FeedbackInput,
    responses(
        (status = 200, description = "Answers stored and pipeline resumed", body = FeedbackResponse),
        (status = 400, description = "Run has no interview", body = ErrorResponse),
        (status = 404, description = "Run not found", body = ErrorResponse)
    )
)]
async fn submit_feedback(
    State(state): State<SharedState>,
    Path(run_id): Path<String>,
    Json(input): Json<FeedbackInput>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let view = state
        .store
        .get_run(&run_id)
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Run not found"))?;

    let mut interview = state
        .store
        .get_interview(&run_id)
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No interview found for this run"))?;

    // Merge rather than replace so partial resubmissions keep earlier answers.
    interview.answers.extend(input.answers);
    state
        .store
        .save_interview(&run_id, &interview)
        .map_err(internal_error)?;
    state
        .store
        .update_run_status(&run_id, RunStatus::Running)
        .map_err(internal_error)?;

    tracing::info!(run_id, "resuming analysis with interview answers");
    spawn_analysis(&state, run_id, view.run.idea_text);

    Ok(Json(FeedbackResponse {
        status: "resumed".to_string(),
    }))
}

/// Export analysis as Markdown
#[utoipa::path(
    get,
    path = "/api/v1/analysis/{run_id}/export.md",
    tag = "export",
    params(("run_id" = String, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Report rendered as Markdown", content_type = "text/markdown"),
        (status = 400, description = "Report not yet generated", body = ErrorResponse),
        (status = 404, description = "Run not found", body = ErrorResponse)
    )
)]
async fn export_markdown(
    State(state): State<SharedState>,
    Path(run_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .store
        .get_run(&run_id)
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Run not found"))?;

    let report = view
        .report
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Report not yet generated"))?;

    Ok((
        [(axum::http::header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        render_markdown(&report),
    ))
}

async fn serve_openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Run the pipeline for a run in the background. Store failures are logged;
/// agent failures are already recorded against the run by the orchestrator.
fn spawn_analysis(state: &SharedState, run_id: String, idea_text: String) {
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        match orchestrator.run_analysis(&run_id, &idea_text).await {
            Ok(PipelineOutcome::Completed(_)) => {
                tracing::info!(run_id, "run completed");
            }
            Ok(PipelineOutcome::WaitingForInput) => {
                tracing::info!(run_id, "run waiting for interview answers");
            }
            Ok(PipelineOutcome::Failed(error)) => {
                tracing::warn!(run_id, error, "run failed");
            }
            Err(e) => {
                tracing::error!(run_id, error = %e, "run aborted on store failure");
            }
        }
    });
}

// === CLI ===

#[derive(Parser)]
#[command(author, version, about = "Clarity - AI-powered startup idea analysis")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start the Clarity API server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
    /// Analyze an idea directly, without the server
    Run {
        /// The idea to analyze
        idea: String,
    },
}

fn db_path() -> String {
    std::env::var("CLARITY_DB").unwrap_or_else(|_| "clarity.db".to_string())
}

fn build_state() -> anyhow::Result<SharedState> {
    let config = ModelConfig::default();
    let store: Arc<dyn RunStore> = Arc::new(SqliteRunStore::open_at(db_path())?);
    let port = Arc::new(OpenAiPort::from_env(config.clone())?);
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&store), port, &config));
    Ok(Arc::new(AppState {
        store,
        orchestrator,
    }))
}

async fn run_server(port: u16) -> anyhow::Result<()> {
    let state = build_state()?;

    let analysis_routes = Router::new()
        .route("/", get(list_analyses))
        .route("/run", post(start_analysis))
        .route("/:run_id", get(get_analysis))
        .route("/:run_id/feedback", post(submit_feedback))
        .route("/:run_id/export.md", get(export_markdown));

    let app = Router::new()
        .nest("/api/v1/analysis", analysis_routes)
        .route("/api/v1/openapi.json", get(serve_openapi))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(%addr, "Clarity server listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CLI mode: run one analysis to completion and print the Markdown report.
/// If the interviewer has questions they are printed and the run is left
/// suspended; answers can be submitted later through the API.
async fn run_once(idea: &str) -> anyhow::Result<()> {
    let state = build_state()?;
    let run_id = state.store.create_run(idea)?;
    println!("Run ID: {run_id}");

    match state.orchestrator.run_analysis(&run_id, idea).await? {
        PipelineOutcome::Completed(report) => {
            println!("{}", render_markdown(&report));
        }
        PipelineOutcome::WaitingForInput => {
            println!("The interviewer has questions before the analysis can continue:\n");
            if let Some(interview) = state.store.get_interview(&run_id)? {
                for question in &interview.questions {
                    println!("  [{}] {}", question.id, question.text);
                    if let Some(guidance) = &question.guidance {
                        println!("      ({guidance})");
                    }
                }
            }
            println!("\nSubmit answers via POST /api/v1/analysis/{run_id}/feedback");
        }
        PipelineOutcome::Failed(error) => {
            anyhow::bail!("analysis failed: {error}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Some(CliCommand::Run { idea }) => run_once(&idea).await,
        Some(CliCommand::Serve { port }) => run_server(port).await,
        None => run_server(8000).await,
    }
}
