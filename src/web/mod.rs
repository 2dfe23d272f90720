// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web workspace: dashboard page plus JSON API

pub mod render;

use axum::{
    extract::{DefaultBodyLimit, Form, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::ingest::{IngestFailure, RawSelection};
use crate::reasoning::{audio_media_type, AudioClip};
use crate::session::{Action, FileSummary, Outcome, RunOutcome, SessionSnapshot, TranscribeOutcome, Workspace};
use crate::CityPulseError;

/// Shared application state
pub struct AppState {
    pub workspace: Workspace,
    pub config: AppConfig,
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.web.max_upload_mb * 1024 * 1024;

    Router::new()
        // Pages and form fallbacks
        .route("/", get(index_page))
        .route("/files", post(form_add_files))
        .route("/files/:id/remove", post(form_remove_file))
        .route("/context", post(form_set_context))
        .route("/context/clear", post(form_clear_context))
        .route("/analyze", post(form_run_analysis))
        .route("/transcribe", post(form_transcribe))
        // API endpoints
        .route("/health", get(health))
        .route("/api/session", get(api_get_session))
        .route("/api/files", post(api_add_files))
        .route("/api/files/:id", delete(api_remove_file))
        .route("/api/context", put(api_set_context).delete(api_clear_context))
        .route("/api/context/append", post(api_append_context))
        .route("/api/analyze", post(api_run_analysis))
        .route("/api/recording", post(api_start_recording))
        .route("/api/transcribe", post(api_transcribe))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON error body with a status code
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<CityPulseError> for ApiError {
    fn from(err: CityPulseError) -> Self {
        let status = match &err {
            CityPulseError::Validation(_) => StatusCode::BAD_REQUEST,
            CityPulseError::FileRead { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CityPulseError::Analysis(_)
            | CityPulseError::Transcription(_)
            | CityPulseError::Service(_)
            | CityPulseError::Api(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

// === Upload helpers ===

/// Read every file field; a field that fails to read becomes a failure
async fn collect_selections(mut multipart: Multipart) -> (Vec<RawSelection>, Vec<IngestFailure>) {
    let mut selections = Vec::new();
    let mut failures = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Upload interrupted: {}", e);
                failures.push(IngestFailure {
                    name: "upload".to_string(),
                    reason: e.body_text(),
                });
                break;
            }
        };

        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        // Browsers send an empty part when no file was picked
        if name.is_empty() {
            continue;
        }
        let media_type = field.content_type().map(str::to_string);

        match field.bytes().await {
            Ok(bytes) => selections.push(RawSelection::from_bytes(name, bytes.to_vec(), media_type)),
            Err(e) => failures.push(IngestFailure { name, reason: e.body_text() }),
        }
    }

    (selections, failures)
}

/// Pull the first file field out as an audio clip
async fn read_audio(mut multipart: Multipart) -> Result<AudioClip, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let declared = field.content_type().map(str::to_string);
        let from_name = std::path::Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| audio_media_type(&e.to_lowercase()));
        let media_type = match declared {
            Some(mt) if mt.starts_with("audio/") => mt,
            _ => from_name.unwrap_or("audio/webm").to_string(),
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?;
        if bytes.is_empty() {
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "recording is empty"));
        }
        return Ok(AudioClip::new(bytes.to_vec(), media_type));
    }

    Err(ApiError::new(StatusCode::BAD_REQUEST, "no audio file in request"))
}

async fn add_uploaded(state: &AppState, multipart: Multipart) -> UploadResponse {
    let (selections, unread) = collect_selections(multipart).await;
    let report = state.workspace.add_files(selections).await;

    let mut failures = report.failures;
    if !unread.is_empty() {
        failures.extend(unread);
        state
            .workspace
            .dispatch(Action::ReportIngestFailures(failures.clone()))
            .await;
    }

    UploadResponse {
        added: report.files.iter().map(FileSummary::from).collect(),
        failures,
    }
}

// === Page Handlers ===

async fn index_page(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.workspace.snapshot().await;
    match render::render_dashboard(&snapshot, state.workspace.service_name()) {
        Ok(html) => Html(html).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn form_add_files(State(state): State<Arc<AppState>>, multipart: Multipart) -> Redirect {
    add_uploaded(&state, multipart).await;
    Redirect::to("/")
}

async fn form_remove_file(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Redirect {
    state.workspace.remove_file(&id).await;
    Redirect::to("/")
}

#[derive(Deserialize)]
struct ContextForm {
    #[serde(default)]
    text: String,
}

async fn form_set_context(State(state): State<Arc<AppState>>, Form(form): Form<ContextForm>) -> Redirect {
    state.workspace.dispatch(Action::SetContext(form.text)).await;
    Redirect::to("/")
}

async fn form_clear_context(State(state): State<Arc<AppState>>) -> Redirect {
    state.workspace.dispatch(Action::ClearContext).await;
    Redirect::to("/")
}

async fn form_run_analysis(State(state): State<Arc<AppState>>) -> Redirect {
    // Failures are recorded in the session and shown on the page
    let _ = state.workspace.run_analysis().await;
    Redirect::to("/")
}

async fn form_transcribe(State(state): State<Arc<AppState>>, multipart: Multipart) -> Redirect {
    match read_audio(multipart).await {
        Ok(clip) => {
            let _ = state.workspace.transcribe(clip).await;
        }
        Err(e) => warn!("Rejected recording: {}", e.message),
    }
    Redirect::to("/")
}

// === API Handlers ===

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn api_get_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.workspace.snapshot().await)
}

#[derive(Serialize, Deserialize)]
struct UploadResponse {
    added: Vec<FileSummary>,
    failures: Vec<IngestFailure>,
}

async fn api_add_files(State(state): State<Arc<AppState>>, multipart: Multipart) -> Json<UploadResponse> {
    Json(add_uploaded(&state, multipart).await)
}

async fn api_remove_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.workspace.remove_file(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, format!("no file with id {}", id)))
    }
}

#[derive(Serialize, Deserialize)]
struct ContextBody {
    text: String,
}

#[derive(Deserialize)]
struct AppendBody {
    fragment: String,
}

async fn api_set_context(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ContextBody>,
) -> Json<ContextBody> {
    state.workspace.dispatch(Action::SetContext(body.text)).await;
    Json(ContextBody { text: state.workspace.snapshot().await.context })
}

async fn api_append_context(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AppendBody>,
) -> Json<ContextBody> {
    state.workspace.dispatch(Action::AppendContext(body.fragment)).await;
    Json(ContextBody { text: state.workspace.snapshot().await.context })
}

async fn api_clear_context(State(state): State<Arc<AppState>>) -> StatusCode {
    state.workspace.dispatch(Action::ClearContext).await;
    StatusCode::NO_CONTENT
}

async fn api_run_analysis(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    match state.workspace.run_analysis().await? {
        RunOutcome::Completed(result) => Ok(Json(result).into_response()),
        RunOutcome::Busy => Err(ApiError::new(StatusCode::CONFLICT, "analysis already running")),
    }
}

async fn api_start_recording(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    match state.workspace.dispatch(Action::StartRecording).await {
        Outcome::Applied => Ok(StatusCode::NO_CONTENT),
        _ => Err(ApiError::new(StatusCode::CONFLICT, "transcription already running")),
    }
}

#[derive(Serialize)]
struct TranscribeResponse {
    transcript: String,
    context: String,
}

async fn api_transcribe(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let clip = read_audio(multipart).await?;
    match state.workspace.transcribe(clip).await? {
        TranscribeOutcome::Completed(transcript) => Ok(Json(TranscribeResponse {
            transcript,
            context: state.workspace.snapshot().await.context,
        })),
        TranscribeOutcome::Busy => Err(ApiError::new(StatusCode::CONFLICT, "transcription already running")),
    }
}

/// Start the web server around a workspace
pub async fn start_server(config: AppConfig, workspace: Workspace) -> crate::Result<()> {
    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = Arc::new(AppState { workspace, config });

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Workspace available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router)
        .await
        .map_err(|e| CityPulseError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
