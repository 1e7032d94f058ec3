//! HTTP surface: router, handlers, and the serve loop.
//!
//! ```text
//! GET  /                  static index.html
//! GET  /api/health        {"status": "healthy"}
//! POST /api/generate_irac multipart: pdf (file), role, caseName
//! ```
//!
//! Every route is checked against the daily/hourly quotas exactly once; the
//! summary route is checked against those and its per-minute quota in one
//! step.

use crate::config::ServerConfig;
use crate::error::{ServiceError, StartupError};
use crate::pipeline::extract::{PdfiumExtractor, TextExtractor};
use crate::pipeline::llm::{CompletionProvider, LlmCompletionClient};
use crate::pipeline::upload::UploadedDocument;
use crate::prompts::{build_prompt, RoleKind, SummaryRequest};
use crate::ratelimit::{self, RequestLimiter, WindowLimiter};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, get_service, post};
use axum::{middleware, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// How often idle clients are dropped from the rate-limit table.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared, read-only request context. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub extractor: Arc<dyn TextExtractor>,
    pub completion: Arc<dyn CompletionProvider>,
    pub limiter: Arc<dyn RequestLimiter>,
}

impl AppState {
    /// Assemble state from a config and the three collaborators.
    pub fn new(
        config: &ServerConfig,
        extractor: Arc<dyn TextExtractor>,
        completion: Arc<dyn CompletionProvider>,
        limiter: Arc<dyn RequestLimiter>,
    ) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            static_dir: config.static_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
            extractor,
            completion,
            limiter,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let index = ServeFile::new(state.static_dir.join("index.html"));

    Router::new()
        .route("/", get_service(index))
        .route("/api/health", get(health))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::default_limit,
        ))
        .route(
            "/api/generate_irac",
            post(generate_irac).route_layer(middleware::from_fn_with_state(
                state.clone(),
                ratelimit::summary_limit,
            )),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// Fields of the summary form. Unknown fields are ignored.
#[derive(Debug, Default)]
struct IracForm {
    /// `(filename, bytes)` of the `pdf` field.
    pdf: Option<(Option<String>, Bytes)>,
    role: Option<String>,
    case_name: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<IracForm, ServiceError> {
    let malformed = |e: axum::extract::multipart::MultipartError| ServiceError::MalformedForm {
        status: e.status(),
        detail: e.body_text(),
    };

    let mut form = IracForm::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("pdf") if form.pdf.is_none() => {
                let filename = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await.map_err(malformed)?;
                form.pdf = Some((filename, bytes));
            }
            Some("role") => form.role = Some(field.text().await.map_err(malformed)?),
            Some("caseName") => form.case_name = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }
    Ok(form)
}

/// `POST /api/generate_irac`
///
/// validate → persist → extract → remove temp file → prompt → complete.
async fn generate_irac(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummaryResponse>, ServiceError> {
    let start = Instant::now();

    // A body that is not multipart carries no file at all.
    let multipart = multipart.map_err(|e| {
        debug!("Not a multipart request: {e}");
        ServiceError::InvalidUpload
    })?;
    let form = read_form(multipart).await?;
    let document = UploadedDocument::validate(form.pdf)?;
    info!(
        "Summary request: '{}' ({} bytes)",
        document.filename,
        document.bytes.len()
    );

    let text = extract_document(&state, &document).await?;

    let request = SummaryRequest {
        role: RoleKind::parse(form.role.as_deref()),
        case_name: form.case_name.unwrap_or_default(),
        extracted_text: text,
    };
    let prompt = build_prompt(&request);
    debug!("Prompt for role {}: {} chars", request.role, prompt.len());

    let summary = state.completion.complete(&prompt).await?;

    info!(
        "Summary for '{}' generated in {}ms",
        document.filename,
        start.elapsed().as_millis()
    );
    Ok(Json(SummaryResponse { summary }))
}

/// Persist the upload, extract its text, and delete the temp file exactly
/// once whether or not extraction succeeded.
async fn extract_document(
    state: &AppState,
    document: &UploadedDocument,
) -> Result<String, ServiceError> {
    let tmp = document.persist(&state.upload_dir)?;
    let result = state.extractor.extract_text(tmp.path()).await;
    if let Err(e) = tmp.close() {
        warn!("Failed to remove temporary upload: {e}");
    }
    Ok(result?)
}

/// Build the production collaborators from `config` and serve until SIGINT
/// or SIGTERM.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    std::fs::create_dir_all(&config.upload_dir).map_err(|source| StartupError::UploadDir {
        path: config.upload_dir.clone(),
        source,
    })?;

    let completion = LlmCompletionClient::from_settings(config.completion.clone())?;
    let extractor = PdfiumExtractor::new(config.pdfium_lib_path.clone());
    let limiter: Arc<dyn RequestLimiter> = Arc::new(WindowLimiter::new(config.limits));

    tokio::spawn(ratelimit::prune_loop(Arc::clone(&limiter), PRUNE_INTERVAL));

    let state = AppState::new(&config, Arc::new(extractor), Arc::new(completion), limiter);
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    info!("Listening on http://{addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(StartupError::Serve)?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
