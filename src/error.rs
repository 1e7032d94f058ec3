//! Error types for the irac-brief service.
//!
//! Each pipeline stage owns its error type:
//!
//! * [`ExtractionError`]: the uploaded file could not be turned into text.
//! * [`CompletionError`]: the completion service call failed.
//!
//! Both fold into [`ServiceError`], the request-level error that implements
//! [`IntoResponse`]. It is the only place where HTTP status codes and JSON
//! error bodies are chosen, so handlers just propagate with `?`.
//!
//! [`StartupError`] covers fatal problems before the listener is bound.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, warn};

/// Errors raised while turning a persisted upload into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file does not start with the `%PDF` magic bytes.
    #[error("file is not a PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The PDF engine could not parse the document.
    #[error("PDF is corrupt or unreadable: {detail}")]
    Unreadable { detail: String },

    /// The document is password protected.
    #[error("PDF is encrypted and cannot be read without a password")]
    Encrypted,

    /// The PDFium shared library could not be loaded.
    #[error("failed to bind to pdfium library: {0}")]
    Binding(String),

    #[error("I/O error reading upload: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking extraction task panicked or was cancelled.
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Errors raised by a [`crate::pipeline::llm::CompletionProvider`].
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// The provider could not be constructed (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured: {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The service (or the transport in front of it) reported a failure.
    ///
    /// `status` carries the upstream HTTP status when the provider exposes it.
    #[error("{message}")]
    Service {
        status: Option<u16>,
        message: String,
    },
}

impl CompletionError {
    /// A service failure without a known upstream status.
    pub fn service(message: impl Into<String>) -> Self {
        CompletionError::Service {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status to relay to the caller: upstream status when it is a
    /// valid error status, otherwise 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CompletionError::Service {
                status: Some(code), ..
            } => StatusCode::from_u16(*code)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Request-level failures, each mapped to one HTTP response.
#[derive(Debug, Error)]
pub enum ServiceError {
    // ── Client errors ─────────────────────────────────────────────────────
    /// Missing `pdf` field, missing filename, or a non-PDF extension.
    #[error("Invalid file type.")]
    InvalidUpload,

    /// The multipart body could not be read. `status` comes from the decoder
    /// (413 when the body limit was hit mid-stream).
    #[error("Malformed form data: {detail}")]
    MalformedForm { status: StatusCode, detail: String },

    /// A [`crate::ratelimit::RequestLimiter`] rejected the client.
    #[error("Rate limit exceeded: {limit}")]
    RateLimited { limit: String, retry_after_secs: u64 },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The cause is logged, never sent to the caller.
    #[error("Failed to read PDF.")]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    Completion(#[from] CompletionError),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected server-side failure (e.g. the upload could not be written).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidUpload => StatusCode::BAD_REQUEST,
            ServiceError::MalformedForm { status, .. } => *status,
            ServiceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Extraction(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Completion(e) => e.status_code(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ServiceError::Extraction(cause) => error!("PDF extraction failed: {cause}"),
            ServiceError::Completion(cause) => error!("Completion failed ({status}): {cause}"),
            ServiceError::Internal(cause) => error!("Internal error: {cause}"),
            ServiceError::RateLimited { limit, .. } => warn!("Rate limit exceeded: {limit}"),
            ServiceError::InvalidUpload | ServiceError::MalformedForm { .. } => {
                warn!("Rejected upload ({status}): {self}")
            }
        }

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        let mut response = (status, body).into_response();
        if let ServiceError::RateLimited {
            retry_after_secs, ..
        } = self
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Fatal errors raised before the server starts accepting requests.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to create upload directory '{path}': {source}")]
    UploadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Provider(#[from] CompletionError),

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}
