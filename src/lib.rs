//! # irac-brief
//!
//! HTTP service that turns the PDF of a court opinion into an IRAC summary
//! (Issue, Rule, Application, Conclusion) written for a chosen audience.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /api/generate_irac
//!  │
//!  ├─ 0. Guard     per-client quotas (100/day, 30/hour, 10/minute)
//!  ├─ 1. Validate  `pdf` field present, filename ends in .pdf
//!  ├─ 2. Persist   unique temp file in the upload directory
//!  ├─ 3. Extract   page text via pdfium (spawn_blocking); temp file removed
//!  ├─ 4. Prompt    role-specific instructions + case name + text
//!  ├─ 5. Complete  one chat call (gpt-4o, temperature 0.2, 2000 tokens)
//!  └─ 6. Respond   {"summary": ...} or {"error": ...}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use irac_brief::{server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads OPENAI_API_KEY from the environment.
//!     let config = ServerConfig::builder().port(5002).build()?;
//!     server::run(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Testing with fakes
//!
//! [`TextExtractor`], [`CompletionProvider`] and [`RequestLimiter`] are the
//! seams of the service. Build an [`AppState`] with your own implementations
//! and pass it to [`server::router`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `irac-brief` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod ratelimit;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CompletionSettings, RateLimits, ServerConfig, ServerConfigBuilder};
pub use error::{CompletionError, ExtractionError, ServiceError, StartupError};
pub use pipeline::extract::{join_pages, PdfiumExtractor, TextExtractor};
pub use pipeline::llm::{CompletionProvider, LlmCompletionClient};
pub use prompts::{build_prompt, RoleKind, SummaryRequest};
pub use ratelimit::{LimitExceeded, LimitScope, RequestLimiter, WindowLimiter};
pub use server::{router, AppState};
