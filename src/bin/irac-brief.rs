//! CLI binary for irac-brief.
//!
//! A thin shim over the library crate that maps CLI flags (each with an
//! environment fallback) to `ServerConfig`, sets up logging, and serves.

use anyhow::{Context, Result};
use clap::Parser;
use irac_brief::config::DEFAULT_PORT;
use irac_brief::{server, ServerConfig};
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  GET  /                   index.html from --static-dir
  GET  /api/health         {"status": "healthy"}
  POST /api/generate_irac  multipart form:
                             pdf       file ending in .pdf (required)
                             role      student | paralegal (optional)
                             caseName  free text (optional)

EXAMPLES:
  # Serve on the default port
  OPENAI_API_KEY=sk-... irac-brief

  # Request a student brief
  curl -F pdf=@opinion.pdf -F role=student -F "caseName=Marbury v. Madison" \
       http://localhost:5002/api/generate_irac

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY    API key for the default OpenAI provider
  PORT              Listening port (default 5002)
  PDFIUM_LIB_PATH   libpdfium file, or the directory containing it
  RUST_LOG          Overrides the log filter (e.g. irac_brief=debug)
"#;

/// Serve IRAC summaries of court opinions.
#[derive(Parser, Debug)]
#[command(
    name = "irac-brief",
    version,
    about = "Serve IRAC summaries of court-opinion PDFs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Interface to bind.
    #[arg(long, env = "IRAC_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Listening port.
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory for temporary uploads (created if missing).
    #[arg(long, env = "IRAC_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Directory containing index.html.
    #[arg(long, env = "IRAC_STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "IRAC_LLM_PROVIDER", default_value = "openai")]
    provider: String,

    /// LLM model ID.
    #[arg(long, env = "IRAC_MODEL", default_value = "gpt-4o")]
    model: String,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "IRAC_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per summary.
    #[arg(long, env = "IRAC_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "IRAC_MAX_UPLOAD_BYTES", default_value_t = 32 * 1024 * 1024)]
    max_upload_bytes: usize,

    /// Requests per day per client, all routes.
    #[arg(long, env = "IRAC_LIMIT_PER_DAY", default_value_t = 100)]
    per_day: u32,

    /// Requests per hour per client, all routes.
    #[arg(long, env = "IRAC_LIMIT_PER_HOUR", default_value_t = 30)]
    per_hour: u32,

    /// Summary requests per minute per client.
    #[arg(long, env = "IRAC_LIMIT_SUMMARY_PER_MINUTE", default_value_t = 10)]
    summary_per_minute: u32,

    /// Path to the pdfium shared library, or the directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IRAC_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "irac_brief=debug,tower_http=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    tracing::debug!("{config:?}");

    server::run(config).await.context("Server failed")?;
    Ok(())
}

/// Map CLI args to `ServerConfig`.
fn build_config(cli: &Cli) -> Result<ServerConfig> {
    let mut builder = ServerConfig::builder()
        .host(cli.host)
        .port(cli.port)
        .upload_dir(&cli.upload_dir)
        .static_dir(&cli.static_dir)
        .provider(&cli.provider)
        .model(&cli.model)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_upload_bytes(cli.max_upload_bytes)
        .per_day(cli.per_day)
        .per_hour(cli.per_hour)
        .summary_per_minute(cli.summary_per_minute);

    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }

    builder.build().context("Invalid configuration")
}
