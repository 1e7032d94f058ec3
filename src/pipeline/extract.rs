//! Text extraction: read page text from a persisted PDF via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. Extraction runs on the
//! blocking pool so Tokio worker threads keep serving other requests.
//!
//! ## Page joining
//!
//! Page boundaries are not preserved. Pages are joined with a single `\n` and
//! pages with no extractable text (scans, blank separators) are dropped
//! entirely, see [`join_pages`].

use crate::error::ExtractionError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turns a PDF on local storage into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, pdf_path: &Path) -> Result<String, ExtractionError>;
}

/// Join page texts in order with `\n`, skipping pages that are empty or
/// whitespace-only.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for page in pages {
        let page = page.as_ref();
        if page.trim().is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(page);
    }
    out
}

/// Production extractor backed by the pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    /// Library file, or directory holding it. None searches the working
    /// directory, then the system library path.
    lib_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract_text(&self, pdf_path: &Path) -> Result<String, ExtractionError> {
        let path = pdf_path.to_path_buf();
        let lib_path = self.lib_path.clone();
        tokio::task::spawn_blocking(move || extract_blocking(&path, lib_path.as_deref()))
            .await
            .map_err(|e| ExtractionError::Task(format!("extraction task panicked: {e}")))?
    }
}

/// How far into the file the `%PDF` header may start.
const HEADER_SEARCH_BYTES: u64 = 1024;

/// Reject files without a `%PDF` header in their first
/// [`HEADER_SEARCH_BYTES`] bytes before loading pdfium. Bytes before the
/// header (a BOM, a mail gateway preamble) are allowed.
fn check_magic(pdf_path: &Path) -> Result<(), ExtractionError> {
    let mut head = Vec::with_capacity(HEADER_SEARCH_BYTES as usize);
    std::fs::File::open(pdf_path)?
        .take(HEADER_SEARCH_BYTES)
        .read_to_end(&mut head)?;
    if head.windows(4).any(|w| w == b"%PDF") {
        return Ok(());
    }
    head.truncate(4);
    Err(ExtractionError::NotAPdf { magic: head })
}

/// Resolve a configured pdfium location: a library file is used as is, a
/// directory gets the platform library name appended.
fn library_path(configured: &Path) -> PathBuf {
    if configured.is_file() {
        configured.to_path_buf()
    } else {
        Pdfium::pdfium_platform_library_name_at_path(configured)
    }
}

fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, ExtractionError> {
    let bindings = match lib_path {
        Some(path) => Pdfium::bind_to_library(library_path(path)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ExtractionError::Binding(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of text extraction.
fn extract_blocking(pdf_path: &Path, lib_path: Option<&Path>) -> Result<String, ExtractionError> {
    check_magic(pdf_path)?;
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
        let detail = format!("{e:?}");
        if detail.contains("Password") || detail.contains("password") {
            ExtractionError::Encrypted
        } else {
            ExtractionError::Unreadable { detail }
        }
    })?;

    let pages = document.pages();
    let total = pages.len() as usize;

    let mut texts = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| ExtractionError::Unreadable {
                detail: format!("page {}: {e:?}", idx + 1),
            })?
            .all();
        if text.trim().is_empty() {
            debug!("Page {}: no extractable text, skipped", idx + 1);
        }
        texts.push(text);
    }

    let joined = join_pages(&texts);
    info!("Extracted {} chars from {} pages", joined.len(), total);
    Ok(joined)
}
