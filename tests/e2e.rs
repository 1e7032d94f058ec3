//! End-to-end tests for irac-brief.
//!
//! These tests load the real pdfium library and, for the summary tests, make
//! live LLM API calls. They are gated behind the `E2E_ENABLED` environment
//! variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 LD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture
//!
//! The live summary test additionally needs OPENAI_API_KEY.

use irac_brief::{
    build_prompt, CompletionProvider, CompletionSettings, ExtractionError, LlmCompletionClient,
    PdfiumExtractor, RoleKind, SummaryRequest, TextExtractor,
};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

fn pdfium_dir() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from)
}

/// Write a minimal PDF whose pages carry `pages[i]` as a single line of
/// Helvetica text. An empty string yields a page with an empty content stream.
fn write_pdf(path: &Path, pages: &[&str]) {
    let n = pages.len();
    // 1: catalog, 2: page tree, then (page, contents) pairs, then the font.
    let font_id = 3 + 2 * n;
    let mut objects: Vec<String> = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {n} >>",
        kids.join(" ")
    ));
    for (i, text) in pages.iter().enumerate() {
        let contents_id = 4 + 2 * i;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {contents_id} 0 R >>"
        ));
        let stream = if text.is_empty() {
            String::new()
        } else {
            format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET")
        };
        objects.push(format!(
            "<< /Length {} >>\nstream\n{stream}\nendstream",
            stream.len()
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
    }
    let xref = out.len();
    out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for off in offsets {
        out.push_str(&format!("{off:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    std::fs::write(path, out).unwrap();
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_skips_empty_pages() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("opinion.pdf");
    write_pdf(&pdf, &["The petition is granted.", "", "The judgment is reversed."]);

    let text = PdfiumExtractor::new(pdfium_dir())
        .extract_text(&pdf)
        .await
        .expect("extraction should succeed");
    println!("{text}");

    let first = text.find("The petition is granted.").expect("page 1 text");
    let third = text.find("The judgment is reversed.").expect("page 3 text");
    assert!(first < third, "pages must keep document order");
    assert!(
        !text.lines().any(|l| l.trim().is_empty()),
        "empty page must not add a blank line: {text:?}"
    );
}

#[tokio::test]
async fn test_extract_image_only_document_is_empty() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("scan.pdf");
    write_pdf(&pdf, &["", ""]);

    let text = PdfiumExtractor::new(pdfium_dir())
        .extract_text(&pdf)
        .await
        .unwrap();
    assert_eq!(text, "");
}

#[tokio::test]
async fn test_extract_truncated_pdf_yields_no_text() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("truncated.pdf");
    std::fs::write(&pdf, b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog").unwrap();

    // pdfium may repair the file into an empty document instead of failing.
    match PdfiumExtractor::new(pdfium_dir()).extract_text(&pdf).await {
        Err(ExtractionError::Unreadable { .. }) => {}
        Ok(text) => assert_eq!(text, ""),
        Err(other) => panic!("unexpected error: {other}"),
    }
}

// ── Live summary ─────────────────────────────────────────────────────────────

/// Full pipeline minus HTTP: real pdfium, real prompt, real model.
/// Requires E2E_ENABLED=1 and OPENAI_API_KEY.
#[tokio::test]
async fn test_live_student_summary() {
    e2e_skip_unless_enabled!();
    if std::env::var("OPENAI_API_KEY").is_err() {
        println!("SKIP: OPENAI_API_KEY not set");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("opinion.pdf");
    write_pdf(
        &pdf,
        &[
            "The question is whether a city may ban leafleting on public sidewalks.",
            "We hold the ordinance violates the First Amendment. Reversed.",
        ],
    );
    let text = PdfiumExtractor::new(pdfium_dir())
        .extract_text(&pdf)
        .await
        .unwrap();

    let prompt = build_prompt(&SummaryRequest {
        role: RoleKind::Student,
        case_name: "Doe v. City".into(),
        extracted_text: text,
    });
    let client = LlmCompletionClient::from_settings(CompletionSettings {
        max_tokens: 600,
        ..CompletionSettings::default()
    })
    .expect("provider should be configured");

    let summary = client.complete(&prompt).await.expect("completion failed");
    println!("{summary}");
    assert!(!summary.trim().is_empty());
    assert!(summary.contains("Issue"), "summary should follow IRAC: {summary}");
}
