//! Upload validation and temporary persistence.
//!
//! Validation happens on the multipart metadata alone, before anything
//! touches the disk. A validated upload is then written to a uniquely named
//! [`NamedTempFile`] inside the upload directory; pdfium needs a real path
//! and the unique name keeps concurrent uploads of `opinion.pdf` apart.

use crate::error::ServiceError;
use axum::body::Bytes;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Extensions accepted by the summary endpoint (compared lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

/// Lowercased last dot-segment of `filename`, if it has one.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// True when `filename` ends in an allowed extension, ignoring case.
pub fn allowed_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Reduce a client-supplied filename to a safe on-disk component.
///
/// Keeps only the final path segment, replaces anything outside
/// `[A-Za-z0-9._-]` with `_`, and strips leading dots. Returns `"upload"` when
/// nothing survives.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// A validated upload held in memory.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub extension: String,
    pub bytes: Bytes,
}

impl UploadedDocument {
    /// Validate the `pdf` form field.
    ///
    /// `file` is `None` when the field was absent. A field without a filename
    /// or with a disallowed extension is rejected the same way.
    pub fn validate(file: Option<(Option<String>, Bytes)>) -> Result<Self, ServiceError> {
        let (filename, bytes) = file.ok_or(ServiceError::InvalidUpload)?;
        let filename = filename
            .filter(|f| !f.is_empty())
            .ok_or(ServiceError::InvalidUpload)?;
        if !allowed_file(&filename) {
            return Err(ServiceError::InvalidUpload);
        }
        let extension = extension(&filename).unwrap_or_default();
        Ok(Self {
            filename,
            extension,
            bytes,
        })
    }

    /// Write the bytes to a fresh temp file in `dir`.
    ///
    /// The file is removed when the returned handle is closed or dropped.
    pub fn persist(&self, dir: &Path) -> Result<NamedTempFile, ServiceError> {
        let stem = sanitize_filename(&self.filename);
        let stem = stem
            .strip_suffix(&format!(".{}", self.extension))
            .unwrap_or(&stem);
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{stem}-"))
            .suffix(&format!(".{}", self.extension))
            .tempfile_in(dir)
            .map_err(|e| ServiceError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(&self.bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| ServiceError::Internal(format!("tempfile write: {e}")))?;
        debug!(
            "Persisted upload '{}' ({} bytes) to {}",
            self.filename,
            self.bytes.len(),
            tmp.path().display()
        );
        Ok(tmp)
    }
}
