//! Pipeline stages for IRAC summarisation.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! and the external collaborators can be swapped for fakes.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ extract ──▶ prompts ──▶ llm
//! (validate)  (pdfium)   (RoleKind)  (completion)
//! ```
//!
//! 1. [`upload`]: validate the submitted file and persist it to a temp file
//! 2. [`extract`]: read page text; runs in `spawn_blocking` because pdfium
//!    is not async-safe
//! 3. [`crate::prompts`]: compose the role-specific prompt (pure)
//! 4. [`llm`]: the only stage with network I/O; no retries

pub mod extract;
pub mod llm;
pub mod upload;
