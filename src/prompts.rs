//! Prompts for IRAC summarisation.
//!
//! Every instruction sent to the completion service lives here, so prompt
//! changes touch one file and unit tests can inspect the exact strings
//! without calling a model.
//!
//! The audience is selected by [`RoleKind`]. Each variant carries its own
//! instruction block; [`RoleKind::General`] carries none, and any role string
//! the service does not recognise maps to it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// System message sent with every completion request.
pub const SYSTEM_PROMPT: &str = "You are a legal analysis assistant.";

/// Instruction block for law students.
pub const STUDENT_INSTRUCTIONS: &str = r#"You are preparing a case brief for a law student. Write in a detailed, educational tone that teaches the reasoning rather than just reporting it.

Produce an IRAC summary with exactly these sections, in this order:

Issue: State the precise legal question the court had to answer. Explain why the question arose from the facts and why it mattered.
Rule: Identify the governing rule of law. Ground it in doctrine: cite the constitutional provisions, statutes, and prior cases the court relied on, and explain how the doctrine developed.
Application: Trace the court's reasoning step by step, showing how the rule was applied to the facts. Discuss the alternative arguments the court considered and explain why it rejected them, including any concurring or dissenting views.
Conclusion: State the holding and the disposition, and summarise what a student should take away from the case."#;

/// Instruction block for paralegals.
pub const PARALEGAL_INSTRUCTIONS: &str = r#"You are preparing a case summary for a paralegal supporting active litigation. Write in a concise, practice-oriented tone.

Produce an IRAC summary with exactly these sections, in this order:

Issue: State the legal question decided, framed as it would appear in a research memo.
Rule: State the holding and the controlling rule. Link it to the precedent it follows, extends, or overrules, with citations where the opinion gives them.
Application: Summarise how the court applied the rule to the facts, emphasising the facts that were decisive. Note the historical context of the decision and how the ruling changed the prior state of the law.
Conclusion: State the holding and disposition, then explain how the decision is likely to be applied in future litigation and which arguments it makes stronger or weaker."#;

/// Audience for which the summary is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    /// Detailed, educational brief.
    Student,
    /// Practice-oriented brief focused on holdings and precedent.
    Paralegal,
    /// No audience-specific instructions.
    #[default]
    General,
}

impl RoleKind {
    /// Map a caller-supplied role identifier to a variant.
    ///
    /// Matching ignores case and surrounding whitespace. Anything else,
    /// including an absent or empty value, is [`RoleKind::General`].
    pub fn parse(role: Option<&str>) -> Self {
        match role.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("student") => RoleKind::Student,
            Some("paralegal") => RoleKind::Paralegal,
            _ => RoleKind::General,
        }
    }

    /// The instruction block for this audience, if it has one.
    pub fn instructions(self) -> Option<&'static str> {
        match self {
            RoleKind::Student => Some(STUDENT_INSTRUCTIONS),
            RoleKind::Paralegal => Some(PARALEGAL_INSTRUCTIONS),
            RoleKind::General => None,
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoleKind::Student => "student",
            RoleKind::Paralegal => "paralegal",
            RoleKind::General => "general",
        })
    }
}

/// Inputs to [`build_prompt`].
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub role: RoleKind,
    pub case_name: String,
    pub extracted_text: String,
}

/// Compose the user prompt: instruction block (if any), case name, then the
/// full extracted text.
///
/// Case name and text are inserted verbatim, without escaping or truncation.
pub fn build_prompt(request: &SummaryRequest) -> String {
    let mut prompt = String::with_capacity(
        request.extracted_text.len() + request.case_name.len() + 2048,
    );
    if let Some(instructions) = request.role.instructions() {
        prompt.push_str(instructions);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Case Name: ");
    prompt.push_str(&request.case_name);
    prompt.push_str("\nText: ");
    prompt.push_str(&request.extracted_text);
    prompt
}
