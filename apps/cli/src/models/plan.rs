//! `EditPlan`, `EditDirective`, and the refactor output artifacts.

use serde::{Deserialize, Serialize};

/// One atomic edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectiveOp {
    RewriteBullet,
    InjectKeyword,
    AddBullet,
    RemoveBullet,
}

impl DirectiveOp {
    /// Operations that anchor on existing résumé text and therefore require
    /// a verbatim `original_text` match.
    pub fn requires_original(&self) -> bool {
        matches!(self, DirectiveOp::RewriteBullet | DirectiveOp::RemoveBullet)
    }
}

/// One surgical edit instruction. Every directive traces back to a specific
/// gap between the job profile and the résumé's current content — the
/// `justification` records that trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditDirective {
    pub target_section: String,
    pub operation: DirectiveOp,
    #[serde(default)]
    pub original_text: Option<String>,
    pub new_text: String,
    pub justification: String,
}

/// Ordered edit plan plus the count of directives the strategist dropped at
/// validation (reasoning output is adversarially imprecise and is
/// self-checked before the plan leaves the stage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditPlan {
    pub directives: Vec<EditDirective>,
    #[serde(default)]
    pub skipped_at_validation: u32,
}

/// Directive accounting for the refactor stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub applied: u32,
    pub skipped_at_validation: u32,
    pub failed_at_apply: u32,
}

/// Final résumé artifact: the tailored LaTeX plus directive accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailoredResume {
    pub latex: String,
    pub diff_summary: DiffSummary,
}
