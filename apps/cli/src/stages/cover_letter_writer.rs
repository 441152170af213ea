//! Cover Letter Writer — drafts a LaTeX cover letter from all prior
//! artifacts. Greenfield document: no structural-preservation constraint.
//!
//! The reasoning call is retried within the schema bound when the output
//! fails the LaTeX sanity check; failure here never invalidates the
//! already-completed résumé artifacts (the orchestrator downgrades the run
//! to partial success).

use regex::Regex;
use tracing::{info, warn};

use crate::errors::StageError;
use crate::llm_client::{LlmError, ReasoningService, SCHEMA_RETRIES};
use crate::models::brief::CompanyBrief;
use crate::models::job::JobProfile;
use crate::models::plan::EditPlan;
use crate::stages::prompts::{COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM};

/// Brace-count slack tolerated in generated documents.
const BRACE_TOLERANCE: usize = 10;
const MAX_RESUME_SUMMARY_CHARS: usize = 3000;

pub async fn run(
    reasoning: &dyn ReasoningService,
    job: &JobProfile,
    brief: &CompanyBrief,
    plan: &EditPlan,
    tailored_latex: &str,
) -> Result<String, StageError> {
    let prompt = build_prompt(job, brief, plan, tailored_latex)?;

    let mut last_error: Option<String> = None;

    for attempt in 0..=SCHEMA_RETRIES {
        let raw = match reasoning.complete(COVER_LETTER_SYSTEM, &prompt).await {
            Ok(raw) => raw,
            Err(LlmError::EmptyContent) => {
                last_error = Some("empty reasoning output".to_string());
                continue;
            }
            Err(e) => return Err(StageError::CoverLetter(e.to_string())),
        };

        let letter = strip_latex_fences(&raw);
        if validate_latex(letter) {
            info!("Cover letter ready ({} chars)", letter.chars().count());
            return Ok(letter.to_string());
        }

        warn!(
            "Cover letter attempt {}/{} failed LaTeX sanity check",
            attempt + 1,
            SCHEMA_RETRIES + 1
        );
        last_error = Some("output failed LaTeX sanity check".to_string());
    }

    Err(StageError::CoverLetter(
        last_error.unwrap_or_else(|| "no attempts made".to_string()),
    ))
}

fn build_prompt(
    job: &JobProfile,
    brief: &CompanyBrief,
    plan: &EditPlan,
    tailored_latex: &str,
) -> Result<String, StageError> {
    let brief_json = serde_json::to_string_pretty(brief)
        .map_err(|e| StageError::CoverLetter(format!("failed to serialize brief: {e}")))?;

    let required_skills = job
        .required_skills
        .iter()
        .take(8)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    // The plan's justifications are the tailoring angle — they name the gaps
    // the application is built around.
    let edit_summary = plan
        .directives
        .iter()
        .take(6)
        .map(|d| format!("- {}", d.justification))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(COVER_LETTER_PROMPT_TEMPLATE
        .replace("{job_title}", &job.title)
        .replace("{company_name}", &job.company)
        .replace("{required_skills}", &required_skills)
        .replace("{company_brief_json}", &brief_json)
        .replace("{edit_summary}", &edit_summary)
        .replace("{resume_summary}", &extract_resume_summary(tailored_latex)))
}

/// Rough plain-text extraction from the tailored résumé, to give the
/// reasoning call candidate context without the LaTeX noise.
fn extract_resume_summary(latex: &str) -> String {
    let command = Regex::new(r"\\[a-zA-Z]+\*?(\[[^\]]*\])?").expect("valid regex");
    let text = command.replace_all(latex, " ");
    let text = text.replace(['{', '}', '\\'], " ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_RESUME_SUMMARY_CHARS).collect()
}

/// Basic sanity checks on a generated document: both document markers
/// present, brace counts within tolerance.
fn validate_latex(latex: &str) -> bool {
    let has_begin = latex.contains(r"\begin{document}");
    let has_end = latex.contains(r"\end{document}");
    let open = latex.matches('{').count();
    let close = latex.matches('}').count();
    let balanced = open.abs_diff(close) < BRACE_TOLERANCE;
    has_begin && has_end && balanced
}

/// Removes accidental ```latex / ```tex / ``` fences from reasoning output.
fn strip_latex_fences(text: &str) -> &str {
    let text = text.trim();
    for prefix in ["```latex", "```tex", "```"] {
        if let Some(stripped) = text.strip_prefix(prefix) {
            return stripped
                .trim_start()
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or_else(|| stripped.trim());
        }
    }
    text
}
