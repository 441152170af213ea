//! Resume Strategist — produces a surgical `EditPlan` from the job profile,
//! the company brief, and the source résumé.
//!
//! Reasoning output is adversarially imprecise and is self-checked before
//! the plan leaves this stage: anchored directives whose `original_text` is
//! not an exact substring of the source are dropped and counted, never
//! surfaced as a pipeline failure. An empty plan after validation is a
//! `StrategyError` — the run cannot proceed meaningfully.

use tracing::{info, warn};

use crate::errors::StageError;
use crate::llm_client::prompts::EXACT_QUOTE_INSTRUCTION;
use crate::llm_client::{request_structured, LlmError, ReasoningService};
use crate::models::brief::CompanyBrief;
use crate::models::job::JobProfile;
use crate::models::plan::{EditDirective, EditPlan};
use crate::stages::prompts::{STRATEGY_PROMPT_TEMPLATE, STRATEGY_SYSTEM};

pub async fn run(
    reasoning: &dyn ReasoningService,
    job: &JobProfile,
    brief: &CompanyBrief,
    resume_latex: &str,
) -> Result<EditPlan, StageError> {
    let prompt = build_prompt(job, brief, resume_latex)?;

    let directives: Vec<EditDirective> = request_structured(reasoning, STRATEGY_SYSTEM, &prompt)
        .await
        .map_err(|e| match e {
            LlmError::Parse(inner) => {
                StageError::Validation(format!("output did not match EditPlan schema: {inner}"))
            }
            other => StageError::Strategy(other.to_string()),
        })?;

    let proposed = directives.len();
    let plan = validate_plan(directives, resume_latex);

    info!(
        "Edit plan: {} directives kept, {} skipped at validation (of {} proposed)",
        plan.directives.len(),
        plan.skipped_at_validation,
        proposed
    );

    if plan.directives.is_empty() {
        return Err(StageError::Strategy(format!(
            "edit plan empty after validation ({proposed} proposed, all dropped)"
        )));
    }

    Ok(plan)
}

fn build_prompt(
    job: &JobProfile,
    brief: &CompanyBrief,
    resume_latex: &str,
) -> Result<String, StageError> {
    let job_json = serde_json::to_string_pretty(job)
        .map_err(|e| StageError::Strategy(format!("failed to serialize job profile: {e}")))?;
    let brief_json = serde_json::to_string_pretty(brief)
        .map_err(|e| StageError::Strategy(format!("failed to serialize company brief: {e}")))?;

    Ok(STRATEGY_PROMPT_TEMPLATE
        .replace("{exact_quote_instruction}", EXACT_QUOTE_INSTRUCTION)
        .replace("{job_profile_json}", &job_json)
        .replace("{company_brief_json}", &brief_json)
        .replace("{resume_latex}", resume_latex))
}

/// Drops anchored directives whose `original_text` is missing or not an
/// exact substring of the source résumé. The refactor stage re-verifies
/// against progressively mutated text; this pass catches the plainly wrong
/// ones before they are persisted.
fn validate_plan(directives: Vec<EditDirective>, resume_latex: &str) -> EditPlan {
    let mut kept = Vec::with_capacity(directives.len());
    let mut skipped_at_validation = 0u32;

    for directive in directives {
        if directive.operation.requires_original() {
            match directive.original_text.as_deref() {
                Some(original) if resume_latex.contains(original) => {}
                Some(original) => {
                    warn!(
                        "Dropping {:?} directive: original_text not found verbatim: {:?}",
                        directive.operation,
                        original.chars().take(60).collect::<String>()
                    );
                    skipped_at_validation += 1;
                    continue;
                }
                None => {
                    warn!(
                        "Dropping {:?} directive: original_text missing",
                        directive.operation
                    );
                    skipped_at_validation += 1;
                    continue;
                }
            }
        }
        kept.push(directive);
    }

    EditPlan {
        directives: kept,
        skipped_at_validation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeSet;

    use crate::models::plan::DirectiveOp;

    const RESUME: &str = r"\documentclass{article}
\begin{document}
\section{Experience}
\begin{itemize}
  \item Built internal tools using Python
  \item Maintained legacy PHP services
\end{itemize}
\end{document}";

    fn job() -> JobProfile {
        JobProfile {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            required_skills: BTreeSet::from(["Python".to_string()]),
            responsibilities: vec![],
            keywords: BTreeSet::from(["Python".to_string()]),
            raw_source_url: "https://acme.example/jobs/1".to_string(),
        }
    }

    struct FixedReasoning(String);

    #[async_trait]
    impl ReasoningService for FixedReasoning {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_valid_directives_survive_validation() {
        let response = r#"[{
            "target_section": "Experience",
            "operation": "REWRITE_BULLET",
            "original_text": "Built internal tools using Python",
            "new_text": "Engineered internal developer tools in Python",
            "justification": "Mirror JD tooling language"
        }]"#;
        let reasoning = FixedReasoning(response.to_string());

        let plan = run(&reasoning, &job(), &CompanyBrief::default(), RESUME)
            .await
            .unwrap();

        assert_eq!(plan.directives.len(), 1);
        assert_eq!(plan.skipped_at_validation, 0);
    }

    #[tokio::test]
    async fn test_mismatched_original_text_is_dropped_and_counted() {
        let response = r#"[
            {
                "target_section": "Experience",
                "operation": "REWRITE_BULLET",
                "original_text": "Built internal tools using Python",
                "new_text": "Engineered internal developer tools in Python",
                "justification": "Mirror JD language"
            },
            {
                "target_section": "Experience",
                "operation": "REMOVE_BULLET",
                "original_text": "This sentence is not in the resume",
                "new_text": "",
                "justification": "Irrelevant to JD"
            }
        ]"#;
        let reasoning = FixedReasoning(response.to_string());

        let plan = run(&reasoning, &job(), &CompanyBrief::default(), RESUME)
            .await
            .unwrap();

        assert_eq!(plan.directives.len(), 1);
        assert_eq!(plan.skipped_at_validation, 1);
        assert_eq!(plan.directives[0].operation, DirectiveOp::RewriteBullet);
    }

    #[tokio::test]
    async fn test_plan_empty_after_validation_is_strategy_error() {
        let response = r#"[{
            "target_section": "Experience",
            "operation": "REWRITE_BULLET",
            "original_text": "Nowhere to be found",
            "new_text": "irrelevant",
            "justification": "bad anchor"
        }]"#;
        let reasoning = FixedReasoning(response.to_string());

        let result = run(&reasoning, &job(), &CompanyBrief::default(), RESUME).await;
        match result {
            Err(e) => assert_eq!(e.kind(), "StrategyError"),
            Ok(_) => panic!("expected StrategyError"),
        }
    }

    #[tokio::test]
    async fn test_zero_proposed_directives_is_strategy_error() {
        let reasoning = FixedReasoning("[]".to_string());
        let result = run(&reasoning, &job(), &CompanyBrief::default(), RESUME).await;
        match result {
            Err(e) => assert_eq!(e.kind(), "StrategyError"),
            Ok(_) => panic!("expected StrategyError"),
        }
    }

    #[tokio::test]
    async fn test_add_bullet_needs_no_original_text() {
        let response = r#"[{
            "target_section": "Experience",
            "operation": "ADD_BULLET",
            "new_text": "Deployed services to Kubernetes",
            "justification": "JD requires Kubernetes; absent from resume"
        }]"#;
        let reasoning = FixedReasoning(response.to_string());

        let plan = run(&reasoning, &job(), &CompanyBrief::default(), RESUME)
            .await
            .unwrap();

        assert_eq!(plan.directives.len(), 1);
        assert_eq!(plan.skipped_at_validation, 0);
    }

    #[tokio::test]
    async fn test_anchored_directive_without_original_is_dropped() {
        let response = r#"[
            {
                "target_section": "Experience",
                "operation": "REMOVE_BULLET",
                "new_text": "",
                "justification": "missing anchor"
            },
            {
                "target_section": "Experience",
                "operation": "ADD_BULLET",
                "new_text": "Shipped Rust services",
                "justification": "JD requires Rust"
            }
        ]"#;
        let reasoning = FixedReasoning(response.to_string());

        let plan = run(&reasoning, &job(), &CompanyBrief::default(), RESUME)
            .await
            .unwrap();

        assert_eq!(plan.directives.len(), 1);
        assert_eq!(plan.skipped_at_validation, 1);
    }
}
