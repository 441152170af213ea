//! Job Analyzer — fetches a job posting and extracts a `JobProfile`.
//!
//! Fetch failures propagate immediately (likely a permanent condition — the
//! caller must re-invoke with a corrected URL). Extraction is retried against
//! the same raw content up to the schema bound before `ExtractionError`.

use tracing::{info, warn};

use crate::errors::StageError;
use crate::fetch::Fetcher;
use crate::llm_client::{request_structured, LlmError, ReasoningService};
use crate::models::job::{JobProfile, JobProfileDraft};
use crate::models::run::StageStatus;
use crate::stages::prompts::{JOB_ANALYSIS_PROMPT_TEMPLATE, JOB_ANALYSIS_SYSTEM};

pub async fn run(
    fetcher: &dyn Fetcher,
    reasoning: &dyn ReasoningService,
    job_url: &str,
) -> Result<(JobProfile, StageStatus), StageError> {
    let content = fetcher
        .fetch(job_url)
        .await
        .map_err(|e| StageError::Fetch(e.to_string()))?;

    if content.trim().is_empty() {
        // No extractable text: a degraded profile, not a failure. Downstream
        // stages tolerate the empty collections.
        warn!("Job page yielded no extractable text: {}", job_url);
        return Ok((JobProfile::empty(job_url), StageStatus::Degraded));
    }

    info!("Fetched {} chars of job content", content.chars().count());

    let prompt = JOB_ANALYSIS_PROMPT_TEMPLATE.replace("{job_content}", &content);
    let draft: JobProfileDraft = request_structured(reasoning, JOB_ANALYSIS_SYSTEM, &prompt)
        .await
        .map_err(|e| match e {
            LlmError::Parse(inner) => {
                StageError::Extraction(format!("output did not match JobProfile schema: {inner}"))
            }
            other => StageError::Extraction(other.to_string()),
        })?;

    let profile = draft.into_profile(job_url);

    let status = if profile.keywords.is_empty() {
        warn!("Extraction produced no keywords — marking stage degraded");
        StageStatus::Degraded
    } else {
        StageStatus::Success
    };

    info!(
        "Job analyzed: '{}' @ '{}' ({} required skills, {} keywords)",
        profile.title,
        profile.company,
        profile.required_skills.len(),
        profile.keywords.len()
    );

    Ok((profile, status))
}
