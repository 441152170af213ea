//! Run bookkeeping: state-machine stages, per-stage results, run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StageError;
use crate::models::plan::DiffSummary;

/// Orchestrator state machine. Transitions fire only on the prior stage's
/// success or degraded result; `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Init,
    AnalyzingJob,
    ResearchingCompany,
    Strategizing,
    Refactoring,
    WritingCoverLetter,
    Done,
    Failed,
}

/// The five pipeline components, as named in summaries and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    JobAnalyzer,
    CompanyResearcher,
    ResumeStrategist,
    LatexRefactorer,
    CoverLetterWriter,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::JobAnalyzer => "job_analyzer",
            StageName::CompanyResearcher => "company_researcher",
            StageName::ResumeStrategist => "resume_strategist",
            StageName::LatexRefactorer => "latex_refactorer",
            StageName::CoverLetterWriter => "cover_letter_writer",
        }
    }
}

/// Outcome of one stage. `Degraded` is usable-but-incomplete output (empty
/// search results, keyword-less posting) — distinct from failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Degraded,
    Failed,
}

/// One entry in the run's stage ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageName,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when the stage was skipped because a valid persisted artifact
    /// already existed for this run.
    #[serde(default)]
    pub resumed: bool,
}

impl StageResult {
    pub fn completed(stage: StageName, status: StageStatus) -> Self {
        Self {
            stage,
            status,
            error_kind: None,
            error: None,
            resumed: false,
        }
    }

    pub fn resumed(stage: StageName) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            error_kind: None,
            error: None,
            resumed: true,
        }
    }

    pub fn failed(stage: StageName, err: &StageError) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            error_kind: Some(err.kind().to_string()),
            error: Some(err.to_string()),
            resumed: false,
        }
    }
}

/// Terminal run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Done,
    Failed,
}

/// Persisted run summary: per-stage statuses, directive accounting, and the
/// partial-success marker (résumé done, cover letter failed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub partial_success: bool,
    pub current_stage: PipelineStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<DiffSummary>,
    pub stages: Vec<StageResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}
