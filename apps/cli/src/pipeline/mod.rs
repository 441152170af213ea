//! Orchestrator — drives the five stages in dependency order, persists each
//! artifact as it is produced, enforces the per-stage failure policy, and
//! assembles the run summary.
//!
//! Flow: ANALYZING_JOB → RESEARCHING_COMPANY → STRATEGIZING → REFACTORING →
//! [WRITING_COVER_LETTER] → DONE, with FAILED absorbing from any non-terminal
//! state. Transitions fire only on success or degraded results; no stage is
//! skipped optimistically — downstream stages require upstream artifacts.
//!
//! The run directory is the source of truth for resumability: a stage whose
//! artifact is already persisted and valid is skipped without re-invoking
//! external services.

pub mod store;

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::errors::StageError;
use crate::models::brief::CompanyBrief;
use crate::models::job::JobProfile;
use crate::models::plan::{DiffSummary, EditPlan};
use crate::models::run::{
    PipelineStage, RunStatus, RunSummary, StageName, StageResult, StageStatus,
};
use crate::services::Services;
use crate::stages::{
    company_researcher, cover_letter_writer, job_analyzer, latex_refactorer, resume_strategist,
};
use store::{
    RunStore, StoreError, COMPANY_BRIEF_FILE, COVER_LETTER_FILE, EDIT_PLAN_FILE, JOB_PROFILE_FILE,
    RUN_SUMMARY_FILE, TAILORED_RESUME_FILE,
};

/// Per-run configuration.
pub struct RunOptions {
    pub cover_letter: bool,
    /// Budget applied to each stage including its internal retries.
    pub stage_timeout: Duration,
}

/// Aggregate state threading through the stages. Owned exclusively by the
/// orchestrator; the pipeline is strictly sequential so nothing here is ever
/// touched concurrently.
struct PipelineRun {
    run_id: String,
    current_stage: PipelineStage,
    stages: Vec<StageResult>,
    job_profile: Option<JobProfile>,
    company_brief: Option<CompanyBrief>,
    edit_plan: Option<EditPlan>,
    tailored_latex: Option<String>,
    diff_summary: Option<DiffSummary>,
    started_at: DateTime<Utc>,
}

impl PipelineRun {
    fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            current_stage: PipelineStage::Init,
            stages: Vec::new(),
            job_profile: None,
            company_brief: None,
            edit_plan: None,
            tailored_latex: None,
            diff_summary: None,
            started_at: Utc::now(),
        }
    }
}

pub struct Orchestrator {
    services: Services,
    store: RunStore,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(services: Services, store: RunStore, options: RunOptions) -> Self {
        Self {
            services,
            store,
            options,
        }
    }

    /// Runs (or resumes) the pipeline to a terminal state. Stage failures
    /// land in the returned summary; only infrastructure failures (the store
    /// itself) escape as errors.
    pub async fn run(&self, job_url: &str, resume_latex: &str) -> Result<RunSummary, StoreError> {
        let mut run = PipelineRun::new(self.run_id());
        let prior_diff = self.store.load_summary().and_then(|s| s.diff_summary);

        // ── ANALYZING_JOB ───────────────────────────────────────────────
        run.current_stage = PipelineStage::AnalyzingJob;
        if let Some(profile) = self.store.load_job_profile() {
            info!("Resuming: {JOB_PROFILE_FILE} already valid — skipping job analysis");
            run.stages.push(StageResult::resumed(StageName::JobAnalyzer));
            run.job_profile = Some(profile);
        } else {
            info!("[1/5] Job Analyzer: fetching and analyzing {job_url}");
            let outcome = self
                .bounded(job_analyzer::run(
                    self.services.fetcher.as_ref(),
                    self.services.reasoning.as_ref(),
                    job_url,
                ))
                .await;
            match outcome {
                Ok((profile, status)) => {
                    self.store.save_json(JOB_PROFILE_FILE, &profile)?;
                    run.stages
                        .push(StageResult::completed(StageName::JobAnalyzer, status));
                    run.job_profile = Some(profile);
                }
                Err(e) => return self.fail(run, StageName::JobAnalyzer, e),
            }
        }
        let job_profile = run.job_profile.clone().expect("set above");

        // ── RESEARCHING_COMPANY ─────────────────────────────────────────
        run.current_stage = PipelineStage::ResearchingCompany;
        if let Some(brief) = self.store.load_company_brief() {
            info!("Resuming: {COMPANY_BRIEF_FILE} already valid — skipping research");
            run.stages
                .push(StageResult::resumed(StageName::CompanyResearcher));
            run.company_brief = Some(brief);
        } else {
            info!(
                "[2/5] Company Researcher: researching '{}'",
                job_profile.company
            );
            let outcome = self
                .bounded(company_researcher::run(
                    self.services.search.as_ref(),
                    self.services.reasoning.as_ref(),
                    &job_profile,
                ))
                .await;
            match outcome {
                Ok((brief, status)) => {
                    self.store.save_json(COMPANY_BRIEF_FILE, &brief)?;
                    run.stages
                        .push(StageResult::completed(StageName::CompanyResearcher, status));
                    run.company_brief = Some(brief);
                }
                Err(e) => return self.fail(run, StageName::CompanyResearcher, e),
            }
        }
        let company_brief = run.company_brief.clone().expect("set above");

        // ── STRATEGIZING ────────────────────────────────────────────────
        run.current_stage = PipelineStage::Strategizing;
        if let Some(plan) = self.store.load_edit_plan() {
            info!("Resuming: {EDIT_PLAN_FILE} already valid — skipping strategy");
            run.stages
                .push(StageResult::resumed(StageName::ResumeStrategist));
            run.edit_plan = Some(plan);
        } else {
            info!("[3/5] Resume Strategist: planning tailoring strategy");
            let outcome = self
                .bounded(resume_strategist::run(
                    self.services.reasoning.as_ref(),
                    &job_profile,
                    &company_brief,
                    resume_latex,
                ))
                .await;
            match outcome {
                Ok(plan) => {
                    self.store.save_json(EDIT_PLAN_FILE, &plan)?;
                    run.stages
                        .push(StageResult::completed(StageName::ResumeStrategist, StageStatus::Success));
                    run.edit_plan = Some(plan);
                }
                Err(e) => return self.fail(run, StageName::ResumeStrategist, e),
            }
        }
        let edit_plan = run.edit_plan.clone().expect("set above");

        // ── REFACTORING ─────────────────────────────────────────────────
        run.current_stage = PipelineStage::Refactoring;
        if let Some(latex) = self.store.load_tailored_resume() {
            info!("Resuming: {TAILORED_RESUME_FILE} already valid — skipping refactor");
            run.stages
                .push(StageResult::resumed(StageName::LatexRefactorer));
            run.tailored_latex = Some(latex);
            run.diff_summary = prior_diff;
        } else {
            info!(
                "[4/5] LaTeX Refactorer: applying {} directives",
                edit_plan.directives.len()
            );
            // Directive application is deterministic and local; the timeout
            // wrapper keeps the stage contract uniform anyway.
            let outcome = self
                .bounded(async { latex_refactorer::run(&edit_plan, resume_latex) })
                .await;
            match outcome {
                Ok(tailored) => {
                    self.store.save_text(TAILORED_RESUME_FILE, &tailored.latex)?;
                    run.stages
                        .push(StageResult::completed(StageName::LatexRefactorer, StageStatus::Success));
                    run.tailored_latex = Some(tailored.latex);
                    run.diff_summary = Some(tailored.diff_summary);
                }
                Err(e) => return self.fail(run, StageName::LatexRefactorer, e),
            }
        }
        let tailored_latex = run.tailored_latex.clone().expect("set above");

        // ── WRITING_COVER_LETTER (optional branch) ──────────────────────
        let mut partial_success = false;
        if self.options.cover_letter {
            run.current_stage = PipelineStage::WritingCoverLetter;
            if self.store.load_cover_letter().is_some() {
                info!("Resuming: {COVER_LETTER_FILE} already valid — skipping cover letter");
                run.stages
                    .push(StageResult::resumed(StageName::CoverLetterWriter));
            } else {
                info!("[5/5] Cover Letter Writer: drafting cover letter");
                let outcome = self
                    .bounded(cover_letter_writer::run(
                        self.services.reasoning.as_ref(),
                        &job_profile,
                        &company_brief,
                        &edit_plan,
                        &tailored_latex,
                    ))
                    .await;
                match outcome {
                    Ok(letter) => {
                        self.store.save_text(COVER_LETTER_FILE, &letter)?;
                        run.stages.push(StageResult::completed(
                            StageName::CoverLetterWriter,
                            StageStatus::Success,
                        ));
                    }
                    // Cover-letter failure never invalidates the completed
                    // résumé artifacts: the run finishes as partial success.
                    Err(e) => {
                        warn!("Cover letter failed ({}): résumé artifacts are unaffected", e.kind());
                        run.stages
                            .push(StageResult::failed(StageName::CoverLetterWriter, &e));
                        partial_success = true;
                    }
                }
            }
        }

        // ── DONE ────────────────────────────────────────────────────────
        run.current_stage = PipelineStage::Done;
        let summary = RunSummary {
            run_id: run.run_id.clone(),
            status: RunStatus::Done,
            partial_success,
            current_stage: run.current_stage,
            diff_summary: run.diff_summary,
            stages: run.stages,
            started_at: run.started_at,
            finished_at: Utc::now(),
            notes: vec![],
        };
        self.store.save_json(RUN_SUMMARY_FILE, &summary)?;
        info!("Pipeline complete: artifacts in {}", self.store.dir().display());
        Ok(summary)
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    fn run_id(&self) -> &str {
        self.store
            .dir()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("run")
    }

    /// Applies the per-stage timeout budget, covering the stage's internal
    /// retries. Expiry is a `TimeoutError`, handled like any stage failure.
    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, StageError>>,
    ) -> Result<T, StageError> {
        match timeout(self.options.stage_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StageError::Timeout(self.options.stage_timeout.as_secs())),
        }
    }

    /// Converts a required-stage failure into the absorbing FAILED state:
    /// records the result, persists the summary, halts further stages. All
    /// artifacts produced before the failure point stay on disk; nothing is
    /// written for the failing stage itself.
    fn fail(
        &self,
        mut run: PipelineRun,
        stage: StageName,
        err: StageError,
    ) -> Result<RunSummary, StoreError> {
        error!("Stage {} failed: {} ({})", stage.as_str(), err, err.kind());
        run.stages.push(StageResult::failed(stage, &err));

        // status=failed is the absorbing state; current_stage records where
        // the run stopped.
        let summary = RunSummary {
            run_id: run.run_id.clone(),
            status: RunStatus::Failed,
            partial_success: false,
            current_stage: run.current_stage,
            diff_summary: run.diff_summary,
            stages: run.stages,
            started_at: run.started_at,
            finished_at: Utc::now(),
            notes: vec![],
        };
        self.store.save_json(RUN_SUMMARY_FILE, &summary)?;
        Ok(summary)
    }
}
