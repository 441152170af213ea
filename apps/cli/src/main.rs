mod config;
mod errors;
mod fetch;
mod llm_client;
mod models;
mod pdf;
mod pipeline;
mod search;
mod services;
mod stages;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::fetch::HttpFetcher;
use crate::llm_client::LlmClient;
use crate::models::run::{RunStatus, RunSummary, StageStatus};
use crate::pipeline::store::{RunStore, COVER_LETTER_FILE, RUN_SUMMARY_FILE, TAILORED_RESUME_FILE};
use crate::pipeline::{Orchestrator, RunOptions};
use crate::search::TavilySearch;
use crate::services::Services;

/// Tailors a LaTeX résumé (and optionally a cover letter) to a job posting.
#[derive(Parser)]
#[command(name = "tailor")]
#[command(about = "Job application tailoring pipeline")]
struct Cli {
    /// Job posting URL, or path to a .txt/.md file with the job description
    /// (for sites that block scraping)
    #[arg(long)]
    url: String,

    /// Path to the source LaTeX résumé (.tex)
    #[arg(long)]
    resume: PathBuf,

    /// Directory for run output
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Also generate a cover letter
    #[arg(long)]
    cover_letter: bool,

    /// Run identifier; re-invoking with the same id resumes persisted stages.
    /// Defaults to a slug derived from the URL.
    #[arg(long)]
    run_id: Option<String>,

    /// Compile the tailored .tex artifacts to PDF via LaTeX.Online
    #[arg(long)]
    pdf: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let resume_latex = std::fs::read_to_string(&cli.resume)
        .with_context(|| format!("Failed to read resume file {}", cli.resume.display()))?;

    let run_id = cli.run_id.clone().unwrap_or_else(|| slug(&cli.url));
    info!("Run '{}' -> {}", run_id, cli.output_dir.display());

    let services = Services {
        reasoning: Arc::new(LlmClient::new(config.anthropic_api_key.clone())),
        search: Arc::new(TavilySearch::new(config.tavily_api_key.clone())),
        fetcher: Arc::new(HttpFetcher::new()),
    };

    let store = RunStore::open(&cli.output_dir, &run_id)?;
    let orchestrator = Orchestrator::new(
        services,
        store,
        RunOptions {
            cover_letter: cli.cover_letter,
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
        },
    );

    let mut summary = orchestrator.run(&cli.url, &resume_latex).await?;

    if cli.pdf && summary.status == RunStatus::Done {
        let store = orchestrator.store();
        let mut targets = vec![store.path(TAILORED_RESUME_FILE)];
        if store.path(COVER_LETTER_FILE).exists() {
            targets.push(store.path(COVER_LETTER_FILE));
        }
        for tex_path in targets {
            match pdf::compile_with_retry(&tex_path).await {
                Ok(pdf_path) => summary
                    .notes
                    .push(format!("compiled {}", pdf_path.display())),
                Err(e) => {
                    warn!("PDF compilation failed (the .tex is still saved): {e}");
                    summary
                        .notes
                        .push(format!("pdf compile failed for {}: {e}", tex_path.display()));
                }
            }
        }
        store.save_json(RUN_SUMMARY_FILE, &summary)?;
    }

    report(&summary);

    // Full success, partial success (cover letter failed after résumé
    // success), and failure must be distinguishable by exit signal.
    Ok(match (summary.status, summary.partial_success) {
        (RunStatus::Done, false) => ExitCode::SUCCESS,
        (RunStatus::Done, true) => ExitCode::from(2),
        (RunStatus::Failed, _) => ExitCode::FAILURE,
    })
}

fn report(summary: &RunSummary) {
    for stage in &summary.stages {
        let marker = match stage.status {
            StageStatus::Success => "ok",
            StageStatus::Degraded => "degraded",
            StageStatus::Failed => "FAILED",
        };
        let resumed = if stage.resumed { " (resumed)" } else { "" };
        match &stage.error_kind {
            Some(kind) => info!("{:<22} {}{} [{}]", stage.stage.as_str(), marker, resumed, kind),
            None => info!("{:<22} {}{}", stage.stage.as_str(), marker, resumed),
        }
    }
    if let Some(diff) = &summary.diff_summary {
        info!(
            "Directives: {} applied, {} skipped at validation, {} failed at apply",
            diff.applied, diff.skipped_at_validation, diff.failed_at_apply
        );
    }
    match (summary.status, summary.partial_success) {
        (RunStatus::Done, false) => info!("Run '{}' complete", summary.run_id),
        (RunStatus::Done, true) => {
            warn!("Run '{}' partial success: résumé done, cover letter failed", summary.run_id)
        }
        (RunStatus::Failed, _) => warn!("Run '{}' failed", summary.run_id),
    }
}

/// Deterministic run id from the job URL, so re-invoking the same command
/// resumes the same run directory.
fn slug(url: &str) -> String {
    let trimmed = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");

    let mut out = String::with_capacity(trimmed.len());
    let mut last_dash = true;
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let out = out.trim_end_matches('-').to_string();
    let truncated: String = out.chars().take(64).collect();
    let truncated = truncated.trim_end_matches('-').to_string();
    if truncated.is_empty() {
        "run".to_string()
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_strips_scheme_and_punctuation() {
        assert_eq!(
            slug("https://acme.example/jobs/123?ref=hn"),
            "acme-example-jobs-123-ref-hn"
        );
    }

    #[test]
    fn test_slug_is_deterministic_and_bounded() {
        let url = format!("https://acme.example/{}", "a/".repeat(200));
        let a = slug(&url);
        let b = slug(&url);
        assert_eq!(a, b);
        assert!(a.chars().count() <= 64);
        assert!(!a.ends_with('-'));
    }

    #[test]
    fn test_slug_of_file_path_is_usable() {
        assert_eq!(slug("./postings/staff_eng.txt"), "postings-staff-eng-txt");
    }

    #[test]
    fn test_slug_never_empty() {
        assert_eq!(slug("https://"), "run");
    }
}
