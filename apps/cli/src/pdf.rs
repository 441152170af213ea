//! Optional PDF compilation through the LaTeX.Online service.
//!
//! Runs after the pipeline reaches a terminal state and never affects it:
//! the `.tex` artifacts are already persisted, so a compile failure is
//! reported in the summary notes and nothing else.

use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

const LATEX_ONLINE_URL: &str = "https://latexonline.cc/compile";
const MAX_RETRIES: u32 = 2;
const RETRY_DELAY_SECS: u64 = 3;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("compilation failed: {0}")]
    Failed(String),
}

async fn compile_once(client: &Client, tex_path: &Path) -> Result<PathBuf, CompileError> {
    let source = std::fs::read_to_string(tex_path).map_err(|e| CompileError::Read {
        path: tex_path.display().to_string(),
        source: e,
    })?;

    let file_name = tex_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.tex".to_string());

    let part = Part::text(source)
        .file_name(file_name)
        .mime_str("application/x-tex")?;
    let form = Form::new().part("file", part);

    let response = client.post(LATEX_ONLINE_URL).multipart(form).send().await?;
    let status = response.status();
    let is_pdf = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/pdf"))
        .unwrap_or(false);

    if !status.is_success() || !is_pdf {
        let body = response.text().await.unwrap_or_default();
        let detail: String = body.chars().take(500).collect();
        return Err(CompileError::Failed(if detail.is_empty() {
            format!("HTTP {status}")
        } else {
            detail
        }));
    }

    let bytes = response.bytes().await?;
    let pdf_path = tex_path.with_extension("pdf");
    std::fs::write(&pdf_path, &bytes).map_err(|e| CompileError::Write {
        path: pdf_path.display().to_string(),
        source: e,
    })?;

    info!(
        "PDF compiled ({} KB) -> {}",
        bytes.len() / 1024,
        pdf_path.display()
    );
    Ok(pdf_path)
}

/// Compiles a `.tex` artifact to PDF with bounded retries for transient
/// network failures.
pub async fn compile_with_retry(tex_path: &Path) -> Result<PathBuf, CompileError> {
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .expect("Failed to build HTTP client");

    let mut last_error: Option<CompileError> = None;
    for attempt in 1..=MAX_RETRIES {
        match compile_once(&client, tex_path).await {
            Ok(path) => return Ok(path),
            Err(e) => {
                warn!("PDF compile attempt {attempt}/{MAX_RETRIES} failed: {e}");
                last_error = Some(e);
                if attempt < MAX_RETRIES {
                    tokio::time::sleep(std::time::Duration::from_secs(RETRY_DELAY_SECS)).await;
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| CompileError::Failed("no attempts made".to_string())))
}
