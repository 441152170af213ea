use thiserror::Error;

/// Stage-level error taxonomy.
///
/// Each pipeline stage raises exactly one of these kinds; the orchestrator
/// converts a raised kind into a `FAILED` stage result (and, for every stage
/// except the cover letter, a failed run). The `kind()` label is what lands
/// in the run summary, so it is stable and never derived from `Display`.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("job extraction failed: {0}")]
    Extraction(String),

    #[error("company research failed: {0}")]
    Research(String),

    #[error("strategy failed: {0}")]
    Strategy(String),

    #[error("refactor failed: {0}")]
    Refactor(String),

    #[error("cover letter failed: {0}")]
    CoverLetter(String),

    #[error("stage timed out after {0}s")]
    Timeout(u64),

    #[error("reasoning output failed schema validation: {0}")]
    Validation(String),
}

impl StageError {
    /// Stable error-kind label for run summaries and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Fetch(_) => "FetchError",
            StageError::Extraction(_) => "ExtractionError",
            StageError::Research(_) => "ResearchError",
            StageError::Strategy(_) => "StrategyError",
            StageError::Refactor(_) => "RefactorError",
            StageError::CoverLetter(_) => "CoverLetterError",
            StageError::Timeout(_) => "TimeoutError",
            StageError::Validation(_) => "ValidationError",
        }
    }
}
