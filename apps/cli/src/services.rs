use std::sync::Arc;

use crate::fetch::Fetcher;
use crate::llm_client::ReasoningService;
use crate::search::SearchService;

/// External collaborators injected into the orchestrator.
///
/// Everything non-deterministic lives behind these three capabilities, so a
/// test run substitutes mocks returning canned structured data and the
/// pipeline itself stays deterministic.
#[derive(Clone)]
pub struct Services {
    pub reasoning: Arc<dyn ReasoningService>,
    pub search: Arc<dyn SearchService>,
    pub fetcher: Arc<dyn Fetcher>,
}
