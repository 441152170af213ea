//! Company Researcher — issues targeted searches for the posting's company
//! and synthesizes a `CompanyBrief` from the returned snippets.
//!
//! Zero search results is a degraded outcome, not a failure: the stage
//! returns an empty brief and the pipeline proceeds. `ResearchError` is
//! reserved for the search provider itself erroring after its retry budget.

use tracing::{info, warn};

use crate::errors::StageError;
use crate::llm_client::{request_structured, LlmError, ReasoningService};
use crate::models::brief::CompanyBrief;
use crate::models::job::JobProfile;
use crate::models::run::StageStatus;
use crate::search::{SearchHit, SearchService};
use crate::stages::prompts::{RESEARCH_PROMPT_TEMPLATE, RESEARCH_SYSTEM};

/// Synthesis context caps, matching what fits comfortably in one call.
const MAX_UNIQUE_HITS: usize = 10;
const MAX_SNIPPET_CHARS: usize = 600;

pub async fn run(
    search: &dyn SearchService,
    reasoning: &dyn ReasoningService,
    job: &JobProfile,
) -> Result<(CompanyBrief, StageStatus), StageError> {
    if job.company.is_empty() {
        warn!("No company name in job profile — research degraded to empty brief");
        return Ok((CompanyBrief::default(), StageStatus::Degraded));
    }

    let hits = gather_hits(search, job).await?;

    if hits.is_empty() {
        warn!("Search returned zero results for '{}'", job.company);
        return Ok((CompanyBrief::default(), StageStatus::Degraded));
    }

    info!("Found {} unique sources for '{}'", hits.len(), job.company);

    let prompt = RESEARCH_PROMPT_TEMPLATE
        .replace("{company_name}", &job.company)
        .replace("{search_results}", &format_hits(&hits));

    let brief: CompanyBrief = request_structured(reasoning, RESEARCH_SYSTEM, &prompt)
        .await
        .map_err(|e| match e {
            LlmError::Parse(inner) => {
                StageError::Validation(format!("output did not match CompanyBrief schema: {inner}"))
            }
            other => StageError::Research(other.to_string()),
        })?;

    let status = if brief.is_empty() {
        StageStatus::Degraded
    } else {
        StageStatus::Success
    };

    Ok((brief, status))
}

/// Runs the targeted query set, deduplicates by URL, caps the total.
async fn gather_hits(
    search: &dyn SearchService,
    job: &JobProfile,
) -> Result<Vec<SearchHit>, StageError> {
    let mut queries = vec![
        format!("{} company overview mission products", job.company),
        format!("{} engineering culture tech stack", job.company),
        format!("{} recent news", job.company),
    ];
    // Tech hints from the posting sharpen the culture query when present.
    if let Some(skill) = job.required_skills.iter().next() {
        queries.push(format!("{} {} engineering", job.company, skill));
    }

    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::new();

    for query in &queries {
        let hits = search
            .search(query)
            .await
            .map_err(|e| StageError::Research(e.to_string()))?;
        for hit in hits {
            if seen.insert(hit.source_url.clone()) {
                unique.push(hit);
            }
        }
    }

    unique.truncate(MAX_UNIQUE_HITS);
    Ok(unique)
}

fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let snippet: String = hit.snippet.chars().take(MAX_SNIPPET_CHARS).collect();
            format!("[{}] {}\n{}", i + 1, hit.source_url, snippet)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::search::SearchError;

    fn job_profile(company: &str) -> JobProfile {
        JobProfile {
            title: "Engineer".to_string(),
            company: company.to_string(),
            required_skills: BTreeSet::from(["Rust".to_string()]),
            responsibilities: vec![],
            keywords: BTreeSet::from(["Rust".to_string()]),
            raw_source_url: "https://acme.example/jobs/1".to_string(),
        }
    }

    struct EmptySearch;

    #[async_trait]
    impl SearchService for EmptySearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, SearchError> {
            Ok(vec![])
        }
    }

    struct DupSearch;

    #[async_trait]
    impl SearchService for DupSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, SearchError> {
            // Same URL every call — dedup must collapse to one hit
            Ok(vec![SearchHit {
                title: "About Acme".to_string(),
                snippet: "Acme builds shipping software.".to_string(),
                source_url: "https://acme.example/about".to_string(),
            }])
        }
    }

    struct ErroringSearch;

    #[async_trait]
    impl SearchService for ErroringSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, SearchError> {
            Err(SearchError::Auth(401))
        }
    }

    struct CountingReasoning {
        response: &'static str,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ReasoningService for CountingReasoning {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.to_string())
        }
    }

    const BRIEF_JSON: &str = r#"{
        "mission": "Make shipping boring.",
        "tech_stack": ["Rust"],
        "culture_notes": ["Small teams"],
        "recent_news": []
    }"#;

    #[tokio::test]
    async fn test_zero_results_yields_degraded_never_failed() {
        let reasoning = CountingReasoning {
            response: BRIEF_JSON,
            calls: AtomicU32::new(0),
        };
        let (brief, status) = run(&EmptySearch, &reasoning, &job_profile("Acme"))
            .await
            .unwrap();

        assert_eq!(status, StageStatus::Degraded);
        assert!(brief.is_empty());
        // No synthesis call without snippets to synthesize from
        assert_eq!(reasoning.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hits_are_deduplicated_and_synthesized() {
        let reasoning = CountingReasoning {
            response: BRIEF_JSON,
            calls: AtomicU32::new(0),
        };
        let (brief, status) = run(&DupSearch, &reasoning, &job_profile("Acme"))
            .await
            .unwrap();

        assert_eq!(status, StageStatus::Success);
        assert_eq!(brief.mission, "Make shipping boring.");
        assert_eq!(reasoning.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_error_raises_research_error() {
        let reasoning = CountingReasoning {
            response: BRIEF_JSON,
            calls: AtomicU32::new(0),
        };
        let result = run(&ErroringSearch, &reasoning, &job_profile("Acme")).await;

        match result {
            Err(e) => assert_eq!(e.kind(), "ResearchError"),
            Ok(_) => panic!("expected ResearchError"),
        }
    }

    #[tokio::test]
    async fn test_missing_company_name_short_circuits_to_degraded() {
        let reasoning = CountingReasoning {
            response: BRIEF_JSON,
            calls: AtomicU32::new(0),
        };
        let (brief, status) = run(&DupSearch, &reasoning, &job_profile(""))
            .await
            .unwrap();

        assert_eq!(status, StageStatus::Degraded);
        assert!(brief.is_empty());
    }

    #[test]
    fn test_format_hits_clips_snippets() {
        let hits = vec![SearchHit {
            title: "t".to_string(),
            snippet: "x".repeat(2000),
            source_url: "https://a.example".to_string(),
        }];
        let formatted = format_hits(&hits);
        assert!(formatted.len() < 700);
        assert!(formatted.starts_with("[1] https://a.example"));
    }
}
