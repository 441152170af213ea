//! `JobProfile` — structured output of the job-analysis stage.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Structured profile of a job posting.
///
/// Invariant: `keywords` is a superset derivation of
/// `required_skills ∪ responsibilities` text — enforced by normalization in
/// `JobProfileDraft::into_profile`, not trusted from the reasoning call.
/// `BTreeSet` keeps persisted JSON byte-stable across reruns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProfile {
    pub title: String,
    pub company: String,
    pub required_skills: BTreeSet<String>,
    pub responsibilities: Vec<String>,
    /// Empty only when the source page yielded no extractable text; the
    /// stage result is then marked degraded.
    pub keywords: BTreeSet<String>,
    pub raw_source_url: String,
}

impl JobProfile {
    /// Profile for a posting that yielded no extractable text. Downstream
    /// stages tolerate the empty collections; the stage reports degraded.
    pub fn empty(raw_source_url: &str) -> Self {
        Self {
            title: String::new(),
            company: String::new(),
            required_skills: BTreeSet::new(),
            responsibilities: Vec::new(),
            keywords: BTreeSet::new(),
            raw_source_url: raw_source_url.to_string(),
        }
    }
}

/// Raw extraction schema returned by the reasoning call. The source URL and
/// the keyword-superset normalization are applied by the stage afterwards —
/// reasoning output is never trusted to uphold invariants on its own.
#[derive(Debug, Clone, Deserialize)]
pub struct JobProfileDraft {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub required_skills: BTreeSet<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

impl JobProfileDraft {
    pub fn into_profile(self, raw_source_url: &str) -> JobProfile {
        let mut keywords = self.keywords;
        // Superset invariant: every required skill is also a keyword.
        keywords.extend(self.required_skills.iter().cloned());

        JobProfile {
            title: self.title,
            company: self.company,
            required_skills: self.required_skills,
            responsibilities: self.responsibilities,
            keywords,
            raw_source_url: raw_source_url.to_string(),
        }
    }
}
