//! Run store — the run directory is the source of truth for "stage already
//! done". Artifacts are written atomically (temp file + rename) and only on
//! full stage success, so a crash never leaves a partial artifact for the
//! failing stage. Loads validate content, not mere file existence.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::brief::CompanyBrief;
use crate::models::job::JobProfile;
use crate::models::plan::EditPlan;
use crate::models::run::RunSummary;

pub const JOB_PROFILE_FILE: &str = "job_profile.json";
pub const COMPANY_BRIEF_FILE: &str = "company_brief.json";
pub const EDIT_PLAN_FILE: &str = "edit_plan.json";
pub const TAILORED_RESUME_FILE: &str = "tailored_resume.tex";
pub const COVER_LETTER_FILE: &str = "cover_letter.tex";
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Artifact storage for one run.
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    /// Opens (creating if needed) the run directory `<root>/<run_id>`.
    pub fn open(root: &Path, run_id: &str) -> Result<Self, StoreError> {
        let dir = root.join(run_id);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Atomic write: content lands under the final name only when complete.
    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let io_err = |e: std::io::Error| StoreError::Io {
            path: self.path(name).display().to_string(),
            source: e,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.persist(self.path(name))
            .map_err(|e| io_err(e.error))?;

        debug!("Persisted {}", self.path(name).display());
        Ok(())
    }

    pub fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');
        self.write_atomic(name, &bytes)
    }

    pub fn save_text(&self, name: &str, text: &str) -> Result<(), StoreError> {
        self.write_atomic(name, text.as_bytes())
    }

    /// Loads a JSON artifact if it exists and parses into its schema.
    /// Anything unreadable or schema-invalid counts as absent — the stage
    /// will be re-run rather than trusted.
    fn load_json_valid<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.path(name);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    "Ignoring invalid artifact {} ({e}) — stage will re-run",
                    path.display()
                );
                None
            }
        }
    }

    /// Loads a `.tex` artifact if it exists and passes the structural sanity
    /// check (both document markers present).
    fn load_tex_valid(&self, name: &str) -> Option<String> {
        let path = self.path(name);
        let text = std::fs::read_to_string(&path).ok()?;
        if text.contains(r"\begin{document}") && text.contains(r"\end{document}") {
            Some(text)
        } else {
            warn!(
                "Ignoring invalid artifact {} (missing document markers) — stage will re-run",
                path.display()
            );
            None
        }
    }

    pub fn load_job_profile(&self) -> Option<JobProfile> {
        self.load_json_valid(JOB_PROFILE_FILE)
    }

    pub fn load_company_brief(&self) -> Option<CompanyBrief> {
        self.load_json_valid(COMPANY_BRIEF_FILE)
    }

    pub fn load_edit_plan(&self) -> Option<EditPlan> {
        self.load_json_valid(EDIT_PLAN_FILE)
    }

    pub fn load_tailored_resume(&self) -> Option<String> {
        self.load_tex_valid(TAILORED_RESUME_FILE)
    }

    pub fn load_cover_letter(&self) -> Option<String> {
        self.load_tex_valid(COVER_LETTER_FILE)
    }

    pub fn load_summary(&self) -> Option<RunSummary> {
        self.load_json_valid(RUN_SUMMARY_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn store() -> (tempfile::TempDir, RunStore) {
        let root = tempfile::tempdir().unwrap();
        let store = RunStore::open(root.path(), "acme-jobs-1").unwrap();
        (root, store)
    }

    fn profile() -> JobProfile {
        JobProfile {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            required_skills: BTreeSet::from(["Rust".to_string()]),
            responsibilities: vec!["Ship".to_string()],
            keywords: BTreeSet::from(["Rust".to_string()]),
            raw_source_url: "https://acme.example/jobs/1".to_string(),
        }
    }

    #[test]
    fn test_json_artifact_round_trips() {
        let (_root, store) = store();
        store.save_json(JOB_PROFILE_FILE, &profile()).unwrap();

        let loaded = store.load_job_profile().unwrap();
        assert_eq!(loaded.company, "Acme");
    }

    #[test]
    fn test_missing_artifact_loads_as_none() {
        let (_root, store) = store();
        assert!(store.load_job_profile().is_none());
        assert!(store.load_tailored_resume().is_none());
    }

    #[test]
    fn test_schema_invalid_artifact_counts_as_absent() {
        let (_root, store) = store();
        std::fs::write(store.path(JOB_PROFILE_FILE), br#"{"title": 42}"#).unwrap();
        assert!(store.load_job_profile().is_none());
    }

    #[test]
    fn test_tex_without_document_markers_counts_as_absent() {
        let (_root, store) = store();
        std::fs::write(store.path(TAILORED_RESUME_FILE), "just some text").unwrap();
        assert!(store.load_tailored_resume().is_none());

        let valid = "\\begin{document}x\\end{document}";
        store.save_text(TAILORED_RESUME_FILE, valid).unwrap();
        assert_eq!(store.load_tailored_resume().unwrap(), valid);
    }

    #[test]
    fn test_save_overwrites_atomically() {
        let (_root, store) = store();
        store.save_text(COVER_LETTER_FILE, "first").unwrap();
        store.save_text(COVER_LETTER_FILE, "second").unwrap();
        let text = std::fs::read_to_string(store.path(COVER_LETTER_FILE)).unwrap();
        assert_eq!(text, "second");
        // No temp files left behind
        let leftovers = std::fs::read_dir(store.dir())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_open_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        RunStore::open(root.path(), "run-1").unwrap();
        let again = RunStore::open(root.path(), "run-1").unwrap();
        assert!(again.dir().ends_with("run-1"));
    }
}
