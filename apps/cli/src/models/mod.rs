// Write-once pipeline artifacts and run bookkeeping.
// Artifacts are produced exactly once per run, persisted as they appear,
// and never mutated afterwards.

pub mod brief;
pub mod job;
pub mod plan;
pub mod run;
