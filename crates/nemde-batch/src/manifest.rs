use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::job::BatchJobRecord;

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchManifest {
    pub created_at: DateTime<Utc>,
    /// Dispatch algorithm the batch ran with.
    pub task: String,
    pub num_jobs: usize,
    /// Intervals whose computed solution matched the historical record.
    pub success: usize,
    pub failure: usize,
    /// Job count per outcome label.
    pub outcomes: BTreeMap<String, usize>,
    pub jobs: Vec<BatchJobRecord>,
}

impl BatchManifest {
    pub fn from_records(task: &str, jobs: Vec<BatchJobRecord>) -> Self {
        let mut outcomes = BTreeMap::new();
        for record in &jobs {
            *outcomes.entry(record.status.label().to_string()).or_insert(0) += 1;
        }
        let success = jobs.iter().filter(|r| r.status.is_success()).count();
        Self {
            created_at: Utc::now(),
            task: task.to_string(),
            num_jobs: jobs.len(),
            success,
            failure: jobs.len() - success,
            outcomes,
            jobs,
        }
    }
}

pub fn write_batch_manifest(path: &Path, manifest: &BatchManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json =
        serde_json::to_string_pretty(manifest).context("serializing batch manifest to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing batch manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_batch_manifest(path: &Path) -> Result<BatchManifest> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening batch manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing batch manifest '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nemde_algo::OutcomeKind;
    use tempfile::NamedTempFile;

    fn record(job_id: &str, status: OutcomeKind) -> BatchJobRecord {
        BatchJobRecord {
            job_id: job_id.into(),
            case_id: job_id.into(),
            case_path: format!("{job_id}.json"),
            status,
            error: None,
            output: None,
            elapsed_ms: 3,
        }
    }

    #[test]
    fn counts_follow_outcomes() {
        let manifest = BatchManifest::from_records(
            "default",
            vec![
                record("a", OutcomeKind::ValidatedPass),
                record("b", OutcomeKind::ValidatedFail),
                record("c", OutcomeKind::InputError),
                record("d", OutcomeKind::ValidatedPass),
            ],
        );
        assert_eq!(manifest.num_jobs, 4);
        assert_eq!(manifest.success, 2);
        assert_eq!(manifest.failure, 2);
        assert_eq!(manifest.outcomes["validated_pass"], 2);
        assert_eq!(manifest.outcomes["input_error"], 1);
        assert!(!manifest.outcomes.contains_key("inconclusive"));
    }

    #[test]
    fn manifest_writes_and_reads_back() {
        let manifest =
            BatchManifest::from_records("dispatch_only", vec![record("s1", OutcomeKind::Solved)]);
        let tmp = NamedTempFile::new().unwrap();
        write_batch_manifest(tmp.path(), &manifest).unwrap();
        let parsed = load_batch_manifest(tmp.path()).unwrap();
        assert_eq!(parsed.task, "dispatch_only");
        assert_eq!(parsed.jobs[0].job_id, "s1");
        assert_eq!(parsed.jobs[0].status, OutcomeKind::Solved);
    }
}
