use anyhow::{Context, Result};
use nemde_algo::OutcomeKind;
use nemde_core::CasefilePatch;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One dispatch interval to run: a casefile on disk plus scenario patches.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub job_id: String,
    pub case_path: PathBuf,
    pub patches: Vec<CasefilePatch>,
}

impl BatchJob {
    pub fn new(case_path: impl Into<PathBuf>) -> Self {
        let case_path = case_path.into();
        let job_id = case_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| case_path.display().to_string());
        Self {
            job_id,
            case_path,
            patches: Vec::new(),
        }
    }

    pub fn with_patches(mut self, patches: Vec<CasefilePatch>) -> Self {
        self.patches = patches;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJobRecord {
    pub job_id: String,
    pub case_id: String,
    pub case_path: String,
    pub status: OutcomeKind,
    pub error: Option<String>,
    /// Directory holding `solution.json` / `report.json`, when written.
    pub output: Option<String>,
    pub elapsed_ms: u64,
}

pub fn jobs_from_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<BatchJob> {
    paths
        .iter()
        .map(|p| BatchJob::new(p.as_ref().to_path_buf()))
        .collect()
}

/// Every `*.json` casefile directly under `dir`, in file name order.
pub fn jobs_from_dir(dir: &Path) -> Result<Vec<BatchJob>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("reading casefile directory '{}'", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("listing '{}'", dir.display()))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(jobs_from_paths(&paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn job_id_is_the_file_stem() {
        let jobs = jobs_from_paths(&["cases/20201101001.json", "20201101002.json"]);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_id, "20201101001");
        assert_eq!(jobs[1].job_id, "20201101002");
        assert!(jobs[0].patches.is_empty());
    }

    #[test]
    fn directory_scan_keeps_json_in_name_order() {
        let dir = TempDir::new().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let jobs = jobs_from_dir(dir.path()).unwrap();
        let ids: Vec<_> = jobs.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
