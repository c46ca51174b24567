use std::path::{Path, PathBuf};

use anyhow::Result;
use nemde_algo::DispatchConfig;
use nemde_batch::{jobs_from_dir, jobs_from_paths, run_batch, BatchJob, BatchRunnerConfig};
use tracing::info;

/// Expand directories to the casefiles they contain, keeping argument order.
pub fn collect_jobs(inputs: &[PathBuf]) -> Result<Vec<BatchJob>> {
    let mut jobs = Vec::new();
    for input in inputs {
        if input.is_dir() {
            jobs.extend(jobs_from_dir(input)?);
        } else {
            jobs.extend(jobs_from_paths(std::slice::from_ref(input)));
        }
    }
    Ok(jobs)
}

pub fn handle(
    inputs: &[PathBuf],
    out: &Path,
    threads: usize,
    dispatch: DispatchConfig,
) -> Result<()> {
    let jobs = collect_jobs(inputs)?;
    if jobs.is_empty() {
        anyhow::bail!("no casefiles found in the given inputs");
    }
    let mut config = BatchRunnerConfig::new(jobs, out);
    config.threads = threads;
    config.dispatch = dispatch;

    let summary = run_batch(&config)?;
    info!(manifest = %summary.manifest_path.display(), "batch manifest written");
    println!(
        "Batch: {} ok, {} failed (manifest {})",
        summary.success,
        summary.failure,
        summary.manifest_path.display()
    );
    Ok(())
}
