use crate::job::{BatchJob, BatchJobRecord};
use crate::manifest::{write_batch_manifest, BatchManifest};
use anyhow::{Context, Result};
use nemde_algo::{run_casefile, CancelFlag, DispatchConfig, IntervalOutcome};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct BatchRunnerConfig {
    pub jobs: Vec<BatchJob>,
    pub output_root: PathBuf,
    pub dispatch: DispatchConfig,
    /// Worker count; 0 uses every available core.
    pub threads: usize,
    pub cancel: CancelFlag,
}

impl BatchRunnerConfig {
    pub fn new(jobs: Vec<BatchJob>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            jobs,
            output_root: output_root.into(),
            dispatch: DispatchConfig::default(),
            threads: 0,
            cancel: CancelFlag::new(),
        }
    }
}

pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<BatchJobRecord>,
}

pub fn run_batch(config: &BatchRunnerConfig) -> Result<BatchSummary> {
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating batch output root '{}'",
            config.output_root.display()
        )
    })?;

    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for batch runs")?;
    info!(
        jobs = config.jobs.len(),
        threads = thread_count,
        "batch started"
    );

    // Intervals share nothing but the read-only config; order is restored by collect.
    let job_records: Vec<BatchJobRecord> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_job(job, config))
            .collect()
    });

    let manifest = BatchManifest::from_records(&config.dispatch.algorithm.to_string(), job_records);
    let manifest_path = config.output_root.join("batch_manifest.json");
    write_batch_manifest(&manifest_path, &manifest)?;
    info!(
        success = manifest.success,
        failure = manifest.failure,
        manifest = %manifest_path.display(),
        "batch finished"
    );
    Ok(BatchSummary {
        success: manifest.success,
        failure: manifest.failure,
        manifest_path,
        jobs: manifest.jobs,
    })
}

/// Run one interval and persist its solution and validation report under
/// `<output_root>/<case_id>/`.
fn run_job(job: &BatchJob, config: &BatchRunnerConfig) -> BatchJobRecord {
    let outcome = run_casefile(&job.case_path, &job.patches, &config.dispatch, &config.cancel);
    let case_id = if outcome.case_id.is_empty() {
        job.job_id.clone()
    } else {
        outcome.case_id.clone()
    };
    let out_dir = config.output_root.join(&case_id);

    let mut error = outcome.error.clone();
    let output = match write_outputs(&out_dir, &outcome) {
        Ok(true) => Some(out_dir.display().to_string()),
        Ok(false) => None,
        Err(err) => {
            warn!(job = %job.job_id, error = %err, "could not write interval outputs");
            error = Some(format!("{err:#}"));
            None
        }
    };
    if let Some(message) = &error {
        warn!(job = %job.job_id, outcome = %outcome.kind, error = %message, "batch job did not validate");
    }

    BatchJobRecord {
        job_id: job.job_id.clone(),
        case_id,
        case_path: job.case_path.display().to_string(),
        status: outcome.kind,
        error,
        output,
        elapsed_ms: outcome.elapsed_ms,
    }
}

fn write_outputs(dir: &Path, outcome: &IntervalOutcome) -> Result<bool> {
    if outcome.solution.is_none() && outcome.report.is_none() {
        return Ok(false);
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("creating interval output '{}'", dir.display()))?;
    if let Some(solution) = &outcome.solution {
        write_json(&dir.join("solution.json"), solution)?;
    }
    if let Some(report) = &outcome.report {
        write_json(&dir.join("report.json"), report)?;
    }
    Ok(true)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing '{}'", path.display()))?;
    fs::write(path, json).with_context(|| format!("writing '{}'", path.display()))
}
