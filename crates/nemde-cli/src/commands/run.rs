use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use nemde_algo::{run_casefile, CancelFlag, DispatchConfig, IntervalOutcome, OutcomeKind};
use nemde_core::CasefilePatch;
use tabwriter::TabWriter;

use nemde_cli::OutputFormat;

/// Failed fields listed in plain output before truncating.
const MAX_LISTED_FAILURES: usize = 20;

pub fn handle(
    path: &Path,
    patches: &[CasefilePatch],
    out: Option<&Path>,
    format: OutputFormat,
    config: &DispatchConfig,
) -> Result<OutcomeKind> {
    let outcome = run_casefile(path, patches, config, &CancelFlag::new());

    if let Some(dir) = out {
        write_outputs(dir, &outcome)?;
    }
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("serializing interval outcome")?
            );
        }
        OutputFormat::Plain => print_outcome(&outcome)?,
    }
    Ok(outcome.kind)
}

fn write_outputs(dir: &Path, outcome: &IntervalOutcome) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating '{}'", dir.display()))?;
    if let Some(solution) = &outcome.solution {
        let path = dir.join("solution.json");
        fs::write(&path, serde_json::to_string_pretty(solution)?)
            .with_context(|| format!("writing '{}'", path.display()))?;
    }
    if let Some(report) = &outcome.report {
        let path = dir.join("report.json");
        fs::write(&path, serde_json::to_string_pretty(report)?)
            .with_context(|| format!("writing '{}'", path.display()))?;
    }
    Ok(())
}

fn print_outcome(outcome: &IntervalOutcome) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "CASE\tOUTCOME\tSOLVES\tELAPSED (ms)")?;
    let solves = outcome
        .solution
        .as_ref()
        .map(|s| s.case_solution.solves)
        .unwrap_or(0);
    writeln!(
        writer,
        "{}\t{}\t{}\t{}",
        outcome.case_id, outcome.kind, solves, outcome.elapsed_ms
    )?;
    if let Some(error) = &outcome.error {
        writeln!(writer, "error:\t{error}")?;
    }

    if let Some(solution) = &outcome.solution {
        writeln!(writer)?;
        writeln!(writer, "REGION\tPRICE\tGENERATION\tLOAD\tNET EXPORT")?;
        for region in &solution.region_solution {
            writeln!(
                writer,
                "{}\t{:.2}\t{:.3}\t{:.3}\t{:.3}",
                region.region_id,
                region.energy_price,
                region.dispatched_generation,
                region.dispatched_load,
                region.net_export
            )?;
        }
        if !solution.interconnector_solution.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "INTERCONNECTOR\tFLOW\tLOSSES\tDEFICIT")?;
            for ic in &solution.interconnector_solution {
                writeln!(
                    writer,
                    "{}\t{:.3}\t{:.3}\t{:.3}",
                    ic.interconnector_id, ic.flow, ic.losses, ic.deficit
                )?;
            }
        }
    }

    if let Some(report) = &outcome.report {
        if !report.passed {
            writeln!(writer)?;
            writeln!(
                writer,
                "{} field(s) outside tolerance, {} missing",
                report.failure_count(),
                report.missing.len()
            )?;
            writeln!(writer, "ENTITY\tFIELD\tEXPECTED\tCOMPUTED")?;
            for field in report.failures().take(MAX_LISTED_FAILURES) {
                let computed = field
                    .computed
                    .map(|v| format!("{v:.4}"))
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    writer,
                    "{}\t{}\t{:.4}\t{}",
                    field.entity, field.field, field.expected, computed
                )?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}
