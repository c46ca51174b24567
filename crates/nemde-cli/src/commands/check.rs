use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use nemde_core::{Casefile, CasefilePatch};
use tabwriter::TabWriter;
use tracing::info;

/// Parse and validate a casefile, printing its element counts and any
/// ingestion warnings.
pub fn handle(path: &Path, patches: &[CasefilePatch]) -> Result<()> {
    let casefile = Casefile::from_path_with_patches(path, patches)
        .with_context(|| format!("loading casefile '{}'", path.display()))?;
    let report = casefile
        .validate()
        .with_context(|| format!("validating casefile '{}'", casefile.case_id()))?;
    info!(case_id = casefile.case_id(), "casefile is valid");

    let stats = &report.stats;
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "CASE\t{}", casefile.case_id())?;
    for (label, count) in [
        ("REGIONS", stats.regions),
        ("TRADERS", stats.traders),
        ("OFFERS", stats.offers),
        ("INTERCONNECTORS", stats.interconnectors),
        ("MNSPS", stats.mnsps),
        ("CONSTRAINTS", stats.constraints),
        ("EQUATIONS", stats.equations),
    ] {
        writeln!(writer, "{label}\t{count}")?;
    }
    writeln!(
        writer,
        "HISTORICAL\t{}",
        if casefile.historical.is_some() { "yes" } else { "no" }
    )?;
    writer.flush()?;
    print!("{}", report.diagnostics);
    Ok(())
}
