use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use nemde_algo::Algorithm;
use nemde_core::CasefilePatch;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nemde", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides `logging.level` in the config file)
    #[arg(long)]
    pub log_level: Option<tracing::Level>,

    /// TOML configuration file (defaults to ./nemde.toml when present)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch one interval and compare it with its historical solution
    Run {
        /// Casefile (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        casefile: PathBuf,
        /// Replace a casefile value before solving: `/json/pointer=value`
        #[arg(long = "set", value_parser = parse_patch)]
        patches: Vec<CasefilePatch>,
        /// Write `solution.json` and `report.json` here
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: Option<PathBuf>,
        #[arg(long, value_enum)]
        algorithm: Option<AlgorithmArg>,
        /// Solver backend (clarabel, highs)
        #[arg(long)]
        solver: Option<String>,
        #[arg(long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
    /// Dispatch many intervals in parallel and write a batch manifest
    Batch {
        /// Casefiles or directories of casefiles
        #[arg(required = true, value_hint = ValueHint::AnyPath)]
        inputs: Vec<PathBuf>,
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: PathBuf,
        /// Worker threads (0 = all cores; overrides `batch.threads`)
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long, value_enum)]
        algorithm: Option<AlgorithmArg>,
    },
    /// Parse and validate a casefile without solving it
    Check {
        #[arg(value_hint = ValueHint::FilePath)]
        casefile: PathBuf,
        #[arg(long = "set", value_parser = parse_patch)]
        patches: Vec<CasefilePatch>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Default,
    DispatchOnly,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::Default => Algorithm::Default,
            AlgorithmArg::DispatchOnly => Algorithm::DispatchOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Parse `--set /path=value`. The value is read as JSON when it parses,
/// otherwise as a plain string.
pub fn parse_patch(raw: &str) -> Result<CasefilePatch, String> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected /json/pointer=value, got '{raw}'"))?;
    if !path.starts_with('/') {
        return Err(format!("patch path '{path}' must start with '/'"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok(CasefilePatch::new(path, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn patch_values_parse_as_json_when_possible() {
        let patch = parse_patch("/regions/0/initial_demand=120.5").unwrap();
        assert_eq!(patch.path, "/regions/0/initial_demand");
        assert_eq!(patch.value, json!(120.5));

        let patch = parse_patch("/traders/0/region_id=VIC1").unwrap();
        assert_eq!(patch.value, json!("VIC1"));

        assert!(parse_patch("regions/0=1").is_err());
        assert!(parse_patch("/regions/0").is_err());
    }

    #[test]
    fn run_accepts_repeated_patches() {
        let cli = Cli::try_parse_from([
            "nemde",
            "run",
            "case.json",
            "--set",
            "/case/voll=14000",
            "--set",
            "/case/intervention=true",
            "--algorithm",
            "dispatch-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                patches, algorithm, ..
            } => {
                assert_eq!(patches.len(), 2);
                assert_eq!(patches[1].value, json!(true));
                assert_eq!(algorithm, Some(AlgorithmArg::DispatchOnly));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
