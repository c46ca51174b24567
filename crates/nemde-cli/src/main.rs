use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use nemde_algo::OutcomeKind;
use nemde_cli::{load_config, Cli, Commands, NemdeConfig};
use tracing::error;

mod commands;

fn init_tracing(level: tracing::Level) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();
}

fn apply_overrides(config: &mut NemdeConfig, algorithm: Option<nemde_cli::cli::AlgorithmArg>) {
    if let Some(algorithm) = algorithm {
        config.dispatch.algorithm = algorithm.into();
    }
}

/// Exit status per interval outcome: 0 solved or validated, 2 validated
/// with field differences, 1 input error, infeasible or inconclusive solve.
fn exit_code(kind: OutcomeKind) -> ExitCode {
    match kind {
        OutcomeKind::ValidatedPass | OutcomeKind::Solved => ExitCode::SUCCESS,
        OutcomeKind::ValidatedFail => ExitCode::from(2),
        OutcomeKind::Infeasible | OutcomeKind::Inconclusive | OutcomeKind::InputError => {
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, mut config: NemdeConfig) -> Result<ExitCode> {
    match cli.command {
        Commands::Run {
            casefile,
            patches,
            out,
            algorithm,
            solver,
            format,
        } => {
            apply_overrides(&mut config, algorithm);
            if let Some(name) = solver {
                config.dispatch.solver.backend = name
                    .parse()
                    .with_context(|| format!("selecting solver '{name}'"))?;
            }
            let kind = commands::run::handle(
                &casefile,
                &patches,
                out.as_deref(),
                format,
                &config.dispatch,
            )?;
            Ok(exit_code(kind))
        }
        Commands::Batch {
            inputs,
            out,
            threads,
            algorithm,
        } => {
            apply_overrides(&mut config, algorithm);
            let threads = threads.unwrap_or(config.batch.threads);
            commands::batch::handle(&inputs, &out, threads, config.dispatch)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { casefile, patches } => {
            commands::check::handle(&casefile, &patches)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    let level = match cli.log_level {
        Some(level) => level,
        None => match config.logging.level() {
            Ok(level) => level,
            Err(err) => {
                eprintln!("error: {err:#}");
                return ExitCode::FAILURE;
            }
        },
    };
    init_tracing(level);

    match run(cli, config) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
