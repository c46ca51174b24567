pub mod cli;
pub mod config;

pub use cli::{parse_patch, Cli, Commands, OutputFormat};
pub use config::{load_config, BatchSettings, LoggingConfig, NemdeConfig};
