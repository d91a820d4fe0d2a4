// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `catapply`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "catapply",
    version,
    about = "Apply a resource catalog to the local host.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the catalog file (TOML).
    ///
    /// Reads standard input when omitted or `-`.
    #[arg(value_name = "CATALOG")]
    pub catalog: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CATAPPLY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
