//! Command-line front end for calcxml.

pub mod commands;
#[cfg(test)]
mod test_support;
pub mod util;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::commands::{solve, validate};
use crate::util::CliResult;

#[derive(Parser, Debug)]
#[command(name = "calcxml", version, about = "Solve arithmetic expressions stored in XML documents.")]
pub struct Cli {
    #[arg(
        long = "log-level",
        value_enum,
        global = true,
        help = "Log verbosity. Overrides RUST_LOG; defaults to warn when neither is set."
    )]
    pub log_level: Option<LogLevel>,

    #[arg(long = "no-color", global = true, help = "Disable ANSI colors in output.")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Solve every expression of a document and write the result document.")]
    Solve(solve::SolveArgs),
    #[command(about = "Validate a document against an XML Schema (the bundled calculator schema by default).")]
    Validate(validate::ValidateArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

pub fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);
    let output = execute(&cli)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

pub fn execute(cli: &Cli) -> CliResult<String> {
    if cli.no_color {
        owo_colors::set_override(false);
    }
    match &cli.command {
        Commands::Solve(args) => solve::run(args),
        Commands::Validate(args) => validate::run(args),
    }
}

fn init_tracing(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.directive()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    // a subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
