//! Strata command-line interface
//!
//! Inspects, dumps and verifies strata columnar files.
//!
//! # Usage
//!
//! ```bash
//! # Show schema, row count and stripe layout
//! strata inspect data.strata
//!
//! # Print the first 20 rows as JSON
//! strata -o json dump data.strata --limit 20
//!
//! # Decode every stream and check its checksum
//! strata verify data.strata
//!
//! # Write a sample file using lz4
//! strata generate sample.strata --rows 100000 --compression lz4
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use strata_columnar::CompressionKind;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod formatter;

use config::CliConfig;
use formatter::OutputFormat;

/// Strata command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "strata",
    version,
    about = "Inspect and verify strata columnar files",
    long_about = "A command-line tool for strata columnar files.\n\n\
                  Use it to look at file layout, print decoded rows,\n\
                  check stream integrity and write sample files."
)]
struct Args {
    /// Output format (defaults to the config file setting, then table)
    #[arg(short = 'o', long, value_enum, global = true)]
    output: Option<OutputFormatArg>,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true, env = "STRATA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show schema, row count and stripe directory
    Inspect {
        /// File to inspect
        file: PathBuf,
    },
    /// Print decoded rows
    Dump {
        /// File to read
        file: PathBuf,

        /// Maximum number of rows to print
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Decode every column and check every stream checksum
    Verify {
        /// File to verify
        file: PathBuf,
    },
    /// Write a sample file covering every storage type
    Generate {
        /// Destination path
        file: PathBuf,

        /// Number of rows
        #[arg(short = 'r', long, default_value_t = 10_000)]
        rows: u64,

        /// Stream compression (overrides the config file)
        #[arg(short = 'c', long)]
        compression: Option<CompressionKind>,
    },
    /// Print the effective storage configuration
    Config,
}

/// Output format argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Display results in a formatted table
    Table,
    /// Display results as JSON
    Json,
    /// Display raw tab-separated values
    Raw,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Raw => OutputFormat::Raw,
        }
    }
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    init_logging(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let format = args
        .output
        .map(OutputFormat::from)
        .unwrap_or_else(|| OutputFormat::from_name(&config.output_format));
    debug!(?format, command = ?args.command, "running command");

    let output = execute(&config, args.command, format)?;
    println!("{}", output);
    Ok(())
}

fn execute(config: &CliConfig, command: Command, format: OutputFormat) -> Result<String> {
    let output = match command {
        Command::Inspect { file } => {
            formatter::format_report(&commands::inspect(&file, &config.reader)?, format)
        }
        Command::Dump { file, limit } => {
            let rows = commands::dump(&file, &config.reader, limit.or(config.default_limit))?;
            formatter::format_rows(&rows, format)
        }
        Command::Verify { file } => {
            formatter::format_summary(&commands::verify(&file, &config.reader)?, format)
        }
        Command::Generate {
            file,
            rows,
            compression,
        } => {
            let mut writer = config.writer.clone();
            if let Some(kind) = compression {
                writer = writer.with_compression(kind);
            }
            formatter::format_summary(&commands::generate(&file, &writer, rows)?, format)
        }
        Command::Config => config.storage().to_toml_string()?,
    };
    Ok(output)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("strata_cli=debug,strata_columnar=debug")
    } else {
        EnvFilter::new("strata_cli=warn,strata_columnar=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    match path {
        Some(path) => CliConfig::from_file(path),
        None => Ok(CliConfig::default()),
    }
}
