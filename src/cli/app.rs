//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use super::output::{Output, OutputFormat};
use super::{edit, logging, query};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "shapeio")]
#[command(author, version, about = "Read, check and rewrite MSTS/ORTS shape files")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify files by their header (text, binary, compressed)
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Decode files and report any errors
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show element counts of a shape
    Info { file: PathBuf },

    /// Rewrite a shape with the configured layout and encoding
    Fmt {
        file: PathBuf,

        /// Write here instead of in place
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print the decoded shape as JSON
    Export { file: PathBuf },

    /// Compress a shape with the external tool
    Compress {
        file: PathBuf,

        /// Write here instead of in place
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Path to ffeditc_unicode.exe
        #[arg(long, env = "SHAPEIO_FFEDITC")]
        tool: Option<PathBuf>,
    },

    /// Decompress a shape with the external tool
    Decompress {
        file: PathBuf,

        /// Write here instead of in place
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Path to ffeditc_unicode.exe
        #[arg(long, env = "SHAPEIO_FFEDITC")]
        tool: Option<PathBuf>,
    },

    /// Replace text in a file, keeping its encoding
    Replace {
        file: PathBuf,
        from: String,
        to: String,

        /// Match without regard to case
        #[arg(long, short)]
        ignore_case: bool,
    },

    /// List files in a directory
    Find {
        dir: PathBuf,

        /// Glob matched against file names
        #[arg(long, short, default_value = "*.s")]
        pattern: String,

        /// Descend into subdirectories
        #[arg(long, short)]
        recursive: bool,

        /// Only list files with a shape header
        #[arg(long)]
        shapes: bool,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let output = Output::new(cli.format);
    let config = Config::load()?;
    debug!(project_root = ?config.project_root, "loaded configuration");

    match cli.command {
        Commands::Inspect { files } => query::inspect(&output, &files)?,
        Commands::Check { files } => query::check(&output, &config, &files)?,
        Commands::Info { file } => query::info(&output, &config, &file)?,
        Commands::Export { file } => query::export(&output, &config, &file)?,
        Commands::Find {
            dir,
            pattern,
            recursive,
            shapes,
        } => query::find(&output, &dir, &pattern, recursive, shapes)?,

        Commands::Fmt { file, output: out } => edit::fmt(&output, &config, &file, out.as_deref())?,
        Commands::Replace {
            file,
            from,
            to,
            ignore_case,
        } => edit::replace(&output, &file, &from, &to, ignore_case)?,
        Commands::Compress {
            file,
            output: out,
            tool,
        } => edit::compress(&output, &config, &file, out.as_deref(), tool, false)?,
        Commands::Decompress {
            file,
            output: out,
            tool,
        } => edit::compress(&output, &config, &file, out.as_deref(), tool, true)?,
    }

    Ok(())
}
