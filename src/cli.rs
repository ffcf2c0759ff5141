//! Command-line interface module for clean-folder.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Root folder resolution
//! - Configuration loading
//! - Running the pipeline with a progress spinner
//! - Printing the final report

use crate::config::{ConfigError, FilterConfig};
use crate::file_organizer::OrganizeError;
use crate::output::{OutputFormatter, completion_message};
use crate::pipeline::Organizer;
use crate::report::RunReport;
use clap::Parser;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Sort a folder: files go into category folders, archives are unpacked,
/// names become ASCII-only and empty folders disappear.
#[derive(Debug, Clone, Parser)]
#[command(name = "clean-folder", version, about)]
pub struct Args {
    /// Folder to sort. Defaults to the folder containing this executable.
    pub root: Option<PathBuf>,

    /// Filter configuration file (TOML).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print debug diagnostics to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the run report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Errors that stop a run before or instead of producing a report.
#[derive(Debug, Error)]
pub enum CliError {
    /// The executable's folder could not be determined.
    #[error("Cannot determine the executable's folder: {0}")]
    NoDefaultRoot(#[source] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Runs the CLI application with parsed arguments.
///
/// Returns the run report; the caller decides the exit status from it.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use clean_folder::cli::{Args, run_cli};
///
/// let args = Args::parse_from(["clean-folder", "/path/to/junk"]);
/// match run_cli(&args) {
///     Ok(report) => println!("{} changes", report.total_changes()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(args: &Args) -> Result<RunReport, CliError> {
    let root = resolve_root(args.root.as_deref())?;

    let config_path = args.config.clone();
    let mut filters = FilterConfig::load(config_path.as_deref())?.compile()?;

    // Never rename the configuration file or the running binary.
    let protected = config_path
        .into_iter()
        .chain(env::current_exe().ok());
    for path in protected {
        let path = fs::canonicalize(&path).unwrap_or(path);
        debug!(path = %path.display(), "protected");
        filters.protect(path);
    }

    let organizer = Organizer::with_filters(&root, filters)?;

    let report = if args.json {
        organizer.run()?
    } else {
        OutputFormatter::info(&format!("Sorting folder: {}", root.display()));
        let spinner = OutputFormatter::create_spinner();
        let result = organizer.run_observed(|stage| spinner.set_message(stage.description()));
        spinner.finish_and_clear();
        result?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        OutputFormatter::note(&completion_message(&report));
    } else {
        OutputFormatter::run_report(&report);
    }

    Ok(report)
}

/// Resolves the folder to sort: the given path, or the executable's folder.
///
/// The result is canonical, so paths in the report are absolute.
pub fn resolve_root(root: Option<&Path>) -> Result<PathBuf, CliError> {
    let root = match root {
        Some(path) => path.to_path_buf(),
        None => {
            let exe = env::current_exe().map_err(CliError::NoDefaultRoot)?;
            exe.parent().map(Path::to_path_buf).ok_or_else(|| {
                CliError::NoDefaultRoot(io::Error::new(
                    io::ErrorKind::NotFound,
                    "executable has no parent folder",
                ))
            })?
        }
    };

    fs::canonicalize(&root).map_err(|e| {
        CliError::Organize(OrganizeError::InvalidRootPath {
            path: root,
            source: e,
        })
    })
}
