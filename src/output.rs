//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status
//! lines, the stage spinner, and the end-of-run summary table.

use crate::report::RunReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
///
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - A spinner for the running stage
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use clean_folder::output::OutputFormatter;
    /// OutputFormatter::success("Folder sorted");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a regular message to stderr, keeping stdout machine-readable.
    pub fn note(message: &str) {
        eprintln!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a spinner that shows which stage is running.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use clean_folder::output::OutputFormatter;
    /// let spinner = OutputFormatter::create_spinner();
    /// spinner.set_message("Sorting files");
    /// spinner.finish_and_clear();
    /// ```
    pub fn create_spinner() -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    /// Prints the number of files moved into each category.
    pub fn summary_table(report: &RunReport) {
        Self::header("SUMMARY");

        let counts = report.category_counts();
        let width = counts
            .keys()
            .map(|category| category.dir_name().len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in &counts {
            println!(
                "{:<width$} | {} {}",
                category.dir_name(),
                count.to_string().green(),
                plural(*count, "file"),
                width = width
            );
        }

        let total = report.moved_files.len();
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural(total, "file"),
            width = width
        );
    }

    /// Prints the full end-of-run report.
    pub fn run_report(report: &RunReport) {
        Self::summary_table(report);

        Self::header("CHANGES");
        Self::plain(&format!(
            "  Renamed in place: {}",
            plural_count(report.renamed_files.len(), "file")
        ));
        Self::plain(&format!(
            "  Unpacked:         {}",
            plural_count(report.extracted_archives.len(), "archive")
        ));
        Self::plain(&format!(
            "  Removed:          {}",
            plural_count(report.removed_folders.len(), "empty folder")
        ));
        Self::plain(&format!(
            "  Renamed:          {}",
            plural_count(report.renamed_folders.len(), "folder")
        ));

        if !report.failures.is_empty() {
            Self::header("FAILURES");
            for failure in &report.failures {
                Self::error(&format!("[{}] {}", failure.stage, failure.reason));
            }
            Self::warning(&format!(
                "{} could not be processed. Please review errors above.",
                plural_count(report.failures.len(), "item")
            ));
        }

        println!();
        Self::success(&completion_message(report));
    }
}

/// The line printed once a run has finished.
pub fn completion_message(report: &RunReport) -> String {
    format!("Sorting folder {} completed.", report.root.display())
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}

fn plural_count(count: usize, noun: &str) -> String {
    format!("{} {}", count, plural(count, noun))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_completion_message_names_root() {
        let report = RunReport::new(PathBuf::from("/home/user/Downloads"));
        assert_eq!(
            completion_message(&report),
            "Sorting folder /home/user/Downloads completed."
        );
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural_count(1, "file"), "1 file");
        assert_eq!(plural_count(0, "archive"), "0 archives");
        assert_eq!(plural(3, "empty folder"), "empty folders");
    }
}
