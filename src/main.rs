use clap::Parser;
use clean_folder::cli::{Args, run_cli};
use clean_folder::logging::init_cli_logger;
use clean_folder::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    init_cli_logger(args.verbose);

    match run_cli(&args) {
        Ok(report) if report.is_complete_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
