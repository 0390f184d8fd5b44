//! pyzapp CLI entrypoint.
//!
//! This binary packages a Python source tree into a zip application. Logs,
//! warnings, and the final report are written to stderr.

use camino::Utf8Path;
use pyzapp::cli::Cli;
use pyzapp::config::FileConfig;
use pyzapp::error::Result;
use pyzapp::output::{dry_run_text, success_lines};
use pyzapp::pipeline::build;
use std::io::Write;

fn main() {
    let cli = Cli::parse_ordered();
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let file = FileConfig::discover(cli.config.as_deref(), Utf8Path::new("."))?;
    let request = cli.build_request(file)?;
    let report = build(&request)?;

    if report.dry_run {
        write_stderr_line(stderr, dry_run_text(&report));
        return Ok(());
    }

    if !cli.quiet {
        for line in success_lines(&report) {
            write_stderr_line(stderr, line);
        }
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort reporting; ignore write failures.
    }
}
