//! jtrigger: trigger a Jenkins job, wait for it to leave the queue and stream
//! its console output to stdout.
//!
//! Logs and diagnostics go to stderr; stdout carries only console text.

// The panic hook and the pre-tracing fallback must print directly
#![allow(clippy::print_stderr)]

mod cli;
mod config;
mod errors;
mod tracing;

use crate::errors::{CliError, EXIT_OK, exit_code_for, render_error};
use crate::tracing::{TracingConfig, correlation_id, init_tracing};
use jtrigger_core::ReqwestTransport;
use std::io;
use std::time::Duration;

fn main() {
    // NOTE: tracing may be unusable during a panic, so print directly
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.effective_level(),
        ..Default::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let exit_code = match run(&cli) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            let code = exit_code_for(&err);
            ::tracing::debug!(exit_code = code, "Run failed");
            render_error(err);
            code
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: &cli::Cli) -> Result<(), CliError> {
    let config = config::resolve(cli)?;

    let span = ::tracing::info_span!(
        "run",
        correlation_id = %correlation_id(),
        job = %config.job(),
    );
    let _guard = span.enter();

    let transport = ReqwestTransport::new(Duration::from_secs(cli.http_timeout))?;
    let stdout = io::stdout();
    let report = jtrigger_core::run(&config, transport, &mut stdout.lock())?;

    ::tracing::info!(
        build = report.build_number,
        bytes = report.stream.bytes_written,
        "Build finished"
    );
    Ok(())
}
