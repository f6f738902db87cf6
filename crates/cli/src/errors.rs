//! CLI error classification, exit codes and rendering

use miette::{Diagnostic, Report};
use std::io::{self, Write};
use thiserror::Error;

/// The stream ran to completion
pub const EXIT_OK: i32 = 0;
/// Trigger, queue or stream phase failed
pub const EXIT_RUN: i32 = 1;
/// Configuration rejected before any network call
pub const EXIT_CONFIG: i32 = 2;

/// CLI-level error: which side of the first request it happened on
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Bad flags or environment; nothing was sent
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(jtrigger_core::Error),

    /// A run phase failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Run(jtrigger_core::Error),
}

impl From<jtrigger_core::Error> for CliError {
    fn from(err: jtrigger_core::Error) -> Self {
        if err.is_configuration() {
            Self::Config(err)
        } else {
            Self::Run(err)
        }
    }
}

/// Map CLI error to the process exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config(_) => EXIT_CONFIG,
        CliError::Run(_) => EXIT_RUN,
    }
}

/// Print the error with miette's report formatting on stderr
#[allow(clippy::print_stderr)]
pub fn render_error(err: CliError) {
    let report = Report::new(err);
    eprintln!("{report:?}");
    let _ = io::stderr().flush();
}
