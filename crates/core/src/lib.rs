//! Trigger a Jenkins build and follow it to completion.
//!
//! A run goes through three phases, strictly in order:
//!
//! 1. [`trigger::trigger_build`] enqueues the build and returns the queue item URL
//! 2. [`queue::wait_for_start`] polls the queue item until a run number is assigned
//! 3. [`console::stream_console`] copies the run's console into a writer until
//!    the run stops building
//!
//! Every phase talks to the server through one [`session::JenkinsSession`],
//! which owns the [`http::Transport`] and attaches credentials and the
//! anti-forgery crumb. There are no retries: the first failure ends the run.
//!
//! ```no_run
//! use jtrigger_core::{ReqwestTransport, SessionConfig};
//!
//! # fn main() -> jtrigger_core::Result<()> {
//! let config = SessionConfig::new("http://localhost:8080", "deploy_my_app")?;
//! let transport = ReqwestTransport::new(ReqwestTransport::DEFAULT_TIMEOUT)?;
//! let report = jtrigger_core::run(&config, transport, &mut std::io::stdout().lock())?;
//! assert!(report.build_number > 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod console;
pub mod error;
pub mod http;
pub mod model;
pub mod queue;
pub mod session;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use config::{Credentials, Encoding, SessionConfig, parse_parameters};
pub use console::{StreamSummary, stream_console};
pub use error::{Error, Result};
pub use http::{ReqwestTransport, Transport};
pub use queue::wait_for_start;
pub use session::JenkinsSession;
pub use trigger::trigger_build;

use reqwest::Url;
use std::io::Write;

/// Outcome of a complete run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// JSON status URL of the queue item
    pub queue_url: Url,
    /// Run number Jenkins assigned
    pub build_number: u64,
    /// What the console stream produced
    pub stream: StreamSummary,
}

/// Trigger the configured job, wait for it to start and stream its console
/// into `out` until it finishes.
pub fn run<T: Transport, W: Write + ?Sized>(
    config: &SessionConfig,
    transport: T,
    out: &mut W,
) -> Result<RunReport> {
    let session = JenkinsSession::connect(config, transport)?;
    let queue_url = trigger_build(&session)?;
    let build_number = wait_for_start(&session, &queue_url)?;
    let stream = stream_console(&session, build_number, out)?;

    Ok(RunReport {
        queue_url,
        build_number,
        stream,
    })
}
