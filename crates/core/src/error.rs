//! Error types for jtrigger-core
//!
//! Every variant is terminal for the run: nothing in this crate retries.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for jtrigger-core operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Invalid configuration, detected before any network activity
    #[error("Configuration error: {message}")]
    #[diagnostic(code(jtrigger::config::invalid))]
    Configuration {
        /// What is wrong with the configuration
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// The request never produced an HTTP response
    #[error("HTTP request to {url} failed: {message}")]
    #[diagnostic(
        code(jtrigger::http::transport),
        help("Check that the Jenkins URL is reachable from this machine")
    )]
    Http {
        /// Target of the failed request
        url: String,
        /// Transport-level failure description
        message: String,
    },

    /// Fetching the anti-forgery crumb failed
    #[error("Crumb request to {url} failed with HTTP {status}")]
    #[diagnostic(code(jtrigger::auth::crumb))]
    Crumb {
        /// Crumb issuer URL
        url: String,
        /// HTTP status returned by the server
        status: u16,
        /// Response body
        #[help]
        body: String,
    },

    /// The server did not accept the build request
    #[error("Build trigger failed with HTTP {status} at {url}")]
    #[diagnostic(code(jtrigger::trigger::rejected))]
    Trigger {
        /// Trigger endpoint
        url: String,
        /// HTTP status returned by the server (anything but 201)
        status: u16,
        /// Response body
        #[help]
        body: String,
    },

    /// Polling the queue item returned a non-200 response
    #[error("Queue poll failed with HTTP {status} at {url}")]
    #[diagnostic(code(jtrigger::queue::poll))]
    QueuePoll {
        /// Queue item status URL
        url: String,
        /// HTTP status returned by the server
        status: u16,
        /// Response body
        #[help]
        body: String,
    },

    /// The queue tick budget ran out before an executable was assigned
    #[error("Timed out waiting for the build to leave the queue after {polls} polls")]
    #[diagnostic(
        code(jtrigger::queue::timeout),
        help("Raise --wait-timer or --sleep; the budget is counted in polls, not seconds")
    )]
    QueueTimeout {
        /// Queue item status URL
        url: String,
        /// Number of waiting polls consumed
        polls: u32,
    },

    /// The queue item was cancelled before it started
    #[error("Queue item {url} was cancelled before the build started")]
    #[diagnostic(code(jtrigger::queue::cancelled))]
    QueueCancelled {
        /// Queue item status URL
        url: String,
    },

    /// A console or build-status request returned a non-200 response
    #[error("Console stream failed with HTTP {status} at {url}")]
    #[diagnostic(code(jtrigger::console::stream))]
    Stream {
        /// Console or status URL
        url: String,
        /// HTTP status returned by the server
        status: u16,
        /// Response headers followed by the response body
        #[help]
        detail: String,
    },

    /// The server answered with something this client cannot interpret
    #[error("Unexpected response from {url}: {message}")]
    #[diagnostic(code(jtrigger::protocol))]
    Protocol {
        /// URL of the offending response
        url: String,
        /// What was wrong with the response
        message: String,
    },

    /// Writing console text to the output sink failed
    #[error("Failed to write console output: {source}")]
    #[diagnostic(code(jtrigger::output))]
    Output {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text
    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a transport error
    pub fn http(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised before any network activity
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Output { source }
    }
}

/// Result type for jtrigger-core operations
pub type Result<T> = std::result::Result<T, Error>;
