//! Session configuration
//!
//! A [`SessionConfig`] is fully resolved (credentials looked up, parameters
//! parsed, encoding validated) before the first request is made, and is never
//! mutated afterwards.

use crate::{Error, Result};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Jenkins URL used when none is given
pub const DEFAULT_URL: &str = "http://localhost:8080";

/// Pause between two polls of the queue item or the console
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Number of waiting polls allowed before the queue wait gives up
pub const DEFAULT_QUEUE_BUDGET: u32 = 100;

/// Console encoding served by the progressive log endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Plain text (`logText/progressiveText`)
    Text,
    /// HTML with console annotations (`logText/progressiveHtml`)
    #[default]
    Html,
}

impl Encoding {
    /// Last path segment of the progressive log endpoint
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Text => "progressiveText",
            Self::Html => "progressiveHtml",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Html => "html",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            _ => Err(Error::configuration_with_help(
                format!("'{s}' is not a valid encoding"),
                "Supported encodings are 'text' and 'html'",
            )),
        }
    }
}

/// Parse a comma separated `key=value` list into job parameters.
///
/// Blank input means "no parameters". Each item needs exactly one `=` and a
/// non-empty key; later duplicates overwrite earlier ones.
pub fn parse_parameters(input: &str) -> Result<BTreeMap<String, String>> {
    let mut parameters = BTreeMap::new();
    if input.trim().is_empty() {
        return Ok(parameters);
    }

    for item in input.split(',') {
        let mut parts = item.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) if !key.is_empty() => {
                parameters.insert(key.to_string(), value.to_string());
            }
            _ => {
                return Err(Error::configuration_with_help(
                    format!("malformed job parameter '{item}'"),
                    "Parameters must be key=value pairs separated by commas, e.g. a=1,b=develop",
                ));
            }
        }
    }

    Ok(parameters)
}

/// Username and secret (password or API token) for HTTP basic auth
#[derive(Debug)]
pub struct Credentials {
    username: String,
    secret: SecretString,
}

impl Credentials {
    /// Create credentials from a username and a secret
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// The username
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The secret, exposed for building the auth header
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

/// Everything a run needs to know, resolved up front
#[derive(Debug)]
pub struct SessionConfig {
    base_url: Url,
    job_path: Vec<String>,
    credentials: Option<Credentials>,
    poll_interval: Duration,
    queue_budget: u32,
    encoding: Encoding,
    parameters: BTreeMap<String, String>,
}

impl SessionConfig {
    /// Create a configuration for `job` on the server at `base_url`.
    ///
    /// `job` may name a job inside folders (`team/app`).
    pub fn new(base_url: &str, job: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            Error::configuration_with_help(
                format!("invalid Jenkins URL '{base_url}': {e}"),
                "Use an absolute URL such as http://localhost:8080",
            )
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(Error::configuration(format!(
                "Jenkins URL '{base_url}' must use http or https"
            )));
        }

        let job_path: Vec<String> = job
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .collect();
        if job_path.is_empty() {
            return Err(Error::configuration("job name must not be empty"));
        }

        Ok(Self {
            base_url,
            job_path,
            credentials: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            queue_budget: DEFAULT_QUEUE_BUDGET,
            encoding: Encoding::default(),
            parameters: BTreeMap::new(),
        })
    }

    /// Authenticate every request with these credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the pause between polls
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the queue budget, counted in waiting polls
    pub fn with_queue_budget(mut self, ticks: u32) -> Result<Self> {
        if ticks == 0 {
            return Err(Error::configuration_with_help(
                "queue wait budget must be at least one poll",
                "Pass a --wait-timer of 1 or more",
            ));
        }
        self.queue_budget = ticks;
        Ok(self)
    }

    /// Set the console encoding
    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the job parameters; an empty map triggers a plain build
    #[must_use]
    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Jenkins root URL
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Job name as given, folders joined with `/`
    #[must_use]
    pub fn job(&self) -> String {
        self.job_path.join("/")
    }

    /// Folder and job names, outermost first
    #[must_use]
    pub fn job_path(&self) -> &[String] {
        &self.job_path
    }

    /// Credentials, when authentication is configured
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Pause between polls
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Queue budget in waiting polls
    #[must_use]
    pub fn queue_budget(&self) -> u32 {
        self.queue_budget
    }

    /// Console encoding
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Job parameters
    #[must_use]
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }
}
