//! Turn parsed flags and the environment into a [`SessionConfig`].
//!
//! Everything here runs before the first request, so every failure is a
//! configuration error.

use crate::cli::Cli;
use crate::errors::CliError;
use jtrigger_core::{Credentials, Encoding, SessionConfig, parse_parameters};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable holding the username; wins over `--user`
pub const USER_ENV: &str = "REMOTE_JENKINS_USER";

/// Environment variable holding the password or API token; wins over `--pass`
pub const PASS_ENV: &str = "REMOTE_JENKINS_PASS";

/// Build the session configuration for this invocation
pub fn resolve(cli: &Cli) -> Result<SessionConfig, CliError> {
    let encoding: Encoding = cli.encoding.parse()?;
    let parameters = parse_parameters(cli.parameters.as_deref().unwrap_or_default())?;

    let mut config = SessionConfig::new(&cli.url, &cli.job)?
        .with_poll_interval(Duration::from_secs(cli.sleep))
        .with_queue_budget(cli.wait_timer)?
        .with_encoding(encoding)
        .with_parameters(parameters);

    if let Some(credentials) = resolve_credentials(cli.user.as_deref(), cli.pass.as_deref()) {
        config = config.with_credentials(credentials);
    }

    debug!(?config, "Resolved configuration");
    Ok(config)
}

/// Credentials from the environment first, flags second.
///
/// Authentication is only enabled when both a username and a secret resolve.
pub fn resolve_credentials(
    user_flag: Option<&str>,
    pass_flag: Option<&str>,
) -> Option<Credentials> {
    let username = env_value(USER_ENV).or_else(|| non_empty(user_flag));
    let secret = env_value(PASS_ENV).or_else(|| non_empty(pass_flag));

    match (username, secret) {
        (Some(username), Some(secret)) => Some(Credentials::new(username, secret)),
        (Some(username), None) => {
            warn!(%username, "No password or API token found, running unauthenticated");
            None
        }
        (None, Some(_)) => {
            warn!("Password given without a username, running unauthenticated");
            None
        }
        (None, None) => None,
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(String::from)
}
