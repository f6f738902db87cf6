use crate::tracing::{Level, LogLevel, TracingFormat};
use clap::Parser;
use jtrigger_core::config::{DEFAULT_QUEUE_BUDGET, DEFAULT_URL};

/// Default pause between polls, in seconds
const DEFAULT_SLEEP_SECS: u64 = 2;

/// Default per-request HTTP timeout, in seconds
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "jtrigger")]
#[command(about = "Trigger a Jenkins job, wait for it to start and stream its console output")]
#[command(long_about = None)]
#[command(version)]
#[command(
    after_help = concat!(
        "Examples:\n",
        "  jtrigger --job deploy_my_app -e text -u https://jenkins.example.com:8080 ",
        "-p param1=1,param2=develop\n\n",
        "Credentials are read from REMOTE_JENKINS_USER and REMOTE_JENKINS_PASS ",
        "before --user and --pass."
    )
)]
pub struct Cli {
    #[arg(short = 'j', long, help = "Job name; use '/' to address jobs inside folders")]
    pub job: String,

    #[arg(short = 'u', long, help = "Jenkins URL", default_value = DEFAULT_URL)]
    pub url: String,

    #[arg(
        short = 's',
        long,
        help = "Seconds to sleep between polling requests",
        default_value_t = DEFAULT_SLEEP_SECS
    )]
    pub sleep: u64,

    #[arg(
        short = 'w',
        long = "wait-timer",
        help = "Number of polls to wait for the build to leave the queue",
        default_value_t = DEFAULT_QUEUE_BUDGET
    )]
    pub wait_timer: u32,

    #[arg(
        short = 'e',
        long,
        help = "Console encoding, text or html",
        default_value = "html"
    )]
    pub encoding: String,

    #[arg(short = 'p', long, help = "Comma separated job parameters, e.g. a=1,b=2")]
    pub parameters: Option<String>,

    #[arg(long, help = "Username for the remote Jenkins user")]
    pub user: Option<String>,

    #[arg(long, help = "Password or API token for the remote Jenkins user")]
    pub pass: Option<String>,

    #[arg(
        long = "http-timeout",
        help = "Seconds before a single HTTP request times out",
        default_value_t = DEFAULT_HTTP_TIMEOUT_SECS
    )]
    pub http_timeout: u64,

    #[arg(short = 'd', long, help = "Print debug info (same as --level debug)")]
    pub debug: bool,

    #[arg(
        short = 'l',
        long,
        help = "Set logging level",
        default_value = "info",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-format",
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,
}

impl Cli {
    /// Log level after applying `--debug`
    #[must_use]
    pub fn effective_level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else {
            self.level.into()
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
