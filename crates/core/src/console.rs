//! Console streamer
//!
//! Follows `logText/progressive{Text,Html}` for one run. Each fetch asks for
//! the bytes after the cursor; Jenkins answers with the new text and the next
//! offset in `X-Text-Size`. An empty fetch is ambiguous (quiet run or finished
//! run), so after [`IDLE_FETCHES_BEFORE_STATUS_CHECK`] empty fetches in a row
//! the run status is checked.
//!
//! ```text
//! STREAMING(idle=0) -> STREAMING(idle=1) -> CHECK_STATUS -> { STREAMING(idle=0) | DONE }
//! ```
//! Any non-200 response is fatal.

use crate::http::{HttpResponse, Method, Transport};
use crate::model::BuildStatus;
use crate::session::JenkinsSession;
use crate::{Error, Result};
use reqwest::Url;
use std::io::Write;
use tracing::{debug, info, instrument};

/// Consecutive empty fetches that trigger a run status check
pub const IDLE_FETCHES_BEFORE_STATUS_CHECK: u32 = 2;

/// Byte offset into the run's console; only ever moves forward
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConsoleCursor(u64);

impl ConsoleCursor {
    /// Current offset
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.0
    }

    /// Move to the server-reported next offset, refusing to go backwards
    fn advance(&mut self, next: u64, url: &Url) -> Result<()> {
        if next < self.0 {
            return Err(Error::protocol(
                url.as_str(),
                format!("console offset went backwards from {} to {next}", self.0),
            ));
        }
        self.0 = next;
        Ok(())
    }
}

/// What a finished stream produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Console bytes written to the sink
    pub bytes_written: u64,
    /// Cursor position when the run finished
    pub final_offset: u64,
    /// Run status checks performed
    pub status_checks: u32,
}

/// Stream the console of run `number` into `out` until the run stops building.
#[instrument(skip_all, fields(job = %session.config().job(), number = number))]
pub fn stream_console<T: Transport, W: Write + ?Sized>(
    session: &JenkinsSession<'_, T>,
    number: u64,
    out: &mut W,
) -> Result<StreamSummary> {
    let encoding = session.config().encoding();
    let log_url = session.build_url(number, &["logText", encoding.endpoint()])?;
    let status_url = session.build_url(number, &["api", "json"])?;
    info!(url = %log_url, %encoding, "Streaming console output");

    let mut cursor = ConsoleCursor::default();
    let mut idle: u32 = 0;
    let mut summary = StreamSummary::default();

    loop {
        let request = session
            .request(Method::Post, log_url.clone())
            .form_field("start", cursor.offset().to_string());
        let response = session.send(&request)?;
        ensure_ok(&response, &log_url)?;

        if response.content_length() == 0 {
            idle += 1;
            debug!(offset = cursor.offset(), idle, "No new console output");
        } else {
            out.write_all(&response.body)?;
            out.flush()?;
            summary.bytes_written += response.body.len() as u64;
            idle = 0;
            cursor.advance(next_offset(&response, &log_url)?, &log_url)?;
        }
        session.pause();

        if idle >= IDLE_FETCHES_BEFORE_STATUS_CHECK {
            summary.status_checks += 1;
            let response = session.send(&session.request(Method::Get, status_url.clone()))?;
            ensure_ok(&response, &status_url)?;
            let status: BuildStatus = response.json(&status_url)?;
            if !status.is_building() {
                break;
            }
            debug!("Run is still building");
            idle = 0;
        }
    }

    summary.final_offset = cursor.offset();
    info!(
        bytes = summary.bytes_written,
        status_checks = summary.status_checks,
        "Stream ended"
    );
    Ok(summary)
}

fn ensure_ok(response: &HttpResponse, url: &Url) -> Result<()> {
    if response.status == 200 {
        return Ok(());
    }
    Err(Error::Stream {
        url: url.to_string(),
        status: response.status,
        detail: response.describe(),
    })
}

fn next_offset(response: &HttpResponse, url: &Url) -> Result<u64> {
    response
        .header("X-Text-Size")
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| {
            Error::protocol(
                url.as_str(),
                "console chunk without a valid X-Text-Size header",
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, Encoding, SessionConfig};
    use crate::testing::{ScriptedTransport, console_chunk, console_empty, json};
    use proptest::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    const LOG_URL: &str = "http://ci:8080/job/deploy/42/logText/progressiveText";
    const STATUS_URL: &str = "http://ci:8080/job/deploy/42/api/json";

    fn config() -> SessionConfig {
        SessionConfig::new("http://ci:8080", "deploy")
            .unwrap()
            .with_poll_interval(Duration::ZERO)
            .with_encoding(Encoding::Text)
    }

    fn building(value: bool) -> HttpResponse {
        json(200, &json!({ "building": value }))
    }

    #[test]
    fn test_streams_until_finished() {
        let config = config();
        let text = "x".repeat(50);
        let transport = ScriptedTransport::new([
            console_chunk(&text, 50),
            console_empty(50),
            console_empty(50),
            building(false),
        ]);
        let session = JenkinsSession::connect(&config, &transport).unwrap();
        let mut out: Vec<u8> = Vec::new();

        let summary = stream_console(&session, 42, &mut out).unwrap();

        assert_eq!(out, text.as_bytes());
        assert_eq!(
            summary,
            StreamSummary {
                bytes_written: 50,
                final_offset: 50,
                status_checks: 1
            }
        );
        assert_eq!(
            transport.urls(),
            vec![LOG_URL, LOG_URL, LOG_URL, STATUS_URL]
        );
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn test_cursor_follows_reported_offset() {
        let config = config();
        let transport = ScriptedTransport::new([
            console_chunk("Started by user\n", 16),
            console_chunk("Building\n", 25),
            console_empty(25),
            console_empty(25),
            building(false),
        ]);
        let session = JenkinsSession::connect(&config, &transport).unwrap();
        let mut out: Vec<u8> = Vec::new();

        stream_console(&session, 42, &mut out).unwrap();

        let starts: Vec<_> = transport
            .requests()
            .iter()
            .filter(|r| r.url == LOG_URL)
            .map(|r| r.form_value("start").unwrap().to_string())
            .collect();
        assert_eq!(starts, ["0", "16", "25", "25"]);
        assert_eq!(String::from_utf8(out).unwrap(), "Started by user\nBuilding\n");
    }

    #[test]
    fn test_single_empty_fetch_does_not_check_status() {
        let config = config();
        let transport = ScriptedTransport::new([
            console_empty(0),
            console_chunk("a", 1),
            console_empty(1),
            console_chunk("b", 2),
            console_empty(2),
            console_empty(2),
            building(false),
        ]);
        let session = JenkinsSession::connect(&config, &transport).unwrap();
        let mut out: Vec<u8> = Vec::new();

        let summary = stream_console(&session, 42, &mut out).unwrap();

        assert_eq!(summary.status_checks, 1);
        let status_checks = transport.urls().iter().filter(|u| *u == STATUS_URL).count();
        assert_eq!(status_checks, 1);
        assert_eq!(out, b"ab");
    }

    #[test]
    fn test_quiet_but_building_keeps_polling() {
        let config = config();
        let transport = ScriptedTransport::new([
            console_empty(0),
            console_empty(0),
            building(true),
            console_empty(0),
            console_empty(0),
            building(true),
            console_chunk("done\n", 5),
            console_empty(5),
            console_empty(5),
            building(false),
        ]);
        let session = JenkinsSession::connect(&config, &transport).unwrap();
        let mut out: Vec<u8> = Vec::new();

        let summary = stream_console(&session, 42, &mut out).unwrap();

        assert_eq!(summary.status_checks, 3);
        assert_eq!(out, b"done\n");
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn test_non_200_log_fetch_is_fatal() {
        let config = config();
        let transport = ScriptedTransport::new([
            console_chunk("partial", 7),
            HttpResponse::new(503).with_header("Retry-After", "10").with_body("down"),
        ]);
        let session = JenkinsSession::connect(&config, &transport).unwrap();
        let mut out: Vec<u8> = Vec::new();

        let err = stream_console(&session, 42, &mut out).unwrap_err();

        match err {
            Error::Stream { status, detail, url } => {
                assert_eq!(status, 503);
                assert_eq!(url, LOG_URL);
                assert!(detail.contains("Retry-After: 10"));
                assert!(detail.contains("down"));
            }
            other => panic!("expected stream error, got {other:?}"),
        }
        assert_eq!(out, b"partial");
    }

    #[test]
    fn test_non_200_status_check_is_fatal() {
        let config = config();
        let transport = ScriptedTransport::new([
            console_empty(0),
            console_empty(0),
            HttpResponse::new(403),
        ]);
        let session = JenkinsSession::connect(&config, &transport).unwrap();
        let err = stream_console(&session, 42, &mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, Error::Stream { status: 403, .. }));
    }

    #[test]
    fn test_missing_text_size_is_protocol_error() {
        let config = config();
        let transport = ScriptedTransport::new([HttpResponse::new(200).with_body("text")]);
        let session = JenkinsSession::connect(&config, &transport).unwrap();
        let err = stream_console(&session, 42, &mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_offset_going_backwards_is_protocol_error() {
        let config = config();
        let transport = ScriptedTransport::new([console_chunk("abc", 3), console_chunk("d", 1)]);
        let session = JenkinsSession::connect(&config, &transport).unwrap();
        let err = stream_console(&session, 42, &mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_html_endpoint_and_auth() {
        let config = SessionConfig::new("http://ci:8080", "deploy")
            .unwrap()
            .with_poll_interval(Duration::ZERO)
            .with_credentials(Credentials::new("bot", "token"));
        let transport = ScriptedTransport::new([
            json(200, &json!({"crumbRequestField": "Jenkins-Crumb", "crumb": "c0ffee"})),
            console_empty(0),
            console_empty(0),
            building(false),
        ]);
        let session = JenkinsSession::connect(&config, &transport).unwrap();

        stream_console(&session, 42, &mut Vec::<u8>::new()).unwrap();

        let requests = transport.requests();
        assert_eq!(
            requests[1].url,
            "http://ci:8080/job/deploy/42/logText/progressiveHtml"
        );
        for request in &requests[1..] {
            assert_eq!(request.username.as_deref(), Some("bot"));
            assert_eq!(request.header("Jenkins-Crumb"), Some("c0ffee"));
        }
    }

    proptest! {
        /// Each request starts where the previous response said the text ends
        #[test]
        fn prop_cursor_is_monotonic(chunks in prop::collection::vec(1usize..64, 1..12)) {
            let config = config();
            let mut offset = 0u64;
            let mut script = Vec::new();
            let mut expected_starts = vec![0u64];
            for len in &chunks {
                offset += *len as u64;
                script.push(console_chunk(&"y".repeat(*len), offset));
                expected_starts.push(offset);
            }
            // two quiet fetches at the final offset, then the status check
            script.push(console_empty(offset));
            script.push(console_empty(offset));
            expected_starts.push(offset);
            script.push(building(false));

            let transport = ScriptedTransport::new(script);
            let session = JenkinsSession::connect(&config, &transport).unwrap();
            let mut out: Vec<u8> = Vec::new();
            let summary = stream_console(&session, 42, &mut out).unwrap();

            let starts: Vec<u64> = transport
                .requests()
                .iter()
                .filter(|r| r.url == LOG_URL)
                .map(|r| r.form_value("start").unwrap().parse().unwrap())
                .collect();
            prop_assert_eq!(starts, expected_starts);
            prop_assert_eq!(summary.final_offset, offset);
            prop_assert_eq!(out.len() as u64, offset);
        }

        /// A not-building status ends the stream with no further requests
        #[test]
        fn prop_stops_after_not_building(quiet_checks in 0usize..5) {
            let config = config();
            let mut script = Vec::new();
            for _ in 0..quiet_checks {
                script.extend([console_empty(0), console_empty(0), building(true)]);
            }
            script.extend([console_empty(0), console_empty(0), building(false)]);
            script.push(console_chunk("never read", 10));

            let transport = ScriptedTransport::new(script);
            let session = JenkinsSession::connect(&config, &transport).unwrap();
            let summary = stream_console(&session, 42, &mut Vec::<u8>::new()).unwrap();

            prop_assert_eq!(summary.status_checks as usize, quiet_checks + 1);
            prop_assert_eq!(transport.remaining(), 1);
            let urls = transport.urls();
            prop_assert_eq!(urls.last().map(String::as_str), Some(STATUS_URL));
        }
    }
}
