//! HTTP transport seam
//!
//! The phases only ever talk to Jenkins through [`Transport`]. Production code
//! uses [`ReqwestTransport`]; tests substitute a scripted transport.

use crate::config::Credentials;
use crate::{Error, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::debug;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

/// A request as built by the session
#[derive(Debug)]
pub struct HttpRequest<'a> {
    /// HTTP method
    pub method: Method,
    /// Absolute target URL
    pub url: Url,
    /// Extra headers (the crumb header pair, when present)
    pub headers: Vec<(String, String)>,
    /// Form-encoded body fields; empty means no body
    pub form: Vec<(String, String)>,
    /// Basic auth credentials
    pub credentials: Option<&'a Credentials>,
}

impl<'a> HttpRequest<'a> {
    /// Create a request without headers, body or credentials
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            form: Vec::new(),
            credentials: None,
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a form field to the body
    #[must_use]
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// Authenticate the request
    #[must_use]
    pub fn credentials(mut self, credentials: Option<&'a Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Value of a form field, if set
    #[must_use]
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A fully read response
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create an empty response with the given status
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Header lookup, case-insensitive on the name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Reported content length: the `Content-Length` header when it parses,
    /// the number of body bytes otherwise.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.header("Content-Length")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(self.body.len() as u64)
    }

    /// Body decoded lossily as UTF-8
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Headers followed by the body, for diagnostics
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.headers {
            let _ = writeln!(out, "{name}: {value}");
        }
        out.push('\n');
        out.push_str(&self.body_text());
        out
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::protocol(url.as_str(), format!("invalid JSON body: {e}")))
    }
}

/// Sends one request and reads the whole response
pub trait Transport {
    /// Execute `request`. Only transport failures are errors; any HTTP status
    /// is returned as a response.
    fn send(&self, request: &HttpRequest<'_>) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest<'_>) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

/// Blocking transport backed by a single cookie-keeping `reqwest` client,
/// so every request of a run shares one HTTP session.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Per-request timeout used when none is configured
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(concat!("jtrigger/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http("(client)", format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest<'_>) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, request.url.clone());
        if let Some(credentials) = request.credentials {
            builder = builder.basic_auth(credentials.username(), Some(credentials.secret()));
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        let response = builder
            .send()
            .map_err(|e| Error::http(request.url.as_str(), e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| Error::http(request.url.as_str(), format!("failed to read body: {e}")))?
            .to_vec();

        debug!(
            method = ?request.method,
            url = %request.url,
            status,
            bytes = body.len(),
            "HTTP exchange"
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
