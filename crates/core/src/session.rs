//! Jenkins session: URL building plus the auth and crumb every request carries

use crate::config::SessionConfig;
use crate::http::{HttpRequest, HttpResponse, Method, Transport};
use crate::model::Crumb;
use crate::{Error, Result};
use reqwest::Url;
use tracing::{debug, instrument};

/// One authenticated conversation with a Jenkins server.
///
/// Owns the transport for the whole run; the crumb, if any, is fetched once
/// in [`JenkinsSession::connect`] and attached to every later request.
#[derive(Debug)]
pub struct JenkinsSession<'c, T> {
    config: &'c SessionConfig,
    transport: T,
    crumb: Option<Crumb>,
}

impl<'c, T: Transport> JenkinsSession<'c, T> {
    /// Open a session, fetching the crumb when credentials are configured.
    ///
    /// A server without a crumb issuer answers 404; that is not an error.
    #[instrument(skip_all, fields(url = %config.base_url()))]
    pub fn connect(config: &'c SessionConfig, transport: T) -> Result<Self> {
        let mut session = Self {
            config,
            transport,
            crumb: None,
        };
        if config.credentials().is_some() {
            session.crumb = session.fetch_crumb()?;
        }
        Ok(session)
    }

    fn fetch_crumb(&self) -> Result<Option<Crumb>> {
        let url = self.url(&["crumbIssuer", "api", "json"])?;
        let request =
            HttpRequest::new(Method::Get, url.clone()).credentials(self.config.credentials());
        let response = self.transport.send(&request)?;

        match response.status {
            200..=299 => {
                let crumb: Crumb = response.json(&url)?;
                debug!(field = %crumb.crumb_request_field, "Obtained crumb");
                Ok(Some(crumb))
            }
            404 => {
                debug!("Crumb issuer not available, continuing without crumb");
                Ok(None)
            }
            status => Err(Error::Crumb {
                url: url.to_string(),
                status,
                body: response.body_text(),
            }),
        }
    }

    /// The configuration this session was opened with
    #[must_use]
    pub fn config(&self) -> &'c SessionConfig {
        self.config
    }

    /// The crumb obtained at connect time
    #[must_use]
    pub fn crumb(&self) -> Option<&Crumb> {
        self.crumb.as_ref()
    }

    /// The underlying transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `base_url` followed by `segments`, each percent-encoded
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let base = self.config.base_url();
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::configuration(format!("'{base}' cannot be a base URL")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// URL below the job, `team/app` expanding to `job/team/job/app`
    pub fn job_url(&self, tail: &[&str]) -> Result<Url> {
        let job_path = self.config.job_path();
        let mut segments: Vec<&str> = Vec::with_capacity(job_path.len() * 2 + tail.len());
        for name in job_path {
            segments.push("job");
            segments.push(name.as_str());
        }
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    /// URL below one run of the job
    pub fn build_url(&self, number: u64, tail: &[&str]) -> Result<Url> {
        let number = number.to_string();
        let mut segments = vec![number.as_str()];
        segments.extend_from_slice(tail);
        self.job_url(&segments)
    }

    /// JSON status URL for the queue item a trigger redirected to
    pub fn queue_status_url(&self, location: &str) -> Result<Url> {
        let mut url = self.config.base_url().join(location).map_err(|e| {
            Error::protocol(
                self.config.base_url().as_str(),
                format!("invalid queue location '{location}': {e}"),
            )
        })?;
        url.path_segments_mut()
            .map_err(|()| Error::protocol(location, "queue location cannot be a base URL"))?
            .pop_if_empty()
            .extend(["api", "json"]);
        Ok(url)
    }

    /// A request carrying the session credentials and crumb
    #[must_use]
    pub fn request(&self, method: Method, url: Url) -> HttpRequest<'c> {
        let request = HttpRequest::new(method, url).credentials(self.config.credentials());
        match &self.crumb {
            Some(crumb) => request.header(&crumb.crumb_request_field, &crumb.crumb),
            None => request,
        }
    }

    /// Send a request over the session transport
    pub fn send(&self, request: &HttpRequest<'_>) -> Result<HttpResponse> {
        self.transport.send(request)
    }

    /// Block for one poll interval
    pub fn pause(&self) {
        let interval = self.config.poll_interval();
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }
}
