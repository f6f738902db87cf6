//! Build trigger
//!
//! Enqueues one build and returns the JSON status URL of its queue item.

use crate::http::{Method, Transport};
use crate::session::JenkinsSession;
use crate::{Error, Result};
use reqwest::Url;
use tracing::{info, instrument};

/// Status every accepted trigger answers with
const CREATED: u16 = 201;

/// Ask Jenkins to start the configured job.
///
/// Configured parameters are posted form-encoded to `buildWithParameters`;
/// without parameters the plain `build` endpoint is used. Both paths carry the
/// session credentials and crumb. Anything but `201 Created` is fatal.
#[instrument(skip_all, fields(job = %session.config().job()))]
pub fn trigger_build<T: Transport>(session: &JenkinsSession<'_, T>) -> Result<Url> {
    let parameters = session.config().parameters();

    let (url, request) = if parameters.is_empty() {
        let url = session.job_url(&["build"])?;
        info!(%url, "Triggering build");
        let request = session.request(Method::Post, url.clone());
        (url, request)
    } else {
        let url = session.job_url(&["buildWithParameters"])?;
        info!(%url, parameters = parameters.len(), "Triggering parameterized build");
        let request = parameters
            .iter()
            .fold(session.request(Method::Post, url.clone()), |request, (key, value)| {
                request.form_field(key, value)
            });
        (url, request)
    };

    let response = session.send(&request)?;
    if response.status != CREATED {
        return Err(Error::Trigger {
            url: url.to_string(),
            status: response.status,
            body: response.body_text(),
        });
    }

    let location = response
        .header("Location")
        .ok_or_else(|| Error::protocol(url.as_str(), "201 response without a Location header"))?;
    let queue_url = session.queue_status_url(location)?;
    info!(%queue_url, "Build is queued");
    Ok(queue_url)
}
