//! Queue waiter
//!
//! Polls the queue item until Jenkins assigns it a run number. The budget is a
//! count of waiting polls, not wall-clock time: only a poll that finds the item
//! still waiting consumes a tick (and a sleep).

use crate::http::{Method, Transport};
use crate::model::QueueItem;
use crate::session::JenkinsSession;
use crate::{Error, Result};
use reqwest::Url;
use tracing::{info, instrument};

/// Reason reported when an item left the queue but has no run yet
const PENDING_EXECUTABLE: &str = "pending executable assignment";

/// Wait until the queue item at `queue_url` starts, returning its run number.
#[instrument(skip_all, fields(queue_url = %queue_url))]
pub fn wait_for_start<T: Transport>(
    session: &JenkinsSession<'_, T>,
    queue_url: &Url,
) -> Result<u64> {
    let budget = session.config().queue_budget();
    let mut remaining = budget;
    info!(budget, "Waiting for build to start");

    loop {
        let response = session.send(&session.request(Method::Get, queue_url.clone()))?;
        if response.status != 200 {
            return Err(Error::QueuePoll {
                url: queue_url.to_string(),
                status: response.status,
                body: response.body_text(),
            });
        }

        let item: QueueItem = response.json(queue_url)?;
        if item.cancelled == Some(true) {
            return Err(Error::QueueCancelled {
                url: queue_url.to_string(),
            });
        }

        match (item.why, item.executable) {
            (None, Some(executable)) => {
                info!(number = executable.number, "Build started");
                return Ok(executable.number);
            }
            (Some(reason), _) => info!(%reason, remaining, "Waiting for build to start"),
            (None, None) => {
                info!(reason = PENDING_EXECUTABLE, remaining, "Waiting for build to start");
            }
        }

        remaining -= 1;
        if remaining == 0 {
            return Err(Error::QueueTimeout {
                url: queue_url.to_string(),
                polls: budget,
            });
        }
        session.pause();
    }
}
