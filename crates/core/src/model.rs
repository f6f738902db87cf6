//! JSON documents returned by the Jenkins remote API

use serde::Deserialize;

/// Anti-forgery token from `/crumbIssuer/api/json`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crumb {
    /// Header name the crumb must be sent under
    pub crumb_request_field: String,
    /// Header value
    pub crumb: String,
}

/// Queue item status from `<queue item>/api/json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueItem {
    /// Why the item is still waiting; `null` once it left the queue
    #[serde(default)]
    pub why: Option<String>,
    /// The run the item turned into, once assigned
    #[serde(default)]
    pub executable: Option<Executable>,
    /// Set when someone cancelled the item
    #[serde(default)]
    pub cancelled: Option<bool>,
}

/// Reference to a run from a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Executable {
    /// Run number within the job
    pub number: u64,
}

/// Run status from `/job/{job}/{n}/api/json`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BuildStatus {
    /// Whether the run is still executing
    #[serde(default)]
    pub building: Option<bool>,
}

impl BuildStatus {
    /// A missing `building` field counts as finished
    #[must_use]
    pub fn is_building(self) -> bool {
        self.building.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crumb_field_names() {
        let crumb: Crumb = serde_json::from_str(
            r#"{
                "_class": "hudson.security.csrf.DefaultCrumbIssuer",
                "crumb": "abc",
                "crumbRequestField": "Jenkins-Crumb"
            }"#,
        )
        .unwrap();
        assert_eq!(crumb.crumb_request_field, "Jenkins-Crumb");
        assert_eq!(crumb.crumb, "abc");
    }

    #[test]
    fn test_waiting_queue_item() {
        let item: QueueItem = serde_json::from_str(
            r#"{"why":"Waiting for next available executor","executable":null}"#,
        )
        .unwrap();
        assert_eq!(item.why.as_deref(), Some("Waiting for next available executor"));
        assert!(item.executable.is_none());
    }

    #[test]
    fn test_started_queue_item() {
        let json = r#"{
            "why": null,
            "cancelled": false,
            "executable": {"number": 42, "url": "http://ci/job/app/42/"}
        }"#;
        let item: QueueItem = serde_json::from_str(json).unwrap();
        assert!(item.why.is_none());
        assert_eq!(item.executable, Some(Executable { number: 42 }));
        assert_eq!(item.cancelled, Some(false));
    }

    #[test]
    fn test_build_status() {
        let status: BuildStatus =
            serde_json::from_str(r#"{"building":true,"result":null}"#).unwrap();
        assert!(status.is_building());

        let status: BuildStatus = serde_json::from_str(r#"{"result":"SUCCESS"}"#).unwrap();
        assert!(!status.is_building());
    }
}
