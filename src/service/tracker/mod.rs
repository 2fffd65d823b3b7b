pub mod jira;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::base::types::{Res, Void};

// Traits.

/// Generic issue tracker trait that clients must implement.
///
/// The intake files finished reports through this seam.
#[async_trait]
pub trait GenericTrackerClient: Send + Sync + 'static {
    /// Create an issue, and return its key.
    ///
    /// `description_markdown` is converted to the tracker's rich text format.
    /// `extra_fields` are merged into the issue fields as-is.
    async fn create_issue(&self, summary: &str, description_markdown: &str, extra_fields: Map<String, Value>) -> Res<String>;

    /// Update fields on an existing issue. An empty field set is a no-op.
    async fn update_issue(&self, key: &str, fields: Map<String, Value>) -> Void;

    /// Attach a Markdown file to an issue.
    async fn attach_markdown(&self, key: &str, filename: &str, content: &str) -> Void;
}

// Structs.

/// Tracker client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct TrackerClient {
    inner: Arc<dyn GenericTrackerClient>,
}

impl Deref for TrackerClient {
    type Target = dyn GenericTrackerClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl TrackerClient {
    pub fn new(inner: Arc<dyn GenericTrackerClient>) -> Self {
        Self { inner }
    }

    /// A tracker that fails every call with `reason`.
    ///
    /// Used when the tracker is not configured, so the problem surfaces when a
    /// user asks for an issue rather than at startup.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(UnavailableTracker { reason: reason.into() }),
        }
    }
}

struct UnavailableTracker {
    reason: String,
}

#[async_trait]
impl GenericTrackerClient for UnavailableTracker {
    async fn create_issue(&self, _summary: &str, _description_markdown: &str, _extra_fields: Map<String, Value>) -> Res<String> {
        Err(anyhow::anyhow!("{}", self.reason))
    }

    async fn update_issue(&self, _key: &str, _fields: Map<String, Value>) -> Void {
        Err(anyhow::anyhow!("{}", self.reason))
    }

    async fn attach_markdown(&self, _key: &str, _filename: &str, _content: &str) -> Void {
        Err(anyhow::anyhow!("{}", self.reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_tracker_reports_its_reason() {
        let tracker = TrackerClient::unavailable("Missing Jira configuration.");

        let err = tracker.create_issue("Security incident", "# 1.", Map::new()).await.unwrap_err();

        assert_eq!(err.to_string(), "Missing Jira configuration.");
    }
}
