//! HTTP notification sink

use std::time::Duration;

use super::{NotificationEvent, NotificationSink};

/// Sends each event as a GET to a notification endpoint with `text`,
/// `timeout` and `type` query parameters (the contract of the local
/// display daemon this feeds).
pub struct HttpSink {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSink {
    /// Create a sink posting to `url`. Requests time out after 2 s so a
    /// dead endpoint cannot stall the watcher for long.
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            url: url.into(),
            client,
        }
    }
}

impl NotificationSink for HttpSink {
    fn notify(&self, event: &NotificationEvent) {
        let kind = match event.severity {
            super::Severity::Info => "info",
            super::Severity::Alert => "error",
        };
        let timeout = event.severity.display_seconds().to_string();
        let result = self
            .client
            .get(&self.url)
            .query(&[
                ("text", event.text.as_str()),
                ("timeout", timeout.as_str()),
                ("type", kind),
            ])
            .send();
        if let Err(e) = result {
            tracing::debug!(url = %self.url, error = %e, "http notification dropped");
        }
    }
}
