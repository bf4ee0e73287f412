//! Outbound notifications
//!
//! The change watcher produces [`NotificationEvent`]s; sinks deliver
//! them best-effort. A sink that is down or misconfigured logs its
//! failure and is otherwise invisible to the rest of the system.

mod http;
mod marker;
mod udp;

pub use http::HttpSink;
pub use marker::FileMarker;
pub use udp::{UdpSink, UDP_NOTIFY_PORT};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{ActuatorStatus, ErrorCode};

/// How prominently a notification should be surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine state change
    Info,
    /// The controller reports an active error
    Alert,
}

impl Severity {
    /// Suggested on-screen display time in seconds for display sinks
    pub fn display_seconds(self) -> u32 {
        match self {
            Severity::Info => 5,
            Severity::Alert => 10,
        }
    }
}

/// One state-change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Human-readable message: the status text, or the error text when
    /// an error is active
    pub text: String,
    /// Commanded target position at the time of the change
    pub target: i64,
    /// Position at the time of the change
    pub position: i64,
    /// Severity hint for display sinks
    pub severity: Severity,
    /// When the change was observed
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    /// Build the event describing `status`
    pub fn from_status(status: &ActuatorStatus) -> Self {
        let (text, severity) = if status.error == ErrorCode::None {
            (status.status.text().to_string(), Severity::Info)
        } else {
            (status.error.text().to_string(), Severity::Alert)
        };
        Self {
            text,
            target: status.target,
            position: status.position,
            severity,
            timestamp: Utc::now(),
        }
    }
}

/// Fire-and-forget notification consumer.
///
/// Implementations own their transport errors; `notify` cannot fail
/// from the caller's point of view.
pub trait NotificationSink: Send + Sync {
    /// Deliver one event, best-effort
    fn notify(&self, event: &NotificationEvent);
}
