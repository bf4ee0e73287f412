//! Change watcher
//!
//! Background poller that queries status through the broker, diffs it
//! against the last observed state, and turns meaningful changes into
//! notification events plus a movement-in-progress signal. It contends
//! for the broker's mutex like any other session and never touches the
//! link directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::broker::{Broker, SessionId, REPLY_ERR, REPLY_LOCKED};
use crate::notify::{NotificationEvent, NotificationSink};
use crate::status::{ActuatorStatus, ErrorCode, StatusCode};

/// Default pause between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How close to the target the stopped actuator must be for movement to
/// count as finished. Settling jitter keeps the final position from
/// matching the target exactly.
pub const MOVEMENT_TOLERANCE: u64 = 5;

/// Consumer of the movement-in-progress signal
pub trait MovementSignal: Send + Sync {
    /// Assert or clear the signal. Called only on edges, not per poll.
    fn set_moving(&self, moving: bool);
}

/// The fields whose change is worth reporting
type WatcherKey = (StatusCode, ErrorCode, i64, i64);

fn key_of(status: &ActuatorStatus) -> WatcherKey {
    (status.status, status.error, status.target, status.position)
}

/// Polls the broker and emits notifications on state changes.
pub struct ChangeWatcher {
    broker: Arc<Broker>,
    session: SessionId,
    sinks: Vec<Box<dyn NotificationSink>>,
    movement: Option<Box<dyn MovementSignal>>,
    poll_interval: Duration,
    /// Last observed (status, error, target, position); None after a
    /// failed cycle so the next good read always registers as a change
    memory: Option<WatcherKey>,
    moving: bool,
}

impl ChangeWatcher {
    /// Create a watcher with its own broker session
    pub fn new(broker: Arc<Broker>) -> Self {
        Self {
            broker,
            session: SessionId::new(),
            sinks: Vec::new(),
            movement: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            memory: None,
            moving: false,
        }
    }

    /// Add a notification sink
    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    /// Wire the movement-in-progress signal
    pub fn set_movement_signal(&mut self, signal: Box<dyn MovementSignal>) {
        self.movement = Some(signal);
    }

    /// Override the poll cadence
    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    /// Run until `stop` is set. Sleeps first so a crashing device does
    /// not turn the loop into a busy spin.
    pub fn run(&mut self, stop: &AtomicBool) {
        tracing::info!(interval_ms = self.poll_interval.as_millis() as u64, "change watcher started");
        while !stop.load(Ordering::Relaxed) {
            std::thread::sleep(self.poll_interval);
            if stop.load(Ordering::Relaxed) {
                break;
            }
            self.poll_once();
        }
        tracing::info!("change watcher stopped");
    }

    /// One poll/diff/notify cycle. Public so tests can drive the
    /// watcher without threads or sleeps.
    pub fn poll_once(&mut self) {
        let reply = self.broker.execute(self.session, "?");
        if reply == REPLY_ERR || reply == REPLY_LOCKED {
            // No status this cycle; forget the last one so the next
            // successful read is reported rather than swallowed
            self.memory = None;
            return;
        }

        let status: ActuatorStatus = match reply.parse() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, reply, "malformed status reply");
                self.memory = None;
                return;
            }
        };

        let key = key_of(&status);
        if self.memory == Some(key) {
            return;
        }
        self.memory = Some(key);

        let event = NotificationEvent::from_status(&status);
        tracing::info!(
            text = %event.text,
            target = event.target,
            position = event.position,
            "actuator state changed"
        );
        for sink in &self.sinks {
            sink.notify(&event);
        }

        self.update_movement(&status);
    }

    fn update_movement(&mut self, status: &ActuatorStatus) {
        let settled = status.status == StatusCode::Stopped
            && status.position.abs_diff(status.target) <= MOVEMENT_TOLERANCE;
        if status.status != StatusCode::Stopped && !self.moving {
            self.moving = true;
            if let Some(signal) = &self.movement {
                signal.set_moving(true);
            }
        } else if settled && self.moving {
            self.moving = false;
            if let Some(signal) = &self.movement {
                signal.set_moving(false);
            }
        }
    }
}
