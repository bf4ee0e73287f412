//! # Actumux Core Library
//!
//! Core functionality for the Actumux actuator multiplexer.
//!
//! A single serial-attached motor controller is shared between several
//! network clients: everyone may read status, exactly one session at a
//! time may hold the motion lock. This library provides:
//! - The serial link to the controller (hardware or simulated)
//! - The broker that serializes device access and arbitrates the lock
//! - The TCP line-protocol front end
//! - The change watcher that turns status diffs into notifications

#![warn(missing_docs)]

pub mod broker;
pub mod link;
pub mod notify;
pub mod server;
pub mod status;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::broker::{Broker, LockState, SessionId};
    pub use crate::link::{HardwareLink, LinkError, SerialLink, SimulatedLink};
    pub use crate::notify::{
        FileMarker, HttpSink, NotificationEvent, NotificationSink, Severity, UdpSink,
    };
    pub use crate::server::{serve, serve_on, ServerConfig};
    pub use crate::status::{ActuatorStatus, ErrorCode, StatusCode, StatusParseError};
    pub use crate::watcher::{ChangeWatcher, MovementSignal};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
