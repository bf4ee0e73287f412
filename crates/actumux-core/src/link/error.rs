//! Link errors

use thiserror::Error;

/// Errors that can occur on the serial link to the actuator controller
#[derive(Error, Debug)]
pub enum LinkError {
    /// The serial device could not be opened. Recovered by lazy retry on
    /// the next call that needs the link.
    #[error("Serial device unavailable: {0}")]
    Unavailable(String),

    /// A write failed, a read timed out, or the device answered with an
    /// empty line mid-transaction. The link is closed before this is
    /// returned so the next caller goes through a fresh open.
    #[error("Link fault: {0}")]
    Fault(String),
}
