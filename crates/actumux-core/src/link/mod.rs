//! Serial link to the actuator controller
//!
//! One physical serial device, owned exclusively by the broker. The
//! [`SerialLink`] trait hides whether the other end is real hardware or
//! the in-process simulator used by `--test` mode and the test suite.

mod error;
pub mod serial;
pub mod sim;

pub use error::LinkError;
pub use serial::HardwareLink;
pub use sim::SimulatedLink;

/// Baud rate of the actuator controller's serial interface
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Per-transaction read timeout in milliseconds. The controller either
/// answers well within this or not at all.
pub const DEFAULT_TIMEOUT_MS: u64 = 1_000;

/// One serial-attached actuator controller.
///
/// A transaction is strictly write-one-line, read-one-line; the device
/// never speaks unprompted. Implementations must close themselves on a
/// [`LinkError::Fault`] so a half-broken handle is never reused.
pub trait SerialLink: Send {
    /// Acquire the device. Idempotent when already open.
    fn open(&mut self) -> Result<(), LinkError>;

    /// Release the device if held. Idempotent.
    fn close(&mut self);

    /// Whether the link currently holds an open device handle.
    fn is_open(&self) -> bool;

    /// Write `command` as one line and read the one-line reply.
    ///
    /// An empty reply line means the device did not answer and is
    /// reported as a fault, not as a valid empty status.
    fn transact(&mut self, command: &str) -> Result<String, LinkError>;
}
