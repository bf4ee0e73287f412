//! Hardware serial link
//!
//! Blocking serialport-backed implementation of [`SerialLink`].

use serialport::SerialPort;
use std::io::Write;
use std::time::{Duration, Instant};

use super::{LinkError, SerialLink, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Open the actuator controller's serial device with default settings
pub fn open_port(name: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialPort>, LinkError> {
    serialport::new(name, baud_rate)
        .timeout(timeout)
        .open()
        .map_err(|e| LinkError::Unavailable(e.to_string()))
}

/// Configure a serial port for controller communication (8N1, no flow control)
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), LinkError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| LinkError::Unavailable(e.to_string()))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| LinkError::Unavailable(e.to_string()))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| LinkError::Unavailable(e.to_string()))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| LinkError::Unavailable(e.to_string()))?;

    // Opening the port pulses DTR, which resets Arduino-class
    // controllers into their bootloader. Keep DTR asserted so a lazy
    // reopen after a fault does not reboot the controller and lose its
    // position counter.
    if let Err(e) = port.write_data_terminal_ready(true) {
        tracing::warn!(error = %e, "failed to assert DTR (continuing)");
    }
    if let Err(e) = port.write_request_to_send(true) {
        tracing::warn!(error = %e, "failed to assert RTS (continuing)");
    }

    Ok(())
}

/// Serial link to the physical actuator controller.
///
/// The handle is opened lazily by the broker and dropped on any fault,
/// so a disconnected or power-cycled controller only costs one failed
/// transaction before the next reopen attempt.
pub struct HardwareLink {
    /// Device path (e.g. "/dev/ttyUSB0")
    path: String,
    /// Baud rate
    baud_rate: u32,
    /// Per-transaction read deadline
    timeout: Duration,
    /// Open handle, if any
    port: Option<Box<dyn SerialPort>>,
}

impl HardwareLink {
    /// Create a link for `path` with the default baud rate and timeout
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            port: None,
        }
    }

    /// Override the per-transaction read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Device path this link opens
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read one newline-terminated reply within the deadline.
    ///
    /// serialport read timeouts are per call, so a device trickling out
    /// bytes cannot extend the transaction past `self.timeout`.
    fn read_line(port: &mut dyn SerialPort, deadline: Duration) -> Result<String, LinkError> {
        let start = Instant::now();
        let mut line: Vec<u8> = Vec::with_capacity(64);
        let mut byte = [0u8; 1];

        loop {
            if start.elapsed() > deadline {
                return Err(LinkError::Fault("read timed out".to_string()));
            }
            match port.read(&mut byte) {
                Ok(0) => return Err(LinkError::Fault("device closed the line".to_string())),
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    if byte[0] != b'\r' {
                        line.push(byte[0]);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(LinkError::Fault("read timed out".to_string()));
                }
                Err(e) => return Err(LinkError::Fault(e.to_string())),
            }
        }

        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn transact_inner(&mut self, command: &str) -> Result<String, LinkError> {
        let timeout = self.timeout;
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| LinkError::Fault("link not open".to_string()))?;

        port.write_all(command.as_bytes())
            .map_err(|e| LinkError::Fault(e.to_string()))?;
        port.write_all(b"\n")
            .map_err(|e| LinkError::Fault(e.to_string()))?;

        let reply = Self::read_line(port.as_mut(), timeout)?;
        if reply.trim().is_empty() {
            return Err(LinkError::Fault("empty reply".to_string()));
        }
        Ok(reply)
    }
}

impl SerialLink for HardwareLink {
    fn open(&mut self) -> Result<(), LinkError> {
        if self.port.is_some() {
            return Ok(());
        }
        let mut port = open_port(&self.path, self.baud_rate, self.timeout)?;
        configure_port(port.as_mut())?;
        // Drop anything the controller emitted while nobody was listening
        let _ = port.clear(serialport::ClearBuffer::All);
        tracing::info!(path = %self.path, baud = self.baud_rate, "serial link opened");
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!(path = %self.path, "serial link closed");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn transact(&mut self, command: &str) -> Result<String, LinkError> {
        let result = self.transact_inner(command);
        if let Err(ref e) = result {
            tracing::warn!(path = %self.path, error = %e, "transaction failed, closing link");
            self.close();
        }
        result
    }
}
