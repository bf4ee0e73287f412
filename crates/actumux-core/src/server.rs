//! TCP front end
//!
//! Newline-delimited text protocol, one request line in, one reply line
//! out, one thread per accepted connection. Sessions block for the
//! duration of each device transaction, which is the intended
//! back-pressure: the serial device is the bottleneck, not the network.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::broker::{Broker, SessionId};

/// Default TCP listen port
pub const DEFAULT_PORT: u16 = 12345;

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub bind_addr: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Bind and serve forever.
pub fn serve(broker: Arc<Broker>, config: &ServerConfig) -> io::Result<()> {
    let listener = TcpListener::bind((config.bind_addr.as_str(), config.port))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    let never_stop = AtomicBool::new(false);
    serve_on(broker, listener, &never_stop)
}

/// Accept connections on `listener` until `stop` is set.
///
/// Each connection gets its own session identity and serving thread.
/// The accept loop polls so the stop flag is honored within ~50 ms.
pub fn serve_on(broker: Arc<Broker>, listener: TcpListener, stop: &AtomicBool) -> io::Result<()> {
    listener.set_nonblocking(true)?;
    while !stop.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let session = SessionId::new();
                tracing::info!(%peer, %session, "connection opened");
                let broker = Arc::clone(&broker);
                // One thread per connection, like the device's one
                // request in flight at a time; unbounded by design
                thread::Builder::new()
                    .name(format!("session-{session}"))
                    .spawn(move || {
                        if let Err(e) = serve_session(&broker, &stream, session) {
                            tracing::debug!(%session, error = %e, "session ended with error");
                        }
                        broker.release(session);
                        tracing::info!(%peer, %session, "connection closed");
                    })?;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// One session's request/reply loop. Returns on EOF or socket error;
/// the caller releases any lock the session still holds.
fn serve_session(broker: &Broker, stream: &TcpStream, session: SessionId) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream.try_clone()?;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(()); // EOF
        }
        let reply = broker.execute(session, &line);
        writer.write_all(reply.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
}
