//! Actumux daemon
//!
//! Owns the serial link to the actuator controller and serves it to any
//! number of TCP clients, so more than one program can drive the
//! actuator at the same time. A background watcher reports state
//! changes to optional notification sinks.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use actumux_core::broker::Broker;
use actumux_core::link::{HardwareLink, SerialLink, SimulatedLink};
use actumux_core::notify::{FileMarker, HttpSink, UdpSink};
use actumux_core::server::{serve, ServerConfig, DEFAULT_PORT};
use actumux_core::watcher::ChangeWatcher;

/// TCP socket <-> serial actuator multiplexer
#[derive(Parser, Debug)]
#[command(name = "actumux", version, about)]
struct Args {
    /// Serial port connected to the actuator (e.g. /dev/ttyUSB0)
    #[arg(required_unless_present = "test")]
    serial: Option<String>,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Use a simulated actuator instead of the serial port
    #[arg(short, long)]
    test: bool,

    /// Status poll interval for the change watcher, milliseconds
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,

    /// HTTP endpoint notified on state changes
    #[arg(long)]
    notify_url: Option<String>,

    /// Remote display peer notified via UDP (repeatable)
    #[arg(long = "udp-peer")]
    udp_peers: Vec<IpAddr>,

    /// Marker file created while the actuator is moving
    #[arg(long)]
    marker_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let link: Box<dyn SerialLink> = if args.test {
        tracing::info!("test mode, using simulated actuator");
        Box::new(SimulatedLink::new())
    } else {
        let path = args
            .serial
            .as_deref()
            .context("serial port argument is required outside test mode")?;
        Box::new(HardwareLink::new(path))
    };

    let broker = Arc::new(Broker::new(link));

    let mut watcher = ChangeWatcher::new(Arc::clone(&broker));
    watcher.set_poll_interval(Duration::from_millis(args.poll_interval_ms));
    if let Some(url) = &args.notify_url {
        watcher.add_sink(Box::new(HttpSink::new(url)));
    }
    if !args.udp_peers.is_empty() {
        watcher.add_sink(Box::new(UdpSink::new(args.udp_peers.iter().copied())));
    }
    if let Some(path) = &args.marker_file {
        watcher.set_movement_signal(Box::new(FileMarker::new(path)));
    }

    // The watcher runs for the life of the process
    static NEVER_STOP: AtomicBool = AtomicBool::new(false);
    thread::Builder::new()
        .name("change-watcher".to_string())
        .spawn(move || watcher.run(&NEVER_STOP))
        .context("failed to spawn change watcher")?;

    let config = ServerConfig {
        bind_addr: args.bind,
        port: args.port,
    };
    serve(broker, &config).context("tcp listener failed")?;
    Ok(())
}
