//! # Device Session
//!
//! Owns one connection to an x-BIMU and everything that hangs off it.
//!
//! This module handles:
//! - Connecting to a named port or probing every port on the machine
//! - Running the XBee handshake and remembering the discovered channel
//! - A background reader task that decodes frames as bytes arrive
//! - A once-per-second ticker that refreshes the packet rate
//! - Routing decoded packets into the CSV telemetry writer
//!
//! The session stays usable from the main task while the reader runs: all
//! shared state lives behind atomics or short-held locks, so status getters
//! never block on serial I/O.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, XbimuError};
use crate::handshake::{run_handshake, HandshakeTiming};
use crate::protocol::decoder::FrameDecoder;
use crate::protocol::packet::Packet;
use crate::serial::transport::{SerialTransport, Transport};
use crate::serial::{self, XBIMU_BAUD_RATE};
use crate::stats::{PacketCounter, RATE_TICK_INTERVAL};
use crate::telemetry::CsvLogWriter;

/// Channel value meaning "no device connected"
const UNCONNECTED: i32 = -1;

/// Settings a session is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Serial baud rate, normally [`XBIMU_BAUD_RATE`]
    pub baud_rate: u32,
    /// Handshake delays
    pub handshake: HandshakeTiming,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            baud_rate: XBIMU_BAUD_RATE,
            handshake: HandshakeTiming::default(),
        }
    }
}

impl SessionOptions {
    /// Build session options from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            baud_rate: config.serial.baud_rate,
            handshake: HandshakeTiming {
                guard_delay: Duration::from_millis(config.handshake.guard_delay_ms),
                command_delay: Duration::from_millis(config.handshake.command_delay_ms),
            },
        }
    }
}

/// State shared between the session handle and its background tasks.
#[derive(Debug)]
struct SessionShared {
    /// Radio channel from the handshake, or [`UNCONNECTED`]
    channel: AtomicI32,
    /// Most recent battery reading in millivolts
    battery_mv: AtomicI32,
    counter: PacketCounter,
    writer: RwLock<Option<CsvLogWriter>>,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            channel: AtomicI32::new(UNCONNECTED),
            battery_mv: AtomicI32::new(0),
            counter: PacketCounter::new(),
            writer: RwLock::new(None),
        }
    }
}

/// Connection to one x-BIMU transceiver.
///
/// A session is connected to at most one port at a time. Connecting runs
/// the XBee handshake, then spawns the reader and rate ticker tasks;
/// disconnecting (or dropping the session) tears both down.
///
/// # Examples
///
/// ```no_run
/// use xbimu_logger::session::{DeviceSession, SessionOptions};
///
/// #[tokio::main]
/// async fn main() -> xbimu_logger::error::Result<()> {
///     let mut session = DeviceSession::new(SessionOptions::default());
///     let channel = session.auto_connect().await?;
///     println!("Connected on channel {}", channel);
///
///     session.start_logging("logs/flight")?;
///     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
///     session.stop_logging();
///     session.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct DeviceSession {
    shared: Arc<SessionShared>,
    options: SessionOptions,
    port_name: Option<String>,
    reader: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl DeviceSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            shared: Arc::new(SessionShared::new()),
            options,
            port_name: None,
            reader: None,
            ticker: None,
        }
    }

    /// Connect to the transceiver on a specific port.
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0" or "COM3")
    ///
    /// # Returns
    ///
    /// * `Result<u8>` - The radio channel the transceiver reported
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be opened or the handshake fails
    pub async fn connect(&mut self, path: &str) -> Result<u8> {
        let port = serial::open_port(path, self.options.baud_rate)?;
        let channel = self
            .connect_with(Box::new(SerialTransport::new(port)))
            .await?;

        self.port_name = Some(path.to_string());
        info!("Connected to x-BIMU on {} (channel {})", path, channel);
        Ok(channel)
    }

    /// Probe every serial port on the machine until one answers the
    /// handshake.
    ///
    /// Ports that cannot be opened, or that hold no transceiver, are
    /// skipped. The port of the first successful handshake wins.
    ///
    /// # Returns
    ///
    /// * `Result<u8>` - The radio channel the transceiver reported
    ///
    /// # Errors
    ///
    /// Returns [`XbimuError::DeviceNotFound`] listing the ports tried
    pub async fn auto_connect(&mut self) -> Result<u8> {
        let ports = serial::list_ports()?;

        for path in &ports {
            debug!("Probing {} for an x-BIMU transceiver", path);
            match self.connect(path).await {
                Ok(channel) => return Ok(channel),
                Err(e) => {
                    debug!("No transceiver on {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(XbimuError::DeviceNotFound(ports.join(", ")))
    }

    /// Connect over an already-open transport.
    ///
    /// Any existing connection is torn down first. On handshake success the
    /// packet counter restarts from zero and the background tasks spawn.
    pub(crate) async fn connect_with(&mut self, mut port: Box<dyn Transport>) -> Result<u8> {
        self.disconnect().await;

        let channel = run_handshake(port.as_mut(), &self.options.handshake).await?;

        self.shared.counter.reset();
        self.shared.battery_mv.store(0, Ordering::Release);
        self.shared.channel.store(channel as i32, Ordering::Release);

        self.reader = Some(self.spawn_reader(port));
        self.ticker = Some(self.spawn_ticker());
        Ok(channel)
    }

    /// Tear down the connection and its background tasks.
    ///
    /// Any active logging session is closed first so every buffered line
    /// reaches disk. Harmless when already disconnected.
    pub async fn disconnect(&mut self) {
        self.stop_logging();

        if let Some(handle) = self.reader.take() {
            handle.abort();
            let _ = handle.await;
        }
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            let _ = handle.await;
        }

        if self.shared.channel.swap(UNCONNECTED, Ordering::AcqRel) != UNCONNECTED {
            info!("Disconnected from x-BIMU");
        }
        self.shared.battery_mv.store(0, Ordering::Release);
        self.port_name = None;
    }

    /// Start logging decoded packets to CSV files.
    ///
    /// The channel id is appended to the base path, so recordings from
    /// different devices never collide; the writer then appends the packet
    /// kind per file. A logging session already in progress is closed and
    /// replaced.
    ///
    /// # Arguments
    ///
    /// * `base_path` - Path prefix for this recording's files
    ///
    /// # Errors
    ///
    /// Returns [`XbimuError::NotConnected`] if no device is connected
    pub fn start_logging(&self, base_path: &str) -> Result<()> {
        let channel = self.channel().ok_or(XbimuError::NotConnected)?;
        let scoped = format!("{}_{}", base_path, channel);

        let previous = {
            let mut slot = self.shared.writer.write().unwrap_or_else(|e| e.into_inner());
            slot.replace(CsvLogWriter::new(scoped.clone()))
        };
        if let Some(previous) = previous {
            previous.close();
        }

        info!("Logging telemetry to {}_*.csv", scoped);
        Ok(())
    }

    /// Stop logging and flush every open CSV file.
    ///
    /// Packets keep counting toward the totals; they just stop reaching
    /// disk. Harmless when logging is not active.
    pub fn stop_logging(&self) {
        let writer = {
            let mut slot = self.shared.writer.write().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };

        if let Some(writer) = writer {
            // Close outside the lock so the reader task is never held up
            // behind the final flush.
            writer.close();
            info!("Telemetry logging stopped");
        }
    }

    /// Radio channel of the connected transceiver, if any.
    pub fn channel(&self) -> Option<u8> {
        let raw = self.shared.channel.load(Ordering::Acquire);
        (raw != UNCONNECTED).then_some(raw as u8)
    }

    pub fn is_connected(&self) -> bool {
        self.channel().is_some()
    }

    /// Latest battery reading in volts; 0.0 until a battery packet arrives.
    pub fn battery_voltage(&self) -> f32 {
        self.shared.battery_mv.load(Ordering::Acquire) as f32 / 1000.0
    }

    /// Packets decoded since the current connection was established.
    pub fn packets_received(&self) -> u64 {
        self.shared.counter.total_received()
    }

    /// Decoded packets per second over the last rate window.
    pub fn packet_rate(&self) -> u32 {
        self.shared.counter.rate_per_second()
    }

    pub fn is_logging(&self) -> bool {
        self.shared
            .writer
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Device path of the connected port, when connected by name.
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    fn spawn_reader(&self, mut port: Box<dyn Transport>) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);

        tokio::spawn(async move {
            let mut decoder = FrameDecoder::new();
            let mut buf = [0u8; 512];

            loop {
                match port.read(&mut buf).await {
                    Ok(0) => {
                        warn!("Serial port closed; stopping packet reader");
                        break;
                    }
                    Ok(n) => {
                        for &byte in &buf[..n] {
                            if let Some(packet) = decoder.push_byte(byte) {
                                handle_packet(&shared, &packet);
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Serial read failed: {}", e);
                        break;
                    }
                }
            }
        })
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(RATE_TICK_INTERVAL);
            // The first tick completes immediately; skip it so every rate
            // sample covers a full window.
            tick.tick().await;
            loop {
                tick.tick().await;
                shared.counter.tick();
            }
        })
    }
}

impl Default for DeviceSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if let Some(handle) = self.reader.take() {
            handle.abort();
        }
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

/// Fold one decoded packet into the shared session state.
///
/// The counter increments after the packet has been offered to the writer,
/// so a caller observing the new total also sees its line on disk.
fn handle_packet(shared: &SessionShared, packet: &Packet) {
    if let Packet::Battery { millivolts, .. } = *packet {
        shared.battery_mv.store(millivolts, Ordering::Release);
    }

    {
        let writer = shared.writer.read().unwrap_or_else(|e| e.into_inner());
        if let Some(writer) = writer.as_ref() {
            if let Err(e) = writer.write_packet(packet) {
                warn!("Failed to log packet: {}", e);
            }
        }
    }

    shared.counter.increment();
}
