//! # x-BIMU Logger
//!
//! Record wireless x-BIMU inertial measurement data to CSV files.
//!
//! This application connects to the x-BIMU's XBee transceiver over a serial
//! port, decodes the binary packet stream and logs orientation, raw sensor
//! and battery packets to one CSV file per packet kind.

use anyhow::Result;
use tokio::time::{interval, Duration};
use tracing::info;
use tracing_subscriber;

mod config;
mod error;
mod handshake;
mod protocol;
mod serial;
mod session;
mod stats;
mod telemetry;

use config::Config;
use session::{DeviceSession, SessionOptions};

/// Seconds between status log lines
const STATUS_INTERVAL_SECS: u64 = 1;

/// Configuration file read when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the x-BIMU logger application
///
/// Connects to the transceiver, starts a CSV recording and reports progress
/// once per second until interrupted.
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (first CLI argument, or `config/default.toml`)
///    - Connect to the configured port, or probe every port when none is set
///
/// 2. **Recording**
///    - Background tasks decode packets and keep rate statistics
///    - Start a CSV recording under the configured log directory
///    - Log packet totals, rate and battery voltage once per second
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C stops the recording and flushes every log file
///    - Disconnect from the transceiver and exit
///
/// # Errors
///
/// Returns error if:
/// - The configuration file is present but invalid
/// - No x-BIMU transceiver answers the handshake
/// - The log directory cannot be created
///
/// # Examples
///
/// Run the application:
/// ```bash
/// cargo run --release
/// ```
///
/// Expected output:
/// ```text
/// INFO xbimu_logger: x-BIMU Logger v0.1.0 starting...
/// INFO xbimu_logger::session: Connected to x-BIMU on /dev/ttyUSB0 (channel 26)
/// INFO xbimu_logger::session: Logging telemetry to ./logs/xbimu_20260823_141502_26_*.csv
/// INFO xbimu_logger: Received 512 packets (128/s), battery 4.02 V
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("x-BIMU Logger v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    let mut session = DeviceSession::new(SessionOptions::from_config(&config));

    let channel = if config.serial.port.is_empty() {
        info!("No port configured; probing for an x-BIMU transceiver");
        session.auto_connect().await?
    } else {
        session.connect(&config.serial.port).await?
    };
    info!("Transceiver ready on channel {}", channel);

    std::fs::create_dir_all(&config.logging.directory)?;
    session.start_logging(&config.logging.session_base_path())?;

    let mut status_interval = interval(Duration::from_secs(STATUS_INTERVAL_SECS));
    info!("Press Ctrl+C to stop recording");

    // Main status loop
    loop {
        tokio::select! {
            _ = status_interval.tick() => {
                info!(
                    "Received {} packets ({}/s), battery {:.2} V",
                    session.packets_received(),
                    session.packet_rate(),
                    session.battery_voltage()
                );
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Total packets received: {}", session.packets_received());
    session.stop_logging();
    session.disconnect().await;

    Ok(())
}
