//! # Serial Communication Module
//!
//! Handles serial communication with the x-BIMU XBee transceiver.
//!
//! This module handles:
//! - Opening serial ports at 115,200 baud (8N1, RTS/CTS flow control)
//! - Asserting DTR so the transceiver powers its radio
//! - Enumerating candidate ports for auto connection
//! - The async transport abstraction used by the device session

pub mod transport;

use crate::error::{Result, XbimuError};
use tokio_serial::{SerialPort, SerialPortBuilderExt};
use tracing::{debug, warn};

/// Serial baud rate of the x-BIMU XBee transceiver (115,200 baud)
pub const XBIMU_BAUD_RATE: u32 = 115_200;

/// Open a serial port with x-BIMU transceiver settings
///
/// The transceiver expects 8 data bits, no parity, one stop bit and RTS/CTS
/// flow control. DTR is asserted after opening; failure to assert it is
/// logged and tolerated since some USB adapters do not expose the line.
///
/// # Arguments
///
/// * `path` - Device path (e.g., "/dev/ttyUSB0" or "COM3")
/// * `baud_rate` - Baud rate, normally [`XBIMU_BAUD_RATE`]
///
/// # Returns
///
/// * `Result<SerialStream>` - Opened serial port
///
/// # Errors
///
/// Returns [`XbimuError::Serial`] if the port cannot be opened
pub fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    let mut port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::Hardware)
        .open_native_async()
        .map_err(|e| XbimuError::Serial(format!("Failed to open {}: {}", path, e)))?;

    if let Err(e) = port.write_data_terminal_ready(true) {
        warn!("Could not assert DTR on {}: {}", path, e);
    }

    debug!("Opened serial port {} at {} baud", path, baud_rate);
    Ok(port)
}

/// List the serial ports present on this machine
///
/// Port names are sorted so auto connection probes them in a stable order.
///
/// # Returns
///
/// * `Result<Vec<String>>` - Device paths, possibly empty
///
/// # Errors
///
/// Returns [`XbimuError::Serial`] if enumeration fails
pub fn list_ports() -> Result<Vec<String>> {
    let mut names: Vec<String> = tokio_serial::available_ports()
        .map_err(|e| XbimuError::Serial(format!("Failed to enumerate serial ports: {}", e)))?
        .into_iter()
        .map(|info| info.port_name)
        .collect();

    names.sort();
    Ok(names)
}
