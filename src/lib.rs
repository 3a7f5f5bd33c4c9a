//! # x-BIMU Logger Library
//!
//! Decode and record wireless x-BIMU inertial measurement data.
//!
//! This library provides the core functionality for talking to an x-BIMU's
//! XBee transceiver: the serial transport, the channel discovery handshake,
//! the binary packet codec, rate statistics and CSV telemetry logging.

pub mod config;
pub mod error;
pub mod handshake;
pub mod protocol;
pub mod serial;
pub mod session;
pub mod stats;
pub mod telemetry;
