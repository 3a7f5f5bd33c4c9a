//! # Telemetry Module
//!
//! Persists decoded packets to per-kind CSV log files.
//!
//! This module handles:
//! - One append-only CSV stream per packet kind, created lazily
//! - Relative timestamps latched to the first write of a session
//! - Truncation of same-named files from earlier sessions
//! - Race-safe close against writes arriving from the byte path

pub mod writer;

pub use writer::CsvLogWriter;
