//! # XBee Command Mode Handshake
//!
//! Discovers the transceiver's radio channel right after the port opens.
//!
//! This module handles:
//! - The "+++" guard sequence with silence windows either side
//! - Querying the channel (ATCH) and soft-resetting the radio (ATFR)
//! - Scanning response lines for the first hexadecimal channel id

use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::debug;

use crate::error::{Result, XbimuError};
use crate::serial::transport::Transport;

/// Escape sequence that switches the XBee into command mode
pub const COMMAND_MODE_GUARD: &[u8] = b"+++";

/// AT command asking the XBee for its radio channel
pub const CHANNEL_QUERY: &[u8] = b"ATCH\r";

/// AT command soft-resetting the XBee back into transparent mode
pub const SOFT_RESET: &[u8] = b"ATFR\r";

/// Silence the XBee requires around the guard sequence
const DEFAULT_GUARD_DELAY: Duration = Duration::from_millis(110);

/// Settle time after each AT command
const DEFAULT_COMMAND_DELAY: Duration = Duration::from_millis(50);

/// Longest response line worth keeping; anything beyond this is stream noise
const MAX_LINE_LEN: usize = 64;

/// Delays observed while driving the XBee command mode dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeTiming {
    /// Quiet window before and after the "+++" guard sequence
    pub guard_delay: Duration,
    /// Wait after each AT command for its response
    pub command_delay: Duration,
}

impl Default for HandshakeTiming {
    fn default() -> Self {
        Self {
            guard_delay: DEFAULT_GUARD_DELAY,
            command_delay: DEFAULT_COMMAND_DELAY,
        }
    }
}

/// Scans response bytes for the first line holding a hexadecimal channel id.
///
/// Lines end with a carriage return. A line qualifies when it is non-empty
/// and made only of digits and uppercase `A` to `F`, matching what the XBee
/// prints for `ATCH`. Once a channel is found, later lines are ignored.
#[derive(Debug, Default)]
pub struct ChannelScanner {
    line: String,
    channel: Option<u8>,
}

impl ChannelScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one response byte.
    pub fn push_byte(&mut self, byte: u8) {
        if byte == b'\r' {
            if self.channel.is_none() {
                self.channel = parse_channel_line(&self.line);
            }
            self.line.clear();
            return;
        }
        if self.line.len() >= MAX_LINE_LEN {
            self.line.clear();
        }
        self.line.push(byte as char);
    }

    /// Channel id discovered so far, if any.
    pub fn channel(&self) -> Option<u8> {
        self.channel
    }
}

fn parse_channel_line(line: &str) -> Option<u8> {
    if line.is_empty() {
        return None;
    }
    if !line
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'A'..=b'F'))
    {
        return None;
    }
    u8::from_str_radix(line, 16).ok()
}

/// Drive the XBee command mode dialogue and return the discovered channel.
///
/// The sequence mirrors the transceiver's expectations: a quiet settle
/// window, the "+++" guard, another quiet window, then `ATCH` and `ATFR`
/// each followed by a response window. Response bytes arriving anywhere in
/// the dialogue are scanned for the channel line.
///
/// # Arguments
///
/// * `port` - Open transport to the transceiver
/// * `timing` - Guard and command delays to observe
///
/// # Returns
///
/// * `Result<u8>` - The radio channel id
///
/// # Errors
///
/// Returns [`XbimuError::NoChannelDiscovered`] if no response line parsed as
/// a channel, or [`XbimuError::Serial`] if the port fails mid-dialogue
pub async fn run_handshake(port: &mut dyn Transport, timing: &HandshakeTiming) -> Result<u8> {
    let mut scanner = ChannelScanner::new();

    // The guard sequence only registers after a silent window.
    drain_into(port, &mut scanner, timing.guard_delay).await?;

    debug!("Entering XBee command mode");
    send(port, COMMAND_MODE_GUARD).await?;
    drain_into(port, &mut scanner, timing.guard_delay).await?;

    send(port, CHANNEL_QUERY).await?;
    drain_into(port, &mut scanner, timing.command_delay).await?;

    send(port, SOFT_RESET).await?;
    drain_into(port, &mut scanner, timing.command_delay).await?;

    let channel = scanner.channel().ok_or(XbimuError::NoChannelDiscovered)?;
    debug!("Transceiver reported channel {:02X}", channel);
    Ok(channel)
}

async fn send(port: &mut dyn Transport, data: &[u8]) -> Result<()> {
    port.write_all(data)
        .await
        .map_err(|e| XbimuError::Serial(format!("Failed to write command: {}", e)))?;

    port.flush()
        .await
        .map_err(|e| XbimuError::Serial(format!("Failed to flush serial port: {}", e)))?;

    Ok(())
}

/// Read whatever arrives until the window elapses, feeding the scanner.
async fn drain_into(
    port: &mut dyn Transport,
    scanner: &mut ChannelScanner,
    window: Duration,
) -> Result<()> {
    let deadline = Instant::now() + window;
    let mut buf = [0u8; 64];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(());
        }

        match timeout(remaining, port.read(&mut buf)).await {
            Ok(Ok(0)) => {
                return Err(XbimuError::Serial(
                    "Port closed during handshake".to_string(),
                ));
            }
            Ok(Ok(n)) => {
                for &byte in &buf[..n] {
                    scanner.push_byte(byte);
                }
            }
            Ok(Err(e)) => {
                return Err(XbimuError::Serial(format!(
                    "Read failed during handshake: {}",
                    e
                )));
            }
            // Window elapsed with the read still pending.
            Err(_) => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::transport::mocks::MockTransport;
    use std::io;

    fn fast_timing() -> HandshakeTiming {
        HandshakeTiming {
            guard_delay: Duration::from_millis(10),
            command_delay: Duration::from_millis(10),
        }
    }

    fn feed(scanner: &mut ChannelScanner, bytes: &[u8]) {
        for &byte in bytes {
            scanner.push_byte(byte);
        }
    }

    #[test]
    fn test_scanner_parses_hex_channel_line() {
        let mut scanner = ChannelScanner::new();
        feed(&mut scanner, b"1A\r");
        assert_eq!(scanner.channel(), Some(0x1A));
    }

    #[test]
    fn test_scanner_first_match_wins() {
        let mut scanner = ChannelScanner::new();
        feed(&mut scanner, b"1A\r2B\r");
        assert_eq!(scanner.channel(), Some(0x1A));
    }

    #[test]
    fn test_scanner_skips_non_hex_lines() {
        let mut scanner = ChannelScanner::new();
        feed(&mut scanner, b"OK\r");
        assert_eq!(scanner.channel(), None);
        feed(&mut scanner, b"15\r");
        assert_eq!(scanner.channel(), Some(0x15));
    }

    #[test]
    fn test_scanner_rejects_lowercase_hex() {
        let mut scanner = ChannelScanner::new();
        feed(&mut scanner, b"1a\r");
        assert_eq!(scanner.channel(), None);
    }

    #[test]
    fn test_scanner_ignores_empty_lines() {
        let mut scanner = ChannelScanner::new();
        feed(&mut scanner, b"\r\r");
        assert_eq!(scanner.channel(), None);
    }

    #[test]
    fn test_scanner_waits_for_line_terminator() {
        let mut scanner = ChannelScanner::new();
        feed(&mut scanner, b"1A");
        assert_eq!(scanner.channel(), None);
        scanner.push_byte(b'\r');
        assert_eq!(scanner.channel(), Some(0x1A));
    }

    #[test]
    fn test_scanner_recovers_after_oversized_line() {
        let mut scanner = ChannelScanner::new();
        feed(&mut scanner, &[b'A'; 100]);
        scanner.push_byte(b'\r');
        assert_eq!(scanner.channel(), None);
        feed(&mut scanner, b"1A\r");
        assert_eq!(scanner.channel(), Some(0x1A));
    }

    #[tokio::test]
    async fn test_handshake_discovers_channel() {
        let mut mock = MockTransport::new();
        mock.push_read(b"OK\r");
        mock.push_read(b"1A\r");
        mock.push_read(b"OK\r");

        let channel = run_handshake(&mut mock, &fast_timing()).await.unwrap();
        assert_eq!(channel, 0x1A);
    }

    #[tokio::test]
    async fn test_handshake_command_sequence() {
        let mut mock = MockTransport::new();
        mock.push_read(b"0C\r");

        run_handshake(&mut mock, &fast_timing()).await.unwrap();

        let written = mock.get_written_data();
        assert_eq!(
            written,
            vec![b"+++".to_vec(), b"ATCH\r".to_vec(), b"ATFR\r".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_handshake_without_channel_reply_fails() {
        let mut mock = MockTransport::new();
        mock.push_read(b"OK\rERROR\r");

        let result = run_handshake(&mut mock, &fast_timing()).await;
        assert!(matches!(result, Err(XbimuError::NoChannelDiscovered)));
    }

    #[tokio::test]
    async fn test_handshake_on_closed_port_fails() {
        let mut mock = MockTransport::new();
        mock.close();

        let result = run_handshake(&mut mock, &fast_timing()).await;
        match result {
            Err(XbimuError::Serial(msg)) => assert!(msg.contains("closed")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handshake_write_failure_surfaces() {
        let mut mock = MockTransport::new();
        mock.set_write_error(io::ErrorKind::BrokenPipe);

        let result = run_handshake(&mut mock, &fast_timing()).await;
        match result {
            Err(XbimuError::Serial(msg)) => assert!(msg.contains("Failed to write")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }
}
