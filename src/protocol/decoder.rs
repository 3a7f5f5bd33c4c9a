//! # Frame Decoder
//!
//! Stateful incremental decoder turning the raw serial byte stream into
//! typed telemetry packets.
//!
//! The stream has no out-of-band framing: a frame begins with a type token
//! (`'Q'`/`'S'`/`'B'`), carries a fixed, token-determined number of
//! big-endian `i16` payload bytes, and ends with an additive checksum byte.
//! The decoder consumes exactly one byte per call and emits a packet only
//! when a complete frame validates. Corrupt or unknown frames are absorbed
//! silently and scanning resumes from the live stream; the link has no
//! retransmission, so resynchronization is the only recovery.
//!
//! The decoder performs no I/O and never blocks, so it is safe to drive
//! from inside a transport's byte-delivery context.

use bytes::{Buf, BufMut, BytesMut};

use super::checksum::frame_checksum;
use super::packet::{Packet, PacketKind, MAX_FRAME_LEN};

/// Decoder progress through the current frame.
#[derive(Debug, Clone, Copy)]
enum DecoderState {
    /// Scanning for a type token
    AwaitingFrameStart,
    /// Collecting payload and checksum bytes for a recognized token
    AccumulatingPayload { kind: PacketKind, remaining: usize },
}

/// Incremental frame decoder.
///
/// Feed it one byte at a time; at most one packet is produced per byte.
/// The decoder has no terminal state and runs for the lifetime of a
/// connection.
///
/// # Examples
///
/// ```
/// use xbimu_logger::protocol::decoder::FrameDecoder;
/// use xbimu_logger::protocol::packet::Packet;
///
/// // Complete orientation frame: token, five big-endian i16 fields, checksum.
/// let frame = [
///     0x51, 0x00, 0x64, 0x00, 0xC8, 0x01, 0x2C, 0x01, 0x90, 0x00, 0x01, 0x3C,
/// ];
///
/// let mut decoder = FrameDecoder::new();
/// let mut decoded = None;
/// for byte in frame {
///     decoded = decoder.push_byte(byte).or(decoded);
/// }
///
/// assert_eq!(
///     decoded,
///     Some(Packet::Orientation { w: 100, x: 200, y: 300, z: 400, sequence: 1 })
/// );
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    buf: BytesMut,
    discarded: u64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder in the `AwaitingFrameStart` state.
    pub fn new() -> Self {
        Self {
            state: DecoderState::AwaitingFrameStart,
            buf: BytesMut::with_capacity(MAX_FRAME_LEN),
            discarded: 0,
        }
    }

    /// Process one byte from the stream.
    ///
    /// # Returns
    ///
    /// * `Some(Packet)` - the byte completed a valid frame
    /// * `None` - the frame is still accumulating, or the byte was noise
    ///
    /// Checksum failures and unknown tokens never surface as errors; the
    /// frame is dropped and the decoder returns to scanning.
    pub fn push_byte(&mut self, byte: u8) -> Option<Packet> {
        match self.state {
            DecoderState::AwaitingFrameStart => {
                if let Some(kind) = PacketKind::from_token(byte) {
                    self.buf.clear();
                    self.buf.put_u8(byte);
                    self.state = DecoderState::AccumulatingPayload {
                        kind,
                        // payload plus the trailing checksum byte
                        remaining: kind.payload_len() + 1,
                    };
                }
                None
            }
            DecoderState::AccumulatingPayload { kind, remaining } => {
                self.buf.put_u8(byte);
                if remaining > 1 {
                    self.state = DecoderState::AccumulatingPayload {
                        kind,
                        remaining: remaining - 1,
                    };
                    return None;
                }
                self.state = DecoderState::AwaitingFrameStart;
                self.finish_frame(kind)
            }
        }
    }

    /// Number of complete frames dropped for checksum mismatch.
    ///
    /// Diagnostic only; discarded frames are otherwise invisible.
    pub fn discarded_frames(&self) -> u64 {
        self.discarded
    }

    /// Validate the accumulated frame and parse its payload.
    fn finish_frame(&mut self, kind: PacketKind) -> Option<Packet> {
        let body_len = self.buf.len() - 1;
        let received = self.buf[body_len];
        if frame_checksum(&self.buf[..body_len]) != received {
            self.discarded += 1;
            return None;
        }

        // Token at [0], then field_count big-endian i16 values.
        let mut payload = &self.buf[1..body_len];
        let mut field = || payload.get_i16() as i32;

        let packet = match kind {
            PacketKind::Orientation => Packet::Orientation {
                w: field(),
                x: field(),
                y: field(),
                z: field(),
                sequence: field(),
            },
            PacketKind::RawSensors => Packet::RawSensors {
                gx: field(),
                gy: field(),
                gz: field(),
                ax: field(),
                ay: field(),
                az: field(),
                mx: field(),
                my: field(),
                mz: field(),
                sequence: field(),
            },
            PacketKind::Battery => Packet::Battery {
                millivolts: field(),
                sequence: field(),
            },
        };
        Some(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encoder::{
        encode_battery_frame, encode_orientation_frame, encode_raw_sensors_frame,
    };

    fn feed(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<Packet> {
        bytes.iter().filter_map(|&b| decoder.push_byte(b)).collect()
    }

    #[test]
    fn test_decode_orientation_frame() {
        let frame = encode_orientation_frame(100, 200, 300, 400, 1);
        let mut decoder = FrameDecoder::new();

        let packets = feed(&mut decoder, &frame);
        assert_eq!(
            packets,
            vec![Packet::Orientation {
                w: 100,
                x: 200,
                y: 300,
                z: 400,
                sequence: 1
            }]
        );
    }

    #[test]
    fn test_decode_raw_sensors_frame() {
        let frame = encode_raw_sensors_frame(10, -20, 30, -40, 50, -60, 70, -80, 90, 42);
        let mut decoder = FrameDecoder::new();

        let packets = feed(&mut decoder, &frame);
        assert_eq!(
            packets,
            vec![Packet::RawSensors {
                gx: 10,
                gy: -20,
                gz: 30,
                ax: -40,
                ay: 50,
                az: -60,
                mx: 70,
                my: -80,
                mz: 90,
                sequence: 42
            }]
        );
    }

    #[test]
    fn test_decode_battery_frame() {
        let frame = encode_battery_frame(4100, 3);
        let mut decoder = FrameDecoder::new();

        let packets = feed(&mut decoder, &frame);
        assert_eq!(
            packets,
            vec![Packet::Battery {
                millivolts: 4100,
                sequence: 3
            }]
        );
    }

    #[test]
    fn test_decode_negative_values_sign_extend() {
        let frame = encode_orientation_frame(-1, -32768, 32767, 0, 9);
        let mut decoder = FrameDecoder::new();

        let packets = feed(&mut decoder, &frame);
        assert_eq!(
            packets,
            vec![Packet::Orientation {
                w: -1,
                x: -32768,
                y: 32767,
                z: 0,
                sequence: 9
            }]
        );
    }

    #[test]
    fn test_emits_at_most_one_packet_per_byte() {
        let frame = encode_battery_frame(3700, 1);
        let mut decoder = FrameDecoder::new();

        // Every byte but the last yields nothing.
        for &byte in &frame[..frame.len() - 1] {
            assert_eq!(decoder.push_byte(byte), None);
        }
        assert!(decoder.push_byte(frame[frame.len() - 1]).is_some());
    }

    #[test]
    fn test_corrupted_payload_byte_discards_frame() {
        let mut corrupt = encode_orientation_frame(100, 200, 300, 400, 1);
        corrupt[3] ^= 0xFF;
        let next = encode_orientation_frame(500, 600, 700, 800, 2);

        let mut decoder = FrameDecoder::new();
        let mut stream = corrupt;
        stream.extend_from_slice(&next);

        // The corrupted frame is absorbed silently; the one appended
        // immediately after decodes intact.
        let packets = feed(&mut decoder, &stream);
        assert_eq!(
            packets,
            vec![Packet::Orientation {
                w: 500,
                x: 600,
                y: 700,
                z: 800,
                sequence: 2
            }]
        );
        assert_eq!(decoder.discarded_frames(), 1);
    }

    #[test]
    fn test_corrupted_checksum_discards_frame() {
        let mut frame = encode_battery_frame(4000, 5);
        let last = frame.len() - 1;
        frame[last] = frame[last].wrapping_add(1);

        let mut decoder = FrameDecoder::new();
        assert!(feed(&mut decoder, &frame).is_empty());
        assert_eq!(decoder.discarded_frames(), 1);

        // Decoder is back in sync for the next valid frame.
        let next = encode_battery_frame(4000, 6);
        let packets = feed(&mut decoder, &next);
        assert_eq!(
            packets,
            vec![Packet::Battery {
                millivolts: 4000,
                sequence: 6
            }]
        );
    }

    #[test]
    fn test_resynchronizes_after_garbage_prefix() {
        // Line noise shorter than a frame, free of type tokens.
        let garbage = [0x00, 0xFF, 0x10, 0x7A, 0x0D];
        let frame = encode_orientation_frame(1, 2, 3, 4, 5);

        let mut decoder = FrameDecoder::new();
        assert!(feed(&mut decoder, &garbage).is_empty());

        let packets = feed(&mut decoder, &frame);
        assert_eq!(
            packets,
            vec![Packet::Orientation {
                w: 1,
                x: 2,
                y: 3,
                z: 4,
                sequence: 5
            }]
        );
    }

    #[test]
    fn test_frame_split_across_deliveries() {
        let frame = encode_raw_sensors_frame(1, 2, 3, 4, 5, 6, 7, 8, 9, 10);
        let (first, second) = frame.split_at(7);

        let mut decoder = FrameDecoder::new();
        assert!(feed(&mut decoder, first).is_empty());

        let packets = feed(&mut decoder, second);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].kind(), PacketKind::RawSensors);
    }

    #[test]
    fn test_unknown_tokens_are_skipped() {
        let mut decoder = FrameDecoder::new();
        assert!(feed(&mut decoder, b"xyzzy!").is_empty());
        assert_eq!(decoder.discarded_frames(), 0);

        let frame = encode_battery_frame(3900, 1);
        assert_eq!(feed(&mut decoder, &frame).len(), 1);
    }

    #[test]
    fn test_back_to_back_mixed_kinds() {
        let mut stream = encode_battery_frame(4100, 1);
        stream.extend_from_slice(&encode_orientation_frame(10, 20, 30, 40, 2));
        stream.extend_from_slice(&encode_battery_frame(4099, 3));

        let mut decoder = FrameDecoder::new();
        let packets = feed(&mut decoder, &stream);
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].kind(), PacketKind::Battery);
        assert_eq!(packets[1].kind(), PacketKind::Orientation);
        assert_eq!(packets[2].kind(), PacketKind::Battery);
    }
}
