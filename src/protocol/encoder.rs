//! # Frame Encoder
//!
//! Builds complete, checksummed frames from field values.
//!
//! The device firmware is the usual producer of these frames; the host-side
//! encoder exists for test vectors and for tooling that replays or
//! simulates a sensor stream.

use bytes::BufMut;

use super::checksum::frame_checksum;
use super::packet::PacketKind;

/// Encode an orientation quaternion frame.
///
/// # Examples
///
/// ```
/// use xbimu_logger::protocol::encoder::encode_orientation_frame;
///
/// let frame = encode_orientation_frame(100, 200, 300, 400, 1);
/// assert_eq!(frame.len(), 12);
/// assert_eq!(frame[0], b'Q');
/// ```
pub fn encode_orientation_frame(w: i16, x: i16, y: i16, z: i16, sequence: i16) -> Vec<u8> {
    encode_frame(PacketKind::Orientation, &[w, x, y, z, sequence])
}

/// Encode a raw sensors frame (gyroscope, accelerometer, magnetometer axes).
#[allow(clippy::too_many_arguments)]
pub fn encode_raw_sensors_frame(
    gx: i16,
    gy: i16,
    gz: i16,
    ax: i16,
    ay: i16,
    az: i16,
    mx: i16,
    my: i16,
    mz: i16,
    sequence: i16,
) -> Vec<u8> {
    encode_frame(
        PacketKind::RawSensors,
        &[gx, gy, gz, ax, ay, az, mx, my, mz, sequence],
    )
}

/// Encode a battery voltage frame.
pub fn encode_battery_frame(millivolts: i16, sequence: i16) -> Vec<u8> {
    encode_frame(PacketKind::Battery, &[millivolts, sequence])
}

/// Build a frame: type token, big-endian `i16` fields, additive checksum.
fn encode_frame(kind: PacketKind, fields: &[i16]) -> Vec<u8> {
    debug_assert_eq!(fields.len(), kind.field_count());

    let mut frame = Vec::with_capacity(kind.frame_len());
    frame.put_u8(kind.token());
    for &field in fields {
        frame.put_i16(field);
    }
    let checksum = frame_checksum(&frame);
    frame.put_u8(checksum);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_frame_layout() {
        let frame = encode_orientation_frame(100, 200, 300, 400, 1);
        assert_eq!(
            frame,
            vec![0x51, 0x00, 0x64, 0x00, 0xC8, 0x01, 0x2C, 0x01, 0x90, 0x00, 0x01, 0x3C]
        );
    }

    #[test]
    fn test_frame_lengths_match_kind() {
        assert_eq!(
            encode_orientation_frame(0, 0, 0, 0, 0).len(),
            PacketKind::Orientation.frame_len()
        );
        assert_eq!(
            encode_raw_sensors_frame(0, 0, 0, 0, 0, 0, 0, 0, 0, 0).len(),
            PacketKind::RawSensors.frame_len()
        );
        assert_eq!(
            encode_battery_frame(0, 0).len(),
            PacketKind::Battery.frame_len()
        );
    }

    #[test]
    fn test_battery_frame_layout() {
        // 4100 mV = 0x1004, sequence 3; checksum = 'B' + 0x10 + 0x04 + 0x03.
        let frame = encode_battery_frame(4100, 3);
        assert_eq!(frame, vec![0x42, 0x10, 0x04, 0x00, 0x03, 0x59]);
    }

    #[test]
    fn test_negative_fields_are_big_endian_twos_complement() {
        let frame = encode_battery_frame(-1, 0);
        assert_eq!(&frame[1..3], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_trailing_byte_is_checksum_of_body() {
        let frame = encode_raw_sensors_frame(1, 2, 3, 4, 5, 6, 7, 8, 9, 10);
        let body = &frame[..frame.len() - 1];
        assert_eq!(frame[frame.len() - 1], frame_checksum(body));
    }
}
