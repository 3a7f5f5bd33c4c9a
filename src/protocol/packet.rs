//! # Protocol Constants and Packet Types
//!
//! Core definitions for the x-BIMU binary packet mode.

/// Orientation (quaternion) frame type token
pub const FRAME_TOKEN_ORIENTATION: u8 = b'Q';

/// Raw sensors frame type token
pub const FRAME_TOKEN_RAW_SENSORS: u8 = b'S';

/// Battery frame type token
pub const FRAME_TOKEN_BATTERY: u8 = b'B';

/// Number of payload fields in an orientation frame (w, x, y, z, sequence)
pub const ORIENTATION_FIELD_COUNT: usize = 5;

/// Number of payload fields in a raw sensors frame
/// (gyroscope x/y/z, accelerometer x/y/z, magnetometer x/y/z, sequence)
pub const RAW_SENSORS_FIELD_COUNT: usize = 10;

/// Number of payload fields in a battery frame (millivolts, sequence)
pub const BATTERY_FIELD_COUNT: usize = 2;

/// Size in bytes of one encoded payload field (big-endian `i16`)
pub const FIELD_SIZE: usize = 2;

/// Largest complete frame on the wire: token + raw sensors payload + checksum
pub const MAX_FRAME_LEN: usize = 1 + RAW_SENSORS_FIELD_COUNT * FIELD_SIZE + 1;

/// The three packet kinds the device streams.
///
/// Discriminants double as indices into per-kind arrays (log file slots).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Orientation quaternion
    Orientation = 0,
    /// Raw gyroscope/accelerometer/magnetometer readings
    RawSensors = 1,
    /// Battery voltage
    Battery = 2,
}

/// Number of distinct packet kinds
pub const PACKET_KIND_COUNT: usize = 3;

impl PacketKind {
    /// All kinds, indexed by discriminant.
    pub const ALL: [PacketKind; PACKET_KIND_COUNT] = [
        PacketKind::Orientation,
        PacketKind::RawSensors,
        PacketKind::Battery,
    ];

    /// Map a frame type token to its packet kind.
    ///
    /// Returns `None` for unknown tokens; the decoder treats those as
    /// stream noise and keeps scanning.
    pub const fn from_token(token: u8) -> Option<PacketKind> {
        match token {
            FRAME_TOKEN_ORIENTATION => Some(PacketKind::Orientation),
            FRAME_TOKEN_RAW_SENSORS => Some(PacketKind::RawSensors),
            FRAME_TOKEN_BATTERY => Some(PacketKind::Battery),
            _ => None,
        }
    }

    /// The frame type token that introduces this kind on the wire.
    pub const fn token(self) -> u8 {
        match self {
            PacketKind::Orientation => FRAME_TOKEN_ORIENTATION,
            PacketKind::RawSensors => FRAME_TOKEN_RAW_SENSORS,
            PacketKind::Battery => FRAME_TOKEN_BATTERY,
        }
    }

    /// Number of payload fields this kind carries.
    pub const fn field_count(self) -> usize {
        match self {
            PacketKind::Orientation => ORIENTATION_FIELD_COUNT,
            PacketKind::RawSensors => RAW_SENSORS_FIELD_COUNT,
            PacketKind::Battery => BATTERY_FIELD_COUNT,
        }
    }

    /// Payload size in bytes (field count × 2, fixed per kind).
    pub const fn payload_len(self) -> usize {
        self.field_count() * FIELD_SIZE
    }

    /// Complete frame size in bytes: token + payload + checksum.
    pub const fn frame_len(self) -> usize {
        1 + self.payload_len() + 1
    }

    /// Label used to extend log file names (`…_Orientation.csv` etc.).
    pub const fn label(self) -> &'static str {
        match self {
            PacketKind::Orientation => "Orientation",
            PacketKind::RawSensors => "RawSensors",
            PacketKind::Battery => "Battery",
        }
    }
}

/// One decoded telemetry packet.
///
/// Field values are raw device units widened from the wire's big-endian
/// `i16`; no physical scaling is applied. `sequence` is the device's own
/// incrementing packet counter, carried for traceability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    /// Orientation quaternion in raw device units
    Orientation {
        w: i32,
        x: i32,
        y: i32,
        z: i32,
        sequence: i32,
    },
    /// Raw gyroscope, accelerometer, and magnetometer axes
    RawSensors {
        gx: i32,
        gy: i32,
        gz: i32,
        ax: i32,
        ay: i32,
        az: i32,
        mx: i32,
        my: i32,
        mz: i32,
        sequence: i32,
    },
    /// Battery voltage in millivolts
    Battery { millivolts: i32, sequence: i32 },
}

impl Packet {
    /// The kind of this packet.
    pub const fn kind(&self) -> PacketKind {
        match self {
            Packet::Orientation { .. } => PacketKind::Orientation,
            Packet::RawSensors { .. } => PacketKind::RawSensors,
            Packet::Battery { .. } => PacketKind::Battery,
        }
    }
}
