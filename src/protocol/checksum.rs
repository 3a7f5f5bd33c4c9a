//! # Frame Checksum
//!
//! Implements the additive checksum closing every x-BIMU frame.
//!
//! The trailing byte of a frame is the sum of all preceding bytes (type
//! token and payload) modulo 256.

/// Calculate the checksum over the token and payload bytes of a frame.
///
/// # Arguments
///
/// * `data` - Frame bytes up to but excluding the checksum byte itself
///
/// # Returns
///
/// * `u8` - Sum of all bytes, modulo 256
///
/// # Examples
///
/// ```
/// use xbimu_logger::protocol::checksum::frame_checksum;
///
/// assert_eq!(frame_checksum(&[0x01, 0x02, 0x03]), 0x06);
/// ```
pub fn frame_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}
