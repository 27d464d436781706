//! LC3 binary container header
//!
//! The container starts with a fixed 18-byte little-endian header followed by
//! `[u16 length][payload]` frame records.

use bytes::{Buf, BufMut, BytesMut};

use crate::constants::{CONTAINER_HEADER_SIZE, LC3_FILE_ID};
use crate::error::ContainerError;

/// Decoded container header (raw field values as stored on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Container identifier
    pub format_tag: u16,
    /// Bytes in the header record
    pub header_size: u16,
    /// Sample rate in units of 100 Hz
    pub sample_rate_100hz: u16,
    /// Bit rate in units of 100 bps
    pub bit_rate_100bps: u16,
    /// Channels in the stream
    pub channels: u16,
    /// Frame duration in units of 10 µs
    pub frame_duration_10us: u16,
    pub reserved: u16,
    pub sample_count_low: u16,
    pub sample_count_high: u16,
}

impl ContainerHeader {
    /// Build a header for the given stream parameters.
    ///
    /// Rates and durations are stored in 16-bit units; values beyond that
    /// range are clamped to `u16::MAX` units.
    pub fn new(sample_rate_hz: u32, bit_rate_bps: u32, channels: u16, frame_duration_us: u32, sample_count: u32) -> Self {
        let units = |value: u32, scale: u32| u16::try_from(value / scale).unwrap_or(u16::MAX);
        Self {
            format_tag: LC3_FILE_ID,
            header_size: CONTAINER_HEADER_SIZE as u16,
            sample_rate_100hz: units(sample_rate_hz, 100),
            bit_rate_100bps: units(bit_rate_bps, 100),
            channels,
            frame_duration_10us: units(frame_duration_us, 10),
            reserved: 0,
            sample_count_low: (sample_count & 0xFFFF) as u16,
            sample_count_high: (sample_count >> 16) as u16,
        }
    }

    /// Sample rate in Hz
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_100hz as u32 * 100
    }

    /// Bit rate in bps
    pub fn bit_rate_bps(&self) -> u32 {
        self.bit_rate_100bps as u32 * 100
    }

    /// Frame duration in microseconds
    pub fn frame_duration_us(&self) -> u32 {
        self.frame_duration_10us as u32 * 10
    }

    /// Total samples per channel in the stream
    pub fn sample_count(&self) -> u32 {
        self.sample_count_low as u32 | ((self.sample_count_high as u32) << 16)
    }

    /// Samples per channel in one frame.
    ///
    /// Integer arithmetic in whole kHz and whole ms, so 7.5 ms frames
    /// count as 7 ms.
    pub fn samples_per_frame(&self) -> u32 {
        (self.sample_rate_hz() / 1000) * (self.frame_duration_us() / 1000)
    }

    /// Number of whole frames described by the sample count
    pub fn frame_count(&self) -> u32 {
        match self.samples_per_frame() {
            0 => 0,
            spf => self.sample_count() / spf,
        }
    }

    pub fn has_lc3_tag(&self) -> bool {
        self.format_tag == LC3_FILE_ID
    }

    /// Encode the header back into its on-disk form
    pub fn encode(&self) -> [u8; CONTAINER_HEADER_SIZE] {
        let mut buf = BytesMut::with_capacity(CONTAINER_HEADER_SIZE);
        buf.put_u16_le(self.format_tag);
        buf.put_u16_le(self.header_size);
        buf.put_u16_le(self.sample_rate_100hz);
        buf.put_u16_le(self.bit_rate_100bps);
        buf.put_u16_le(self.channels);
        buf.put_u16_le(self.frame_duration_10us);
        buf.put_u16_le(self.reserved);
        buf.put_u16_le(self.sample_count_low);
        buf.put_u16_le(self.sample_count_high);

        let mut out = [0u8; CONTAINER_HEADER_SIZE];
        out.copy_from_slice(&buf);
        out
    }
}

/// Parse the container header from the front of `blob`.
///
/// Returns the header and the number of bytes consumed.
pub fn parse_header(blob: &[u8]) -> Result<(ContainerHeader, usize), ContainerError> {
    if blob.len() < CONTAINER_HEADER_SIZE {
        return Err(ContainerError::MalformedContainer {
            len: blob.len(),
            required: CONTAINER_HEADER_SIZE,
        });
    }

    let mut buf = &blob[..CONTAINER_HEADER_SIZE];
    let header = ContainerHeader {
        format_tag: buf.get_u16_le(),
        header_size: buf.get_u16_le(),
        sample_rate_100hz: buf.get_u16_le(),
        bit_rate_100bps: buf.get_u16_le(),
        channels: buf.get_u16_le(),
        frame_duration_10us: buf.get_u16_le(),
        reserved: buf.get_u16_le(),
        sample_count_low: buf.get_u16_le(),
        sample_count_high: buf.get_u16_le(),
    };

    if header.header_size as usize != CONTAINER_HEADER_SIZE {
        return Err(ContainerError::InvalidHeader(format!(
            "header size field is {}, expected {}",
            header.header_size, CONTAINER_HEADER_SIZE
        )));
    }

    if header.samples_per_frame() == 0 {
        return Err(ContainerError::InvalidHeader(format!(
            "zero samples per frame ({} Hz, {} us)",
            header.sample_rate_hz(),
            header.frame_duration_us()
        )));
    }

    if !header.has_lc3_tag() {
        tracing::warn!(tag = header.format_tag, "Container tag is not the LC3 file id");
    }

    Ok((header, CONTAINER_HEADER_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_known_header() {
        let header = ContainerHeader::new(16_000, 32_000, 2, 10_000, 1600);
        let bytes = header.encode();

        let (parsed, consumed) = parse_header(&bytes).unwrap();
        assert_eq!(consumed, CONTAINER_HEADER_SIZE);
        assert_eq!(parsed.sample_rate_hz(), 16_000);
        assert_eq!(parsed.frame_duration_us(), 10_000);
        assert_eq!(parsed.channels, 2);
        assert_eq!(parsed.sample_count(), 1600);
        assert_eq!(parsed.samples_per_frame(), 160);
        assert_eq!(parsed.frame_count(), 10);
    }

    #[test]
    fn test_little_endian_layout() {
        let bytes = ContainerHeader::new(48_000, 96_000, 1, 7_500, 0x0001_0002).encode();

        assert_eq!(&bytes[0..2], &[0x1C, 0xCC]);
        assert_eq!(&bytes[2..4], &[18, 0]);
        assert_eq!(&bytes[4..6], &480u16.to_le_bytes());
        assert_eq!(&bytes[10..12], &750u16.to_le_bytes());
        assert_eq!(&bytes[14..16], &[0x02, 0x00]);
        assert_eq!(&bytes[16..18], &[0x01, 0x00]);
    }

    #[test]
    fn test_short_blob_is_malformed() {
        let err = parse_header(&[0u8; 17]).unwrap_err();
        assert_eq!(
            err,
            ContainerError::MalformedContainer { len: 17, required: 18 }
        );
    }

    #[test]
    fn test_zero_samples_per_frame_rejected() {
        // 900 Hz rounds down to zero whole kHz
        let bytes = ContainerHeader::new(900, 8_000, 1, 10_000, 1600).encode();
        assert!(matches!(
            parse_header(&bytes),
            Err(ContainerError::InvalidHeader(_))
        ));

        // sub-millisecond frames
        let bytes = ContainerHeader::new(16_000, 8_000, 1, 500, 1600).encode();
        assert!(matches!(
            parse_header(&bytes),
            Err(ContainerError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_header_size_mismatch_rejected() {
        let mut header = ContainerHeader::new(16_000, 32_000, 1, 10_000, 1600);
        header.header_size = 20;
        assert!(matches!(
            parse_header(&header.encode()),
            Err(ContainerError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_out_of_range_fields_clamped() {
        let header = ContainerHeader::new(16_000, 7_000_000, 1, 10_000, 1600);
        assert_eq!(header.bit_rate_100bps, u16::MAX);
        assert_eq!(header.bit_rate_bps(), 6_553_500);
        assert_eq!(header.sample_rate_hz(), 16_000);

        let header = ContainerHeader::new(u32::MAX, 32_000, 1, u32::MAX, 1600);
        assert_eq!(header.sample_rate_100hz, u16::MAX);
        assert_eq!(header.frame_duration_10us, u16::MAX);
    }

    #[test]
    fn test_seven_and_a_half_ms_truncates() {
        let header = ContainerHeader::new(16_000, 32_000, 1, 7_500, 1600);
        assert_eq!(header.samples_per_frame(), 16 * 7);
    }

    proptest! {
        #[test]
        fn header_round_trip(
            tag in any::<u16>(),
            rate in 10u16..=u16::MAX,
            bitrate in any::<u16>(),
            channels in any::<u16>(),
            duration in 100u16..=u16::MAX,
            reserved in any::<u16>(),
            low in any::<u16>(),
            high in any::<u16>(),
        ) {
            let mut bytes = [0u8; CONTAINER_HEADER_SIZE];
            for (i, v) in [tag, 18, rate, bitrate, channels, duration, reserved, low, high]
                .iter()
                .enumerate()
            {
                bytes[i * 2..i * 2 + 2].copy_from_slice(&v.to_le_bytes());
            }

            let (header, consumed) = parse_header(&bytes).unwrap();
            prop_assert_eq!(consumed, CONTAINER_HEADER_SIZE);
            prop_assert_eq!(header.encode(), bytes);
            prop_assert_eq!(header.sample_count(), low as u32 | (high as u32) << 16);
        }
    }
}
