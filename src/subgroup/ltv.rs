//! Length-Type-Value encoding for codec configuration and metadata

use bytes::{BufMut, Bytes, BytesMut};

/// Codec-specific configuration types
pub mod codec_type {
    pub const SAMPLING_FREQUENCY: u8 = 0x01;
    pub const FRAME_DURATION: u8 = 0x02;
    pub const CHANNEL_ALLOCATION: u8 = 0x03;
    pub const OCTETS_PER_FRAME: u8 = 0x04;
    pub const FRAMES_PER_SDU: u8 = 0x05;
}

/// Metadata types
pub mod metadata_type {
    pub const STREAMING_CONTEXTS: u8 = 0x02;
    pub const PROGRAM_INFO: u8 = 0x03;
    pub const LANGUAGE: u8 = 0x04;
    pub const PARENTAL_RATING: u8 = 0x06;
    pub const BROADCAST_NAME: u8 = 0x0B;
}

/// Largest value a single record can carry
pub const MAX_VALUE_SIZE: usize = u8::MAX as usize - 1;

/// Appends LTV records to a buffer
#[derive(Debug, Default)]
pub struct LtvWriter {
    buf: BytesMut,
}

impl LtvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record. A value longer than [`MAX_VALUE_SIZE`] does not fit
    /// the length octet and the record is skipped.
    pub fn put(&mut self, ty: u8, value: &[u8]) -> &mut Self {
        if value.len() > MAX_VALUE_SIZE {
            tracing::warn!(ty, len = value.len(), "LTV value too long, record skipped");
            return self;
        }
        self.buf.put_u8(value.len() as u8 + 1);
        self.buf.put_u8(ty);
        self.buf.put_slice(value);
        self
    }

    pub fn put_u8(&mut self, ty: u8, value: u8) -> &mut Self {
        self.put(ty, &[value])
    }

    pub fn put_u16(&mut self, ty: u8, value: u16) -> &mut Self {
        self.put(ty, &value.to_le_bytes())
    }

    pub fn put_u32(&mut self, ty: u8, value: u32) -> &mut Self {
        self.put(ty, &value.to_le_bytes())
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Iterate `(type, value)` pairs of an LTV buffer, stopping at the first malformed record
pub fn iter_ltv(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut rest = data;
    std::iter::from_fn(move || {
        let (&len, tail) = rest.split_first()?;
        let len = len as usize;
        if len == 0 || tail.len() < len {
            return None;
        }
        let (record, next) = tail.split_at(len);
        rest = next;
        Some((record[0], &record[1..]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let mut w = LtvWriter::new();
        w.put_u8(codec_type::SAMPLING_FREQUENCY, 0x03)
            .put_u16(codec_type::OCTETS_PER_FRAME, 40);
        let out = w.finish();
        assert_eq!(&out[..], &[0x02, 0x01, 0x03, 0x03, 0x04, 40, 0]);
    }

    #[test]
    fn test_iter_stops_on_truncation() {
        let data = [0x02, 0x01, 0x03, 0x05, 0x04, 0x00];
        let records: Vec<_> = iter_ltv(&data).collect();
        assert_eq!(records, vec![(0x01, &[0x03][..])]);
    }

    #[test]
    fn test_long_value_skipped() {
        let mut w = LtvWriter::new();
        w.put(metadata_type::PROGRAM_INFO, &[b'x'; MAX_VALUE_SIZE + 1])
            .put(metadata_type::BROADCAST_NAME, &[b'y'; MAX_VALUE_SIZE]);
        let out = w.finish();
        assert_eq!(out[0], 255);
        assert_eq!(out[1], metadata_type::BROADCAST_NAME);
        assert_eq!(out.len(), MAX_VALUE_SIZE + 2);
    }
}
