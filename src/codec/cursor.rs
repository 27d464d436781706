//! Per-stream read cursor over an LC3 container
//!
//! Turns a finite container into an endless frame source: once the read
//! position reaches the computed end bound it jumps back to the first
//! frame after the header.

use bytes::Bytes;

use crate::codec::container::{parse_header, ContainerHeader};
use crate::constants::FRAME_LENGTH_PREFIX_SIZE;
use crate::error::ContainerError;

/// Saved read position, see [`StreamCursor::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorCheckpoint {
    position: usize,
    wraps: u64,
}

/// Read state for one stream
#[derive(Debug, Clone)]
pub struct StreamCursor {
    blob: Bytes,
    header: ContainerHeader,
    blob_start: usize,
    blob_end: usize,
    position: usize,
    transmit_unit_size: usize,
    sequence_number: u32,
    frames_sent: u32,
    wraps: u64,
}

impl StreamCursor {
    /// Parse the container header and compute the frame bounds.
    ///
    /// The end bound assumes every encoded frame occupies exactly
    /// `transmit_unit_size + 2` bytes.
    pub fn new(blob: Bytes, transmit_unit_size: usize) -> Result<Self, ContainerError> {
        let (header, consumed) = parse_header(&blob)?;

        let blob_start = consumed;
        let frame_span = transmit_unit_size + FRAME_LENGTH_PREFIX_SIZE;
        let blob_end = blob_start + header.frame_count() as usize * frame_span;

        if blob_end > blob.len() {
            tracing::warn!(
                blob_end,
                blob_len = blob.len(),
                "Computed frame bound exceeds container size"
            );
        }

        Ok(Self {
            blob,
            header,
            blob_start,
            blob_end,
            position: blob_start,
            transmit_unit_size,
            sequence_number: 0,
            frames_sent: 0,
            wraps: 0,
        })
    }

    /// Read the next length-prefixed frame and advance, wrapping at the end bound.
    ///
    /// On error the position is left untouched.
    pub fn read_frame(&mut self) -> Result<&[u8], ContainerError> {
        let available = self.blob.len();
        let prefix_end = self.position + FRAME_LENGTH_PREFIX_SIZE;
        if prefix_end > available {
            return Err(ContainerError::TruncatedFrame {
                position: self.position,
                needed: FRAME_LENGTH_PREFIX_SIZE,
                available,
            });
        }

        let len = u16::from_le_bytes([self.blob[self.position], self.blob[self.position + 1]]) as usize;
        let payload_end = prefix_end + len;
        if payload_end > available {
            return Err(ContainerError::TruncatedFrame {
                position: self.position,
                needed: FRAME_LENGTH_PREFIX_SIZE + len,
                available,
            });
        }

        if payload_end >= self.blob_end {
            self.position = self.blob_start;
            self.wraps += 1;
            tracing::debug!(wraps = self.wraps, "End of LC3 container reached, looping");
        } else {
            self.position = payload_end;
        }

        Ok(&self.blob[prefix_end..payload_end])
    }

    /// Remember the current read position
    pub fn checkpoint(&self) -> CursorCheckpoint {
        CursorCheckpoint {
            position: self.position,
            wraps: self.wraps,
        }
    }

    /// Go back to a position taken with [`checkpoint`](Self::checkpoint)
    pub fn restore(&mut self, checkpoint: CursorCheckpoint) {
        self.position = checkpoint.position;
        self.wraps = checkpoint.wraps;
    }

    /// Record a successfully submitted frame
    pub fn record_sent(&mut self) {
        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.frames_sent = self.frames_sent.wrapping_add(1);
    }

    /// Reset the counters when the stream (re)starts
    pub fn reset_counters(&mut self) {
        self.sequence_number = 0;
        self.frames_sent = 0;
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn blob_start(&self) -> usize {
        self.blob_start
    }

    /// Exclusive end bound of the frame region
    pub fn blob_end(&self) -> usize {
        self.blob_end
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn channel_count(&self) -> u16 {
        self.header.channels
    }

    pub fn samples_per_frame(&self) -> u32 {
        self.header.samples_per_frame()
    }

    pub fn transmit_unit_size(&self) -> usize {
        self.transmit_unit_size
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    /// Times the cursor has looped back to the first frame
    pub fn wraps(&self) -> u64 {
        self.wraps
    }
}
