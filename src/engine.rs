//! Broadcast streaming engine
//!
//! Owns one [`StreamCursor`] per broadcast stream and keeps the transport fed:
//! every `Sent` notification for a stream pulls the next frame from that
//! stream's container and submits it with the stream's next sequence number.
//!
//! Per stream the state machine is
//!
//! ```text
//! Idle --Started--> Started --(all started, prime)--> Streaming --Stopped--> Stopped
//!                                                      ^      |
//!                                                      +-Sent-+
//! ```
//!
//! There is no way back from `Stopped`.
//!
//! Steady-state failures never escalate. An empty buffer pool skips the send
//! opportunity without touching the cursor. A failed submission releases the
//! buffer and leaves the stream waiting for a `Sent` that will not come.

use serde::Serialize;

use crate::codec::StreamCursor;
use crate::constants::{CHANNEL_COUNT, LC3_MAX_FRAME_BYTES, SENT_LOG_INTERVAL};
use crate::error::TransportError;
use crate::transport::{EventReceiver, StreamHandle, StreamObserver, Transport};

/// Lifecycle of one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamState {
    Idle,
    Started,
    Streaming,
    Stopped,
}

/// Result of one production opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Frame submitted with this sequence number
    Sent(u32),
    /// No transmit buffer was free
    PoolExhausted,
    /// The container could not yield a frame
    ReadFailed,
    /// The transport refused the buffer
    SubmitFailed,
    /// Stream is not in `Streaming`
    NotStreaming,
}

struct StreamSlot {
    handle: StreamHandle,
    state: StreamState,
    cursor: StreamCursor,
    missed: u64,
    submit_failures: u64,
    stop_reason: Option<u8>,
}

/// Per-stream counters reported by [`BroadcastEngine::summary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub stream: StreamHandle,
    pub state: StreamState,
    pub sequence_number: u32,
    pub frames_sent: u32,
    pub wraps: u64,
    pub missed: u64,
    pub submit_failures: u64,
    pub stop_reason: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineSummary {
    pub streams: Vec<StreamSummary>,
}

impl EngineSummary {
    pub fn frames_sent(&self) -> u64 {
        self.streams.iter().map(|s| s.frames_sent as u64).sum()
    }
}

/// Drives all broadcast streams from transport events
pub struct BroadcastEngine<T: Transport> {
    transport: T,
    streams: Vec<StreamSlot>,
    scratch: Vec<u8>,
    enqueue_count: usize,
    started: usize,
}

impl<T: Transport> BroadcastEngine<T> {
    /// Create an engine; stream `i` reads from `cursors[i]`
    pub fn new(transport: T, cursors: Vec<StreamCursor>, enqueue_count: usize) -> Self {
        let streams = cursors
            .into_iter()
            .enumerate()
            .map(|(i, cursor)| StreamSlot {
                handle: StreamHandle(i as u8),
                state: StreamState::Idle,
                cursor,
                missed: 0,
                submit_failures: 0,
                stop_reason: None,
            })
            .collect();

        Self {
            transport,
            streams,
            scratch: vec![0u8; LC3_MAX_FRAME_BYTES * CHANNEL_COUNT],
            enqueue_count,
            started: 0,
        }
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn state(&self, stream: StreamHandle) -> Option<StreamState> {
        self.streams.get(stream.index()).map(|s| s.state)
    }

    pub fn cursor(&self, stream: StreamHandle) -> Option<&StreamCursor> {
        self.streams.get(stream.index()).map(|s| &s.cursor)
    }

    /// True once every stream has reported `Started`
    pub fn all_started(&self) -> bool {
        self.started == self.streams.len()
    }

    pub fn all_stopped(&self) -> bool {
        self.streams.iter().all(|s| s.state == StreamState::Stopped)
    }

    /// Handle events until every stream has started. Blocks without timeout.
    pub fn wait_for_all_started(&mut self, events: &EventReceiver) -> Result<(), TransportError> {
        while !self.all_started() {
            let event = events.recv().map_err(|_| TransportError::Disconnected)?;
            self.dispatch(event);
        }
        tracing::info!(streams = self.streams.len(), "All BIS streams started");
        Ok(())
    }

    /// Move started streams to `Streaming` and submit the initial burst.
    pub fn prime(&mut self) {
        for i in 0..self.streams.len() {
            if self.streams[i].state != StreamState::Started {
                continue;
            }
            self.streams[i].state = StreamState::Streaming;
            let handle = self.streams[i].handle;
            for _ in 0..self.enqueue_count {
                self.send_frame(handle);
            }
        }
        tracing::info!(
            streams = self.streams.len(),
            enqueue = self.enqueue_count,
            "Audio streaming in progress"
        );
    }

    /// Wait for all streams, prime them, then process events until every
    /// stream has stopped or the event source goes away.
    pub fn run(&mut self, events: &EventReceiver) -> Result<EngineSummary, TransportError> {
        self.wait_for_all_started(events)?;
        self.prime();

        while !self.all_stopped() {
            match events.recv() {
                Ok(event) => self.dispatch(event),
                Err(_) => {
                    tracing::info!("Event source closed");
                    break;
                }
            }
        }

        Ok(self.summary())
    }

    /// Produce one frame for `stream`
    pub fn send_frame(&mut self, stream: StreamHandle) -> SendOutcome {
        let Self {
            transport,
            streams,
            scratch,
            ..
        } = self;

        let Some(slot) = streams.get_mut(stream.index()) else {
            tracing::warn!(%stream, "Send requested for unknown stream");
            return SendOutcome::NotStreaming;
        };
        if slot.state != StreamState::Streaming {
            tracing::trace!(%stream, state = ?slot.state, "Ignoring send outside streaming state");
            return SendOutcome::NotStreaming;
        }

        let Some(mut buffer) = transport.allocate_buffer() else {
            slot.missed += 1;
            tracing::debug!(%stream, missed = slot.missed, "Could not allocate transmit buffer");
            return SendOutcome::PoolExhausted;
        };

        let checkpoint = slot.cursor.checkpoint();
        let unit = slot.cursor.transmit_unit_size().min(scratch.len());
        match slot.cursor.read_frame() {
            Ok(frame) => {
                let n = frame.len().min(unit);
                scratch[..n].copy_from_slice(&frame[..n]);
                scratch[n..unit].fill(0);
            }
            Err(e) => {
                tracing::error!(%stream, error = %e, "Error reading LC3 data");
                buffer.release();
                return SendOutcome::ReadFailed;
            }
        }
        buffer.put_slice(&scratch[..unit]);

        let seq = slot.cursor.sequence_number();
        if let Err(e) = transport.submit(stream, buffer, seq) {
            e.buffer.release();
            slot.cursor.restore(checkpoint);
            slot.submit_failures += 1;
            // No retry is scheduled; the stream stays silent from here on.
            tracing::warn!(%stream, seq, error = %e.error, "Unable to broadcast data");
            return SendOutcome::SubmitFailed;
        }

        slot.cursor.record_sent();
        let sent = slot.cursor.frames_sent();
        if sent % SENT_LOG_INTERVAL == 0 {
            tracing::info!(%stream, sent, "Sent {} total ISO packets", sent);
        }

        SendOutcome::Sent(seq)
    }

    pub fn summary(&self) -> EngineSummary {
        EngineSummary {
            streams: self
                .streams
                .iter()
                .map(|s| StreamSummary {
                    stream: s.handle,
                    state: s.state,
                    sequence_number: s.cursor.sequence_number(),
                    frames_sent: s.cursor.frames_sent(),
                    wraps: s.cursor.wraps(),
                    missed: s.missed,
                    submit_failures: s.submit_failures,
                    stop_reason: s.stop_reason,
                })
                .collect(),
        }
    }
}

impl<T: Transport> StreamObserver for BroadcastEngine<T> {
    fn on_started(&mut self, stream: StreamHandle) {
        let Some(slot) = self.streams.get_mut(stream.index()) else {
            tracing::warn!(%stream, "Started event for unknown stream");
            return;
        };
        if slot.state != StreamState::Idle {
            tracing::warn!(%stream, state = ?slot.state, "Duplicate started event ignored");
            return;
        }

        slot.cursor.reset_counters();
        slot.state = StreamState::Started;
        self.started += 1;
        tracing::info!(%stream, "Stream started (ready to send audio)");
    }

    fn on_stopped(&mut self, stream: StreamHandle, reason: u8) {
        let Some(slot) = self.streams.get_mut(stream.index()) else {
            tracing::warn!(%stream, "Stopped event for unknown stream");
            return;
        };
        if slot.state == StreamState::Stopped {
            return;
        }

        slot.state = StreamState::Stopped;
        slot.stop_reason = Some(reason);
        tracing::info!(%stream, "Stream stopped (reason 0x{:02X})", reason);
    }

    fn on_sent(&mut self, stream: StreamHandle) {
        self.send_frame(stream);
    }
}
