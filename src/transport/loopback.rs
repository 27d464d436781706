//! Simulated isochronous channel
//!
//! Stands in for the controller: submitted SDUs wait in a per-stream queue
//! until [`IsoLoopback::tick`] consumes one per stream per ISO interval,
//! releases its buffer and reports `Sent`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;

use super::{EventSender, StreamEvent, StreamHandle, SubmitError, Transport, TxBuffer, TxBufferPool};
use crate::error::TransportError;

/// Reason code reported when the local host ends the broadcast
pub const REASON_LOCAL_HOST_TERMINATED: u8 = 0x16;

struct InFlight {
    seq: u32,
    buffer: TxBuffer,
}

/// An SDU that went over the simulated air
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredSdu {
    pub stream: StreamHandle,
    pub seq: u32,
    pub payload: Bytes,
}

/// Loopback statistics
#[derive(Debug, Clone, Default)]
pub struct LoopbackStats {
    pub sdus_submitted: u64,
    pub sdus_delivered: u64,
    pub bytes_delivered: u64,
    pub submit_failures: u64,
}

/// In-process transport that paces delivery with explicit ticks
pub struct IsoLoopback {
    pool: TxBufferPool,
    queues: Vec<Mutex<VecDeque<InFlight>>>,
    events: EventSender,
    fail_submits: AtomicBool,
    record: bool,
    delivered: Mutex<Vec<DeliveredSdu>>,
    sdus_submitted: AtomicU64,
    sdus_delivered: AtomicU64,
    bytes_delivered: AtomicU64,
    submit_failures: AtomicU64,
}

impl IsoLoopback {
    pub fn new(stream_count: usize, pool: TxBufferPool, events: EventSender) -> Self {
        Self {
            pool,
            queues: (0..stream_count).map(|_| Mutex::new(VecDeque::new())).collect(),
            events,
            fail_submits: AtomicBool::new(false),
            record: false,
            delivered: Mutex::new(Vec::new()),
            sdus_submitted: AtomicU64::new(0),
            sdus_delivered: AtomicU64::new(0),
            bytes_delivered: AtomicU64::new(0),
            submit_failures: AtomicU64::new(0),
        }
    }

    /// Keep a copy of every delivered SDU
    pub fn with_recording(mut self) -> Self {
        self.record = true;
        self
    }

    pub fn stream_count(&self) -> usize {
        self.queues.len()
    }

    pub fn pool(&self) -> &TxBufferPool {
        &self.pool
    }

    /// Report every stream as started
    pub fn start_all(&self) {
        for i in 0..self.queues.len() {
            self.emit(StreamEvent::Started(StreamHandle(i as u8)));
        }
    }

    /// Tear every stream down, dropping anything still queued
    pub fn stop_all(&self, reason: u8) {
        for (i, queue) in self.queues.iter().enumerate() {
            queue.lock().clear();
            self.emit(StreamEvent::Stopped {
                stream: StreamHandle(i as u8),
                reason,
            });
        }
    }

    /// Make every following submission fail (or succeed again)
    pub fn set_fail_submits(&self, fail: bool) {
        self.fail_submits.store(fail, Ordering::SeqCst);
    }

    /// One ISO interval: send the head SDU of each stream.
    ///
    /// Returns the number of SDUs delivered.
    pub fn tick(&self) -> usize {
        let mut sent = 0;
        for (i, queue) in self.queues.iter().enumerate() {
            let Some(sdu) = queue.lock().pop_front() else {
                continue;
            };
            let stream = StreamHandle(i as u8);

            self.sdus_delivered.fetch_add(1, Ordering::Relaxed);
            self.bytes_delivered.fetch_add(sdu.buffer.len() as u64, Ordering::Relaxed);
            if self.record {
                self.delivered.lock().push(DeliveredSdu {
                    stream,
                    seq: sdu.seq,
                    payload: Bytes::copy_from_slice(sdu.buffer.as_slice()),
                });
            }
            sdu.buffer.release();

            self.emit(StreamEvent::Sent(stream));
            sent += 1;
        }
        sent
    }

    /// SDUs waiting on `stream`
    pub fn in_flight(&self, stream: StreamHandle) -> usize {
        self.queues.get(stream.index()).map_or(0, |q| q.lock().len())
    }

    /// Drain the recorded SDUs
    pub fn take_delivered(&self) -> Vec<DeliveredSdu> {
        std::mem::take(&mut *self.delivered.lock())
    }

    pub fn stats(&self) -> LoopbackStats {
        LoopbackStats {
            sdus_submitted: self.sdus_submitted.load(Ordering::Relaxed),
            sdus_delivered: self.sdus_delivered.load(Ordering::Relaxed),
            bytes_delivered: self.bytes_delivered.load(Ordering::Relaxed),
            submit_failures: self.submit_failures.load(Ordering::Relaxed),
        }
    }

    fn emit(&self, event: StreamEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!(?event, "Event receiver gone");
        }
    }
}

impl Transport for IsoLoopback {
    fn allocate_buffer(&self) -> Option<TxBuffer> {
        self.pool.try_alloc()
    }

    fn submit(&self, stream: StreamHandle, buffer: TxBuffer, seq: u32) -> Result<(), SubmitError> {
        let Some(queue) = self.queues.get(stream.index()) else {
            return Err(SubmitError {
                buffer,
                error: TransportError::UnknownStream(stream.0),
            });
        };

        if self.fail_submits.load(Ordering::SeqCst) {
            self.submit_failures.fetch_add(1, Ordering::Relaxed);
            return Err(SubmitError {
                buffer,
                error: TransportError::SendFailed {
                    stream: stream.0,
                    code: -5,
                },
            });
        }

        queue.lock().push_back(InFlight { seq, buffer });
        self.sdus_submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::event_channel;

    #[test]
    fn test_tick_releases_and_reports() {
        let (tx, rx) = event_channel();
        let loopback = IsoLoopback::new(2, TxBufferPool::new(4, 40), tx).with_recording();

        let mut buf = loopback.allocate_buffer().unwrap();
        buf.put_slice(&[7; 40]);
        loopback.submit(StreamHandle(1), buf, 0).unwrap();
        assert_eq!(loopback.pool().available(), 3);
        assert_eq!(loopback.in_flight(StreamHandle(1)), 1);

        assert_eq!(loopback.tick(), 1);
        assert_eq!(loopback.pool().available(), 4);
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::Sent(StreamHandle(1)));

        let delivered = loopback.take_delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].seq, 0);
        assert_eq!(delivered[0].payload.len(), 40);
    }

    #[test]
    fn test_failed_submit_returns_buffer() {
        let (tx, _rx) = event_channel();
        let loopback = IsoLoopback::new(1, TxBufferPool::new(1, 40), tx);
        loopback.set_fail_submits(true);

        let buf = loopback.allocate_buffer().unwrap();
        let err = loopback.submit(StreamHandle(0), buf, 0).unwrap_err();
        assert!(matches!(err.error, TransportError::SendFailed { stream: 0, .. }));
        assert_eq!(loopback.pool().available(), 0);
        err.buffer.release();
        assert_eq!(loopback.pool().available(), 1);
        assert_eq!(loopback.stats().submit_failures, 1);
    }

    #[test]
    fn test_unknown_stream() {
        let (tx, _rx) = event_channel();
        let loopback = IsoLoopback::new(1, TxBufferPool::new(1, 40), tx);
        let buf = loopback.allocate_buffer().unwrap();
        let err = loopback.submit(StreamHandle(3), buf, 0).unwrap_err();
        assert_eq!(err.error, TransportError::UnknownStream(3));
    }

    #[test]
    fn test_lifecycle_events() {
        let (tx, rx) = event_channel();
        let loopback = IsoLoopback::new(2, TxBufferPool::new(2, 40), tx);
        loopback.start_all();
        loopback.stop_all(REASON_LOCAL_HOST_TERMINATED);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events, vec![
            StreamEvent::Started(StreamHandle(0)),
            StreamEvent::Started(StreamHandle(1)),
            StreamEvent::Stopped { stream: StreamHandle(0), reason: 0x16 },
            StreamEvent::Stopped { stream: StreamHandle(1), reason: 0x16 },
        ]);
    }
}
