//! Isochronous transport boundary
//!
//! The engine never talks to a radio directly. It allocates transmit
//! buffers and submits them through [`Transport`], and learns about stream
//! lifecycle and completed sends through [`StreamEvent`]s, delivered either
//! on a single-consumer channel or straight to a [`StreamObserver`].

#[cfg(feature = "loopback")]
pub mod loopback;
pub mod pool;

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::error::TransportError;
pub use pool::{TxBuffer, TxBufferPool};

/// Index of a broadcast isochronous stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StreamHandle(pub u8);

impl StreamHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bis-{}", self.0)
    }
}

/// Notification delivered by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    /// The stream is ready to carry data
    Started(StreamHandle),
    /// The stream was torn down by the transport
    Stopped { stream: StreamHandle, reason: u8 },
    /// A previously submitted buffer has been sent
    Sent(StreamHandle),
}

pub type EventSender = Sender<StreamEvent>;
pub type EventReceiver = Receiver<StreamEvent>;

/// Create the single-consumer event queue
pub fn event_channel() -> (EventSender, EventReceiver) {
    crossbeam_channel::unbounded()
}

/// Receives stream events synchronously, one at a time
pub trait StreamObserver {
    fn on_started(&mut self, stream: StreamHandle);

    fn on_stopped(&mut self, stream: StreamHandle, reason: u8);

    fn on_sent(&mut self, stream: StreamHandle);

    fn dispatch(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Started(s) => self.on_started(s),
            StreamEvent::Stopped { stream, reason } => self.on_stopped(stream, reason),
            StreamEvent::Sent(s) => self.on_sent(s),
        }
    }
}

/// Submission failure; hands the buffer back so the caller can release it
#[derive(Debug)]
pub struct SubmitError {
    pub buffer: TxBuffer,
    pub error: TransportError,
}

/// Transmit side of the isochronous channel
pub trait Transport {
    /// Take one buffer from the shared pool, `None` when exhausted
    fn allocate_buffer(&self) -> Option<TxBuffer>;

    /// Queue `buffer` for transmission on `stream` with sequence number `seq`
    fn submit(&self, stream: StreamHandle, buffer: TxBuffer, seq: u32) -> Result<(), SubmitError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn allocate_buffer(&self) -> Option<TxBuffer> {
        (**self).allocate_buffer()
    }

    fn submit(&self, stream: StreamHandle, buffer: TxBuffer, seq: u32) -> Result<(), SubmitError> {
        (**self).submit(stream, buffer, seq)
    }
}
