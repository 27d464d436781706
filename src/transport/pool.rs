//! Fixed-size transmit buffer pool
//!
//! Buffers go back to the pool when dropped, so a failed submission only
//! has to let go of its buffer.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use crossbeam::queue::ArrayQueue;

struct PoolInner {
    free: ArrayQueue<BytesMut>,
    capacity: usize,
    buf_size: usize,
    exhausted: AtomicU64,
}

/// Shared pool of transmit buffers, safe for concurrent acquisition
#[derive(Clone)]
pub struct TxBufferPool {
    inner: Arc<PoolInner>,
}

impl TxBufferPool {
    /// Create a pool of `count` buffers of `buf_size` bytes each
    pub fn new(count: usize, buf_size: usize) -> Self {
        let free = ArrayQueue::new(count.max(1));
        for _ in 0..count {
            let _ = free.push(BytesMut::with_capacity(buf_size));
        }
        Self {
            inner: Arc::new(PoolInner {
                free,
                capacity: count,
                buf_size,
                exhausted: AtomicU64::new(0),
            }),
        }
    }

    /// Take a buffer without blocking
    pub fn try_alloc(&self) -> Option<TxBuffer> {
        match self.inner.free.pop() {
            Some(data) => Some(TxBuffer {
                data: Some(data),
                pool: self.inner.clone(),
            }),
            None => {
                self.inner.exhausted.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn available(&self) -> usize {
        self.inner.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Allocation attempts that found the pool empty
    pub fn exhausted_count(&self) -> u64 {
        self.inner.exhausted.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for TxBufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxBufferPool")
            .field("available", &self.available())
            .field("capacity", &self.capacity())
            .field("buf_size", &self.inner.buf_size)
            .finish()
    }
}

/// A buffer borrowed from a [`TxBufferPool`]
pub struct TxBuffer {
    data: Option<BytesMut>,
    pool: Arc<PoolInner>,
}

impl TxBuffer {
    /// Append bytes, clamped to the pool's buffer size
    pub fn put_slice(&mut self, src: &[u8]) {
        let room = self.pool.buf_size.saturating_sub(self.len());
        if let Some(data) = self.data.as_mut() {
            data.put_slice(&src[..src.len().min(room)]);
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the buffer to its pool
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for TxBuffer {
    fn drop(&mut self) {
        if let Some(mut data) = self.data.take() {
            data.clear();
            let _ = self.pool.free.push(data);
        }
    }
}

impl fmt::Debug for TxBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxBuffer").field("len", &self.len()).finish()
    }
}
