//! Circular Byte Queue
//!
//! [`RingQueue`] buffers an unbounded byte stream in a bounded store. It is the
//! backbone of interrupt-driven and DMA-driven serial transfers: the producer
//! and consumer are usually different execution contexts (foreground code and
//! a peripheral interrupt handler) sharing one instance.
//!
//! # Storage
//!
//! The queue is generic over its backing store:
//!
//! - [`StaticQueue<N>`]: inline `[u8; N]`, const-constructible for statics
//! - [`ArenaQueue`]: caller-supplied `&mut [u8]`, never allocates
//! - [`HeapQueue`]: boxed slice allocated at runtime (`alloc` feature)
//!
//! # Access Patterns
//!
//! - Byte-wise: [`push_byte`](RingQueue::push_byte), [`pop_byte`](RingQueue::pop_byte)
//! - Bulk copies: [`push_array`](RingQueue::push_array), [`pop_array`](RingQueue::pop_array)
//! - Zero-copy: [`deferred_push`](RingQueue::deferred_push) /
//!   [`advance`](RingQueue::advance) and [`deferred_pop`](RingQueue::deferred_pop) /
//!   [`abandon`](RingQueue::abandon)
//!
//! A deferred view never crosses the physical end of the store. A caller that
//! needs the wrapped remainder asks again after committing the first run.
//!
//! # Overflow
//!
//! Pushing into a full queue drops bytes silently, since an interrupt handler
//! cannot apply backpressure. With the `watermark` feature the queue counts
//! the dropped bytes and records the highest occupancy it has seen.
//!
//! # Concurrency
//!
//! The queue performs no synchronization. Mask the interrupt that shares the
//! queue around every cursor update from foreground code, or wrap the queue in
//! a [`SharedQueue`](crate::sync::SharedQueue).
//!
//! # Example
//!
//! ```ignore
//! use ph_dma_stream::StaticQueue;
//!
//! let mut queue: StaticQueue<16> = StaticQueue::new();
//! queue.push_array(b"hello");
//!
//! let mut out = [0u8; 5];
//! assert_eq!(queue.pop_array(&mut out), 5);
//! ```

mod storage;

pub use storage::QueueStorage;

use crate::driver::error::{ConfigError, ConfigResult};
use crate::internal::constants::{DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY};

/// Circular byte queue over a [`QueueStorage`].
pub struct RingQueue<S: QueueStorage> {
    /// Backing store; only the first `capacity` bytes are used
    storage: S,
    /// Usable capacity in bytes
    capacity: usize,
    /// Read cursor
    head: usize,
    /// Write cursor
    tail: usize,
    /// Occupied bytes; disambiguates `head == tail`
    size: usize,
    /// Highest occupancy observed
    #[cfg(feature = "watermark")]
    watermark: usize,
    /// Bytes dropped on overflow
    #[cfg(feature = "watermark")]
    dropped: usize,
}

/// Queue with inline, statically sized storage.
pub type StaticQueue<const N: usize> = RingQueue<[u8; N]>;

/// Queue over caller-supplied arena storage.
pub type ArenaQueue<'a> = RingQueue<&'a mut [u8]>;

/// Queue over a heap allocation.
#[cfg(feature = "alloc")]
pub type HeapQueue = RingQueue<alloc::boxed::Box<[u8]>>;

impl<const N: usize> RingQueue<[u8; N]> {
    /// Create an empty queue with inline storage. Const-compatible.
    ///
    /// `N` must be in `1..=65535`; this is checked at compile time.
    #[must_use]
    pub const fn new() -> Self {
        const {
            assert!(N > 0 && N <= MAX_QUEUE_CAPACITY, "invalid queue capacity");
        }

        Self {
            storage: [0u8; N],
            capacity: N,
            head: 0,
            tail: 0,
            size: 0,
            #[cfg(feature = "watermark")]
            watermark: 0,
            #[cfg(feature = "watermark")]
            dropped: 0,
        }
    }
}

impl<const N: usize> Default for RingQueue<[u8; N]> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RingQueue<&'a mut [u8]> {
    /// Create an empty queue over an external buffer without allocating.
    ///
    /// A `capacity` of 0 selects the default capacity. The buffer must be at
    /// least `capacity` bytes long.
    pub fn over_arena(capacity: usize, buffer: &'a mut [u8]) -> ConfigResult<Self> {
        let capacity = resolve_capacity(capacity)?;
        if buffer.len() < capacity {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(Self::from_storage(buffer, capacity))
    }
}

#[cfg(feature = "alloc")]
impl RingQueue<alloc::boxed::Box<[u8]>> {
    /// Allocate an empty queue of `capacity` bytes.
    ///
    /// A `capacity` of 0 selects the default capacity.
    ///
    /// # Errors
    ///
    /// [`ConfigError::OutOfMemory`] when the allocation fails.
    pub fn with_capacity(capacity: usize) -> ConfigResult<Self> {
        let capacity = resolve_capacity(capacity)?;

        let mut buffer = alloc::vec::Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| ConfigError::OutOfMemory)?;
        buffer.resize(capacity, 0u8);

        Ok(Self::from_storage(buffer.into_boxed_slice(), capacity))
    }
}

fn resolve_capacity(capacity: usize) -> ConfigResult<usize> {
    let capacity = if capacity == 0 {
        DEFAULT_QUEUE_CAPACITY
    } else {
        capacity
    };

    if capacity > MAX_QUEUE_CAPACITY {
        return Err(ConfigError::InvalidCapacity);
    }
    Ok(capacity)
}

impl<S: QueueStorage> RingQueue<S> {
    fn from_storage(storage: S, capacity: usize) -> Self {
        Self {
            storage,
            capacity,
            head: 0,
            tail: 0,
            size: 0,
            #[cfg(feature = "watermark")]
            watermark: 0,
            #[cfg(feature = "watermark")]
            dropped: 0,
        }
    }

    /// Total capacity in bytes
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes currently queued
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of free bytes
    #[inline(always)]
    pub fn available(&self) -> usize {
        self.capacity - self.size
    }

    /// Check if the queue holds no bytes
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Check if the queue has no free space
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    #[inline(always)]
    fn wrap(&self, index: usize) -> usize {
        if index >= self.capacity {
            index - self.capacity
        } else {
            index
        }
    }

    #[inline(always)]
    fn bytes(&self) -> &[u8] {
        &self.storage.as_bytes()[..self.capacity]
    }

    #[inline(always)]
    fn bytes_mut(&mut self) -> &mut [u8] {
        let capacity = self.capacity;
        &mut self.storage.as_bytes_mut()[..capacity]
    }

    /// Push one byte. The byte is dropped when the queue is full.
    pub fn push_byte(&mut self, value: u8) {
        if self.is_full() {
            self.record_drop(1);
            return;
        }

        let tail = self.tail;
        self.bytes_mut()[tail] = value;
        self.tail = self.wrap(tail + 1);
        self.size += 1;
        self.record_level();
    }

    /// Pop one byte, or 0 when the queue is empty.
    pub fn pop_byte(&mut self) -> u8 {
        if self.is_empty() {
            return 0;
        }

        let value = self.bytes()[self.head];
        self.head = self.wrap(self.head + 1);
        self.size -= 1;
        value
    }

    /// Read the oldest byte without removing it, or 0 when empty.
    pub fn peek_byte(&self) -> u8 {
        if self.is_empty() {
            0
        } else {
            self.bytes()[self.head]
        }
    }

    /// Copy as many bytes from `data` as fit. Returns the number pushed.
    ///
    /// The excess is dropped; the caller checks the returned count.
    pub fn push_array(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.available());
        self.record_drop(data.len() - count);
        if count == 0 {
            return 0;
        }

        let tail = self.tail;
        let first = count.min(self.capacity - tail);
        let bytes = self.bytes_mut();
        bytes[tail..tail + first].copy_from_slice(&data[..first]);
        bytes[..count - first].copy_from_slice(&data[first..count]);

        self.tail = self.wrap(tail + count);
        self.size += count;
        self.record_level();
        count
    }

    /// Copy up to `buffer.len()` bytes out of the queue. Returns the number popped.
    pub fn pop_array(&mut self, buffer: &mut [u8]) -> usize {
        let count = buffer.len().min(self.size);
        if count == 0 {
            return 0;
        }

        let head = self.head;
        let first = count.min(self.capacity - head);
        let bytes = self.bytes();
        buffer[..first].copy_from_slice(&bytes[head..head + first]);
        buffer[first..count].copy_from_slice(&bytes[..count - first]);

        self.head = self.wrap(head + count);
        self.size -= count;
        count
    }

    /// Contiguous writable run starting `offset` bytes past the write cursor.
    ///
    /// The run ends at the read side of the free space or at the physical end
    /// of the store, whichever is nearer. Cursors are not moved; commit the
    /// written bytes with [`advance`](Self::advance). An `offset` at or beyond
    /// the free space yields an empty slice.
    pub fn deferred_push(&mut self, offset: usize) -> &mut [u8] {
        let free = self.available();
        if offset >= free {
            return &mut [];
        }

        let start = self.wrap(self.tail + offset);
        let len = (free - offset).min(self.capacity - start);
        &mut self.bytes_mut()[start..start + len]
    }

    /// Contiguous readable run starting `offset` bytes past the read cursor.
    ///
    /// Cursors are not moved; release the consumed bytes with
    /// [`abandon`](Self::abandon). An `offset` at or beyond the queued size
    /// yields an empty slice.
    pub fn deferred_pop(&self, offset: usize) -> &[u8] {
        if offset >= self.size {
            return &[];
        }

        let start = self.wrap(self.head + offset);
        let len = (self.size - offset).min(self.capacity - start);
        &self.bytes()[start..start + len]
    }

    /// Commit `count` bytes written through [`deferred_push`](Self::deferred_push).
    pub fn advance(&mut self, count: usize) {
        debug_assert!(count <= self.available(), "advance beyond free space");
        let count = count.min(self.available());

        self.tail = self.wrap(self.tail + count);
        self.size += count;
        self.record_level();
    }

    /// Release `count` bytes read through [`deferred_pop`](Self::deferred_pop).
    pub fn abandon(&mut self, count: usize) {
        debug_assert!(count <= self.size, "abandon beyond queued size");
        let count = count.min(self.size);

        self.head = self.wrap(self.head + count);
        self.size -= count;
    }

    /// Discard all queued bytes and rewind both cursors.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.size = 0;
    }

    /// Highest occupancy observed since creation or the last reset
    #[cfg(feature = "watermark")]
    #[inline(always)]
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Bytes dropped on overflow since creation or the last reset
    #[cfg(feature = "watermark")]
    #[inline(always)]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Reset the watermark to the current occupancy and the drop counter to 0
    #[cfg(feature = "watermark")]
    pub fn reset_stats(&mut self) {
        self.watermark = self.size;
        self.dropped = 0;
    }

    #[inline(always)]
    fn record_level(&mut self) {
        #[cfg(feature = "watermark")]
        if self.size > self.watermark {
            self.watermark = self.size;
        }
    }

    #[inline(always)]
    fn record_drop(&mut self, count: usize) {
        #[cfg(feature = "watermark")]
        {
            self.dropped = self.dropped.saturating_add(count);
        }
        #[cfg(not(feature = "watermark"))]
        let _ = count;
    }
}

impl<S: QueueStorage> core::fmt::Debug for RingQueue<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingQueue")
            .field("capacity", &self.capacity)
            .field("size", &self.size)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
