//! ISR-safe stream and queue wrappers using critical sections.
//!
//! Provides [`SharedStream`] for a descriptor stream shared between
//! foreground code and its channel interrupt, and [`SharedQueue`] for a
//! byte queue shared the same way.

use embedded_hal::delay::DelayNs;

#[cfg(feature = "async")]
use super::primitives::AtomicWaker;
use super::primitives::CriticalSectionCell;
use crate::driver::error::{IoError, Result};
use crate::driver::interrupt::{Status, TransferEvent};
use crate::driver::stream::DescriptorStream;
use crate::hal::channel::DmaChannel;
use crate::hal::registry::ChannelHandler;
use crate::internal::constants::WAIT_POLL_INTERVAL_US;
use crate::queue::{QueueStorage, RingQueue};

// =============================================================================
// Shared Stream
// =============================================================================

/// ISR-safe descriptor stream slot.
///
/// The stream is installed once it has been created and is then only
/// touched through `critical_section::with()`. Installing moves the stream
/// into its final location, so enable it afterwards through [`with`].
///
/// Registered with a [`ChannelRegistry`], the slot receives channel events
/// through its [`ChannelHandler`] implementation.
///
/// # Example
///
/// ```ignore
/// static STREAM: SharedStream<MmioChannel, 8> = SharedStream::new();
///
/// STREAM.install(stream);
/// REGISTRY.register_handler(0, &STREAM)?;
/// STREAM.with(|s| s.enable()).unwrap()?;
/// STREAM.wait_blocking()?;
///
/// #[interrupt]
/// fn DMA_CH0() {
///     let status = CHANNEL0.take_interrupt_status();
///     if let Some(event) = status.event() {
///         REGISTRY.dispatch(0, event);
///     }
/// }
/// ```
///
/// [`with`]: SharedStream::with
/// [`ChannelRegistry`]: crate::hal::registry::ChannelRegistry
pub struct SharedStream<C: DmaChannel + 'static, const N: usize> {
    inner: CriticalSectionCell<Option<DescriptorStream<'static, C, N>>>,
    #[cfg(feature = "async")]
    pub(super) waker: AtomicWaker,
}

impl<C: DmaChannel + 'static, const N: usize> SharedStream<C, N> {
    /// Create an empty slot (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            inner: CriticalSectionCell::new(None),
            #[cfg(feature = "async")]
            waker: AtomicWaker::new(),
        }
    }

    /// Move `stream` into the slot, returning the previous stream.
    pub fn install(
        &self,
        stream: DescriptorStream<'static, C, N>,
    ) -> Option<DescriptorStream<'static, C, N>> {
        self.inner.with(|slot| slot.replace(stream))
    }

    /// Remove the stream from the slot.
    pub fn take(&self) -> Option<DescriptorStream<'static, C, N>> {
        self.inner.with(Option::take)
    }

    /// Execute a closure with exclusive access to the stream.
    ///
    /// Returns `None` when no stream is installed.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut DescriptorStream<'static, C, N>) -> R,
    {
        self.inner.with(|slot| slot.as_mut().map(f))
    }

    /// Try to execute a closure, returning `None` if already borrowed or empty.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut DescriptorStream<'static, C, N>) -> R,
    {
        self.inner.try_with(|slot| slot.as_mut().map(f)).flatten()
    }

    /// Polled status of the installed stream
    pub fn status(&self) -> Option<Status> {
        self.inner.with_ref(|slot| slot.as_ref().map(DescriptorStream::status))
    }

    /// Spin until the stream leaves the `Busy` state.
    ///
    /// # Errors
    ///
    /// - [`IoError::InvalidState`] when no stream is installed
    /// - the stream's final status as an error (see [`Status::into_result`])
    pub fn wait_blocking(&self) -> Result<()> {
        loop {
            match self.status() {
                None => return Err(IoError::InvalidState.into()),
                Some(Status::Busy) => core::hint::spin_loop(),
                Some(status) => return status.into_result(),
            }
        }
    }

    /// Wait until the stream leaves the `Busy` state or `timeout_us` elapses.
    ///
    /// The stream keeps running after a timeout.
    ///
    /// # Errors
    ///
    /// - [`IoError::Timeout`] when the stream is still busy after `timeout_us`
    /// - otherwise as [`wait_blocking`](Self::wait_blocking)
    pub fn wait_timeout<D: DelayNs>(&self, delay: &mut D, timeout_us: u32) -> Result<()> {
        let mut elapsed = 0u32;
        loop {
            match self.status() {
                None => return Err(IoError::InvalidState.into()),
                Some(Status::Busy) => {}
                Some(status) => return status.into_result(),
            }
            if elapsed >= timeout_us {
                return Err(IoError::Timeout.into());
            }
            delay.delay_us(WAIT_POLL_INTERVAL_US);
            elapsed += WAIT_POLL_INTERVAL_US;
        }
    }

    /// Wait asynchronously until the stream leaves the `Busy` state.
    ///
    /// Events must reach the slot through [`ChannelHandler::on_event`] for
    /// the future to be woken.
    #[cfg(feature = "async")]
    pub fn wait(&self) -> super::asynch::WaitFuture<'_, C, N> {
        super::asynch::WaitFuture::new(self)
    }
}

impl<C: DmaChannel + 'static, const N: usize> Default for SharedStream<C, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: DmaChannel + 'static, const N: usize> ChannelHandler for SharedStream<C, N> {
    fn on_event(&self, event: TransferEvent) {
        self.try_with(|stream| stream.on_interrupt(event));

        #[cfg(feature = "async")]
        self.waker.wake();
    }
}

// =============================================================================
// Shared Queue
// =============================================================================

/// ISR-safe byte queue.
///
/// # Example
///
/// ```ignore
/// static RX: SharedQueue<[u8; 256]> = SharedQueue::new();
///
/// // UART interrupt
/// RX.push_byte(byte);
///
/// // Foreground
/// let n = RX.pop_array(&mut buf);
/// ```
pub struct SharedQueue<S: QueueStorage> {
    inner: CriticalSectionCell<RingQueue<S>>,
}

impl<const N: usize> SharedQueue<[u8; N]> {
    /// Create an empty inline queue (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            inner: CriticalSectionCell::new(RingQueue::new()),
        }
    }
}

impl<const N: usize> Default for SharedQueue<[u8; N]> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: QueueStorage> SharedQueue<S> {
    /// Wrap an existing queue.
    pub const fn from_queue(queue: RingQueue<S>) -> Self {
        Self {
            inner: CriticalSectionCell::new(queue),
        }
    }

    /// Execute a closure with exclusive access to the queue.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut RingQueue<S>) -> R,
    {
        self.inner.with(f)
    }

    /// Push one byte, dropping it when the queue is full
    pub fn push_byte(&self, value: u8) {
        self.inner.with(|queue| queue.push_byte(value));
    }

    /// Push as many bytes as fit. Returns the number pushed.
    pub fn push_array(&self, data: &[u8]) -> usize {
        self.inner.with(|queue| queue.push_array(data))
    }

    /// Pop up to `buffer.len()` bytes. Returns the number popped.
    pub fn pop_array(&self, buffer: &mut [u8]) -> usize {
        self.inner.with(|queue| queue.pop_array(buffer))
    }

    /// Number of queued bytes
    pub fn size(&self) -> usize {
        self.inner.with_ref(RingQueue::size)
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.inner.with_ref(RingQueue::is_empty)
    }
}
