//! Byte pumps between ring queues and peripheral data registers
//!
//! The pumps combine a [`RingQueue`] with a [`DescriptorStream`] so that a
//! byte-oriented peripheral (a UART, for example) moves data without
//! per-byte interrupts:
//!
//! - [`TxPump`] drains its queue into a fixed transmit register. Each
//!   transfer covers the longest contiguous run of queued bytes and is
//!   released from the queue only after it completes.
//! - [`RxPump`] receives into a staging buffer split into two halves that
//!   form a circular chain. A finished half is copied into the queue from
//!   the interrupt path; a partially filled half is harvested on line idle.
//!
//! Both pumps hand out raw addresses of their own memory to the controller,
//! so they must stay in place once a transfer has been started.
//!
//! A [`Notify`] callback tells foreground code that the transmit queue
//! drained or that received bytes reached the receive queue.
//!
//! # Example
//!
//! ```ignore
//! let mut tx = unsafe {
//!     TxPump::new(channel, &REGISTRY, UART_TDR as *mut u8, StaticQueue::<256>::new())?
//! };
//! tx.write(b"hello");
//!
//! // DMA interrupt
//! tx.on_interrupt(event);
//! ```

#[cfg(feature = "log")]
use log::warn;

use crate::driver::config::{StreamConfig, TransferSettings, Width};
use crate::driver::error::{ConfigError, ConfigResult, DmaResult, Error, Result};
use crate::driver::interrupt::{Status, TransferEvent};
use crate::driver::stream::DescriptorStream;
use crate::hal::channel::DmaChannel;
use crate::hal::registry::ChannelRegistry;
use crate::queue::{QueueStorage, RingQueue};

/// Pump notification, invoked from interrupt context.
///
/// The callback must not block.
pub type Notify<'a> = &'a dyn Fn();

// =============================================================================
// Transmit Pump
// =============================================================================

/// Queue-to-register transmit pump.
pub struct TxPump<'a, C: DmaChannel, S: QueueStorage> {
    stream: DescriptorStream<'a, C, 1>,
    queue: RingQueue<S>,
    /// Peripheral transmit data register
    target: *mut u8,
    /// Bytes handed to the controller and not yet released
    in_flight: usize,
    /// Why the last transfer could not be started
    error: Option<Error>,
    callback: Option<Notify<'a>>,
}

impl<'a, C: DmaChannel, S: QueueStorage> TxPump<'a, C, S> {
    /// Create a transmit pump writing bytes to `target`.
    ///
    /// # Safety
    ///
    /// `target` must be a writable peripheral data register for as long as
    /// the pump exists.
    pub unsafe fn new(
        channel: C,
        registry: &'a ChannelRegistry,
        target: *mut u8,
        queue: RingQueue<S>,
    ) -> ConfigResult<Self> {
        let config =
            StreamConfig::new().with_settings(TransferSettings::memory_to_peripheral(Width::Byte));

        Ok(Self {
            stream: DescriptorStream::new(channel, registry, config)?,
            queue,
            target,
            in_flight: 0,
            error: None,
            callback: None,
        })
    }

    /// Install or remove the drain notification.
    ///
    /// Called each time the last queued byte has been sent.
    pub fn set_callback(&mut self, callback: Option<Notify<'a>>) {
        self.callback = callback;
    }

    /// Queue as much of `data` as fits and start transmitting.
    ///
    /// Returns the number of bytes accepted.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let mut written = 0;

        while written < data.len() {
            let run = self.queue.deferred_push(0);
            if run.is_empty() {
                break;
            }
            let count = run.len().min(data.len() - written);
            run[..count].copy_from_slice(&data[written..written + count]);
            self.queue.advance(count);
            written += count;
        }

        if self.in_flight == 0 && !self.queue.is_empty() {
            self.kick();
        }
        written
    }

    /// Start the next transfer. A failed start leaves the bytes queued for
    /// the next write and is kept in [`error`](Self::error).
    fn kick(&mut self) {
        match self.start_run() {
            Ok(()) => self.error = None,
            Err(err) => {
                #[cfg(feature = "log")]
                warn!(
                    "TX pump on DMA channel {} not started: {}",
                    self.stream.channel_number(),
                    err
                );
                self.error = Some(err);
            }
        }
    }

    /// Start a transfer over the next contiguous run of queued bytes.
    fn start_run(&mut self) -> Result<()> {
        let run = self.queue.deferred_pop(0);
        let (start, len) = (run.as_ptr(), run.len().min(C::MAX_TRANSFER as usize));

        // SAFETY: the run stays queued until the transfer completes and the
        // caller guarantees `target` is writable.
        unsafe { self.stream.append(self.target, start, len)? };
        self.stream.enable()?;

        self.in_flight = len;
        Ok(())
    }

    /// Handle one event of the transmit channel.
    ///
    /// Completed bytes are released from the queue and the next run is
    /// started. A bus error keeps the bytes queued so they are sent again.
    pub fn on_interrupt(&mut self, event: TransferEvent) -> Option<Status> {
        let status = self.stream.on_interrupt(event)?;

        if !self.stream.is_bound() {
            if status != Status::Error {
                self.queue.abandon(self.in_flight);
            }
            self.in_flight = 0;

            if !self.queue.is_empty() {
                self.kick();
            } else if let Some(callback) = self.callback {
                callback();
            }
        }
        Some(status)
    }

    /// Error of the last failed transfer start, cleared by the next
    /// successful one
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    /// Bytes waiting to be sent, including the transfer in flight
    pub fn pending(&self) -> usize {
        self.queue.size()
    }

    /// Free space in the transmit queue
    pub fn available(&self) -> usize {
        self.queue.available()
    }

    /// Check if nothing is being transmitted
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    /// Transmit queue, for statistics
    pub fn queue(&self) -> &RingQueue<S> {
        &self.queue
    }

    /// Underlying descriptor stream
    pub fn stream(&self) -> &DescriptorStream<'a, C, 1> {
        &self.stream
    }
}

// =============================================================================
// Receive Pump
// =============================================================================

/// Keeps every descriptor of the receive chain armed
fn arm_every_half(_: Status) {}

/// Register-to-queue receive pump with an `2 * H` byte staging buffer.
pub struct RxPump<'a, C: DmaChannel, S: QueueStorage, const H: usize> {
    stream: DescriptorStream<'a, C, 2>,
    queue: RingQueue<S>,
    staging: [[u8; H]; 2],
    /// Peripheral receive data register
    source: *const u8,
    /// Staging offset of the first byte not yet copied into the queue
    position: usize,
    callback: Option<Notify<'a>>,
}

impl<'a, C: DmaChannel, S: QueueStorage, const H: usize> RxPump<'a, C, S, H> {
    /// Create a receive pump reading bytes from `source`.
    ///
    /// # Safety
    ///
    /// `source` must be a readable peripheral data register for as long as
    /// the pump exists.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidCapacity`] when a half does not fit one descriptor.
    pub unsafe fn new(
        channel: C,
        registry: &'a ChannelRegistry,
        source: *const u8,
        queue: RingQueue<S>,
    ) -> ConfigResult<Self> {
        if H == 0 || H > C::MAX_TRANSFER as usize {
            return Err(ConfigError::InvalidCapacity);
        }

        let config = StreamConfig::circular(TransferSettings::peripheral_to_memory(Width::Byte));
        let mut stream = DescriptorStream::new(channel, registry, config)?;
        stream.set_callback(Some(&arm_every_half));

        Ok(Self {
            stream,
            queue,
            staging: [[0; H]; 2],
            source,
            position: 0,
            callback: None,
        })
    }

    /// Install or remove the receive notification.
    ///
    /// Called whenever received bytes were moved into the queue, from either
    /// [`on_interrupt`](Self::on_interrupt) or [`on_idle`](Self::on_idle).
    pub fn set_callback(&mut self, callback: Option<Notify<'a>>) {
        self.callback = callback;
    }

    /// Chain both staging halves and start receiving.
    ///
    /// # Errors
    ///
    /// Any error of [`DescriptorStream::enable`].
    pub fn start(&mut self) -> Result<()> {
        self.stream.clear();
        self.position = 0;

        let base = self.staging.as_mut_ptr().cast::<u8>();
        for half in 0..2 {
            // SAFETY: the staging buffer lives as long as the stream and the
            // caller guarantees `source` is readable.
            unsafe { self.stream.append(base.add(half * H), self.source, H)? };
        }
        self.stream.enable()
    }

    /// Stop receiving. Bytes in a partially filled half are discarded.
    pub fn stop(&mut self) {
        self.stream.disable();
    }

    /// Half the controller is currently filling
    fn executing_half(&self) -> usize {
        if self.stream.queued() == 2 { 0 } else { 1 }
    }

    /// Copy staged bytes up to `end` into the queue and notify
    fn push_staged(&mut self, end: usize) -> usize {
        if end <= self.position {
            return 0;
        }
        let count = self
            .queue
            .push_array(&self.staging.as_flattened()[self.position..end]);

        if count > 0
            && let Some(callback) = self.callback
        {
            callback();
        }
        count
    }

    /// Handle one event of the receive channel.
    ///
    /// On every half completion the remainder of the finished half is
    /// copied into the queue.
    pub fn on_interrupt(&mut self, event: TransferEvent) -> Option<Status> {
        let status = self.stream.on_interrupt(event)?;

        if event == TransferEvent::Progress {
            // The controller moved on; the other half is complete
            let end = if self.executing_half() == 1 { H } else { 2 * H };
            self.push_staged(end);
            self.position = end % (2 * H);
        }
        Some(status)
    }

    /// Harvest bytes of the half being filled. Call on line idle.
    ///
    /// Returns the number of bytes moved into the queue. Nothing is moved
    /// while a half completion is still waiting for the interrupt path.
    ///
    /// # Errors
    ///
    /// [`DmaError::ResidueUnstable`](crate::driver::error::DmaError::ResidueUnstable)
    /// when the controller switched halves during the read.
    pub fn on_idle(&mut self) -> DmaResult<usize> {
        if !self.stream.is_bound() {
            return Ok(0);
        }

        let half = self.executing_half();
        let residue = self.stream.residue()?;
        if self.executing_half() != half || self.position / H != half {
            return Ok(0);
        }

        let end = (half + 1) * H - residue.min(H);
        let count = self.push_staged(end);
        self.position = self.position.max(end);
        Ok(count)
    }

    /// Copy received bytes into `buffer`. Returns the number read.
    pub fn read(&mut self, buffer: &mut [u8]) -> usize {
        self.queue.pop_array(buffer)
    }

    /// Bytes waiting to be read
    pub fn pending(&self) -> usize {
        self.queue.size()
    }

    /// Receive queue, for statistics
    pub fn queue(&self) -> &RingQueue<S> {
        &self.queue
    }

    /// Underlying descriptor stream
    pub fn stream(&self) -> &DescriptorStream<'a, C, 2> {
        &self.stream
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::driver::config::StreamState;
    use crate::driver::error::DmaError;
    use crate::queue::StaticQueue;
    use crate::testing::{MockChannel, MockHardware};

    type Tx<'a> = TxPump<'a, MockChannel<'a>, [u8; 8]>;
    type Rx<'a> = RxPump<'a, MockChannel<'a>, [u8; 16], 4>;

    // -------------------------------------------------------------------------
    // TxPump
    // -------------------------------------------------------------------------

    #[test]
    fn tx_write_starts_transfer() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let mut tdr = 0u8;
        let mut tx: Tx<'_> =
            unsafe { TxPump::new(hw.channel(), &registry, &mut tdr, StaticQueue::new()) }.unwrap();

        assert_eq!(tx.write(b"abc"), 3);
        assert!(!tx.is_idle());
        assert_eq!(hw.starts(), 1);
        assert_eq!(tx.pending(), 3);

        let event = hw.run_to_event().unwrap();
        assert_eq!(tx.on_interrupt(event), Some(Status::Ok));
        assert!(tx.is_idle());
        assert_eq!(tx.pending(), 0);
        assert_eq!(tdr, b'c');
    }

    #[test]
    fn tx_write_drops_excess() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let mut tdr = 0u8;
        let mut tx: Tx<'_> =
            unsafe { TxPump::new(hw.channel(), &registry, &mut tdr, StaticQueue::new()) }.unwrap();

        assert_eq!(tx.write(b"0123456789"), 8);
        assert_eq!(tx.available(), 0);
        assert_eq!(tx.write(b"x"), 0);
    }

    #[test]
    fn tx_continues_across_wrap() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let mut tdr = 0u8;
        let mut tx: Tx<'_> =
            unsafe { TxPump::new(hw.channel(), &registry, &mut tdr, StaticQueue::new()) }.unwrap();

        tx.write(b"012345");
        let event = hw.run_to_event().unwrap();
        tx.on_interrupt(event);

        // Tail sits at 6: the next write wraps and needs two transfers
        assert_eq!(tx.write(b"abcd"), 4);
        let event = hw.run_to_event().unwrap();
        tx.on_interrupt(event);
        assert_eq!(tdr, b'b');
        assert_eq!(tx.pending(), 2);
        assert_eq!(hw.starts(), 3);

        let event = hw.run_to_event().unwrap();
        tx.on_interrupt(event);
        assert_eq!(tdr, b'd');
        assert!(tx.is_idle());
        assert_eq!(tx.stream().state(), StreamState::Done);
    }

    #[test]
    fn tx_bus_error_keeps_bytes() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let mut tdr = 0u8;
        let mut tx: Tx<'_> =
            unsafe { TxPump::new(hw.channel(), &registry, &mut tdr, StaticQueue::new()) }.unwrap();

        tx.write(b"xy");
        assert_eq!(tx.on_interrupt(TransferEvent::BusError), Some(Status::Error));

        // Retried from the start of the queue
        assert_eq!(tx.pending(), 2);
        assert_eq!(hw.starts(), 2);
        let event = hw.run_to_event().unwrap();
        tx.on_interrupt(event);
        assert_eq!(tdr, b'y');
        assert_eq!(tx.pending(), 0);
    }

    #[test]
    fn tx_channel_busy_leaves_bytes_queued() {
        let hw = MockHardware::new(1);
        let registry = ChannelRegistry::new();
        let other = registry.allocate_owner();
        registry.bind(1, other).unwrap();

        let mut tdr = 0u8;
        let mut tx: Tx<'_> =
            unsafe { TxPump::new(hw.channel(), &registry, &mut tdr, StaticQueue::new()) }.unwrap();

        assert_eq!(tx.write(b"hi"), 2);
        assert!(tx.is_idle());
        assert_eq!(tx.pending(), 2);
        assert_eq!(hw.starts(), 0);

        registry.release(1, other);
        tx.write(b"!");
        assert_eq!(hw.starts(), 1);
    }

    #[test]
    fn tx_keeps_start_failure() {
        let hw = MockHardware::new(3);
        let registry = ChannelRegistry::new();
        let other = registry.allocate_owner();
        registry.bind(3, other).unwrap();

        let mut tdr = 0u8;
        let mut tx: Tx<'_> =
            unsafe { TxPump::new(hw.channel(), &registry, &mut tdr, StaticQueue::new()) }.unwrap();
        assert_eq!(tx.error(), None);

        tx.write(b"hi");
        assert_eq!(tx.error(), Some(Error::Dma(DmaError::ChannelBusy)));
        assert_eq!(tx.stream().status(), Status::Error);

        registry.release(3, other);
        tx.write(b"!");
        assert_eq!(tx.error(), None);
        assert_eq!(tx.pending(), 3);
    }

    #[test]
    fn tx_notifies_once_queue_drains() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let drained = Cell::new(0);
        let notify = || drained.set(drained.get() + 1);
        let mut tdr = 0u8;
        let mut tx: Tx<'_> =
            unsafe { TxPump::new(hw.channel(), &registry, &mut tdr, StaticQueue::new()) }.unwrap();
        tx.set_callback(Some(&notify));

        tx.write(b"012345");
        let event = hw.run_to_event().unwrap();
        tx.on_interrupt(event);
        assert_eq!(drained.get(), 1);

        // Wrapped write: the first run leaves bytes queued
        tx.write(b"abcd");
        let event = hw.run_to_event().unwrap();
        tx.on_interrupt(event);
        assert_eq!(drained.get(), 1);
        assert_eq!(tx.pending(), 2);

        let event = hw.run_to_event().unwrap();
        tx.on_interrupt(event);
        assert_eq!(drained.get(), 2);
        assert!(tx.is_idle());
    }

    // -------------------------------------------------------------------------
    // RxPump
    // -------------------------------------------------------------------------

    fn rx_pump<'a>(hw: &'a MockHardware, registry: &'a ChannelRegistry, rdr: &u8) -> Rx<'a> {
        unsafe { RxPump::new(hw.channel(), registry, rdr, StaticQueue::new()) }.unwrap()
    }

    #[test]
    fn rx_rejects_empty_half() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let rdr = 0u8;
        let result: ConfigResult<RxPump<'_, MockChannel<'_>, [u8; 4], 0>> =
            unsafe { RxPump::new(hw.channel(), &registry, &rdr, StaticQueue::new()) };
        assert!(matches!(result, Err(ConfigError::InvalidCapacity)));
    }

    #[test]
    fn rx_half_completion_fills_queue() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let rdr = 0x41u8;
        let mut rx = rx_pump(&hw, &registry, &rdr);
        rx.start().unwrap();

        let event = hw.run_to_event().unwrap();
        assert_eq!(event, TransferEvent::Progress);
        assert_eq!(rx.on_interrupt(event), Some(Status::Busy));
        assert_eq!(rx.pending(), 4);

        let event = hw.run_to_event().unwrap();
        rx.on_interrupt(event);
        assert_eq!(rx.pending(), 8);

        let mut out = [0u8; 8];
        assert_eq!(rx.read(&mut out), 8);
        assert_eq!(out, [0x41; 8]);
    }

    #[test]
    fn rx_idle_harvests_partial_half() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let rdr = 0x55u8;
        let mut rx = rx_pump(&hw, &registry, &rdr);
        rx.start().unwrap();

        hw.move_elements(3);
        assert_eq!(rx.on_idle(), Ok(3));
        assert_eq!(rx.on_idle(), Ok(0));
        assert_eq!(rx.pending(), 3);

        // The rest of the half arrives with the completion
        let event = hw.run_to_event().unwrap();
        rx.on_interrupt(event);
        assert_eq!(rx.pending(), 4);

        // Second half, harvested mid-way
        hw.move_elements(2);
        assert_eq!(rx.on_idle(), Ok(2));
        let event = hw.run_to_event().unwrap();
        rx.on_interrupt(event);
        assert_eq!(rx.pending(), 8);
    }

    #[test]
    fn rx_idle_defers_to_pending_completion() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let rdr = 0x11u8;
        let mut rx = rx_pump(&hw, &registry, &rdr);
        rx.start().unwrap();

        // First half done and one byte into the second, interrupt not serviced
        hw.finish_current();
        hw.move_elements(1);
        assert_eq!(rx.on_idle(), Ok(0));

        rx.on_interrupt(TransferEvent::Progress);
        assert_eq!(rx.pending(), 4);
        assert_eq!(rx.on_idle(), Ok(1));
        assert_eq!(rx.pending(), 5);
    }

    #[test]
    fn rx_notifies_when_bytes_arrive() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let arrivals = Cell::new(0);
        let notify = || arrivals.set(arrivals.get() + 1);
        let rdr = 0x33u8;
        let mut rx = rx_pump(&hw, &registry, &rdr);
        rx.set_callback(Some(&notify));
        rx.start().unwrap();

        hw.move_elements(2);
        assert_eq!(rx.on_idle(), Ok(2));
        assert_eq!(arrivals.get(), 1);

        // Idle with nothing new stays quiet
        assert_eq!(rx.on_idle(), Ok(0));
        assert_eq!(arrivals.get(), 1);

        let event = hw.run_to_event().unwrap();
        rx.on_interrupt(event);
        assert_eq!(arrivals.get(), 2);
        assert_eq!(rx.pending(), 4);
    }

    #[test]
    fn rx_overflow_counts_dropped_bytes() {
        let hw = MockHardware::new(0);
        let registry = ChannelRegistry::new();
        let rdr = 0u8;
        let mut rx = rx_pump(&hw, &registry, &rdr);
        rx.start().unwrap();

        for _ in 0..5 {
            let event = hw.run_to_event().unwrap();
            rx.on_interrupt(event);
        }
        assert_eq!(rx.pending(), 16);
        assert!(rx.queue().is_full());
        #[cfg(feature = "watermark")]
        assert_eq!(rx.queue().dropped(), 4);
    }

    #[test]
    fn rx_stop_releases_channel() {
        let hw = MockHardware::new(2);
        let registry = ChannelRegistry::new();
        let rdr = 0u8;
        let mut rx = rx_pump(&hw, &registry, &rdr);
        rx.start().unwrap();
        assert!(registry.is_bound(2));

        rx.stop();
        assert!(!registry.is_bound(2));
        assert_eq!(rx.on_idle(), Ok(0));
        assert_eq!(rx.on_interrupt(TransferEvent::Progress), None);
    }
}
