//! Scatter-gather DMA descriptor stream
//!
//! A [`DescriptorStream`] turns a fixed pool of `N` hardware descriptors into
//! a virtually unbounded transfer stream on one DMA channel.
//!
//! # State Machine
//!
//! ```text
//!          append          enable             Complete
//!   Idle ─────────► Ready ────────► Busy ─────────────────► Done
//!                     ▲               │  BusError                ─► Error
//!                     │               │  Timeout (Restart/Abort) ─► Timeout
//!                     └── append ─────┴── (from Done/Error/Timeout, pool reset)
//! ```
//!
//! # Chain Modes
//!
//! - [`ChainMode::OneShot`]: the last descriptor terminates the chain.
//!   Completed descriptors are retired from the interrupt path and their
//!   slots reused, so appends may continue indefinitely while the channel
//!   runs. When the controller stops with descriptors still queued (the
//!   continuation was linked too late) the stream restarts at the first
//!   stalled descriptor.
//! - [`ChainMode::Circular`]: the last descriptor points back to the first.
//!   Nothing is retired; the stream runs until disabled.
//!
//! # Placement
//!
//! Descriptors link to each other by absolute address. [`enable`] relinks the
//! chain, so a stream may be moved while idle, but it must stay in its final
//! memory location while the channel is running.
//!
//! # Example
//!
//! ```ignore
//! use ph_dma_stream::{DescriptorStream, MmioChannel, StreamConfig, REGISTRY};
//!
//! let channel = unsafe { MmioChannel::new(DMA_CH0_BASE, 0) };
//! let mut stream: DescriptorStream<_, 8> =
//!     DescriptorStream::new(channel, &REGISTRY, StreamConfig::new())?;
//!
//! unsafe { stream.append(dst.as_mut_ptr(), src.as_ptr(), src.len())? };
//! stream.enable()?;
//! ```
//!
//! [`enable`]: DescriptorStream::enable

#[cfg(feature = "log")]
use log::{debug, trace, warn};

use crate::driver::config::{
    ChainMode, StreamConfig, StreamState, TimeoutPolicy, TransferSettings,
};
use crate::driver::error::{ConfigError, ConfigResult, DmaError, DmaResult, IoError, Result};
use crate::driver::interrupt::{Status, TransferEvent};
use crate::hal::channel::DmaChannel;
use crate::hal::registry::{ChannelRegistry, OwnerId};
use crate::internal::constants::{DRAIN_SPIN_LIMIT, MAX_CHANNELS};
use crate::internal::dma::DescriptorPool;
use crate::internal::dma::descriptor::Descriptor;
use crate::internal::dma::descriptor::bits::{control, encode_count};

/// Completion notification, invoked from interrupt context.
///
/// The callback must not block.
pub type Callback<'a> = &'a dyn Fn(Status);

impl StreamState {
    /// Polled status for this state
    pub const fn status(self) -> Status {
        match self {
            StreamState::Idle | StreamState::Ready | StreamState::Done => Status::Ok,
            StreamState::Busy => Status::Busy,
            StreamState::Timeout => Status::Timeout,
            StreamState::Error => Status::Error,
        }
    }
}

/// Scatter-gather transfer stream over one DMA channel.
pub struct DescriptorStream<'a, C: DmaChannel, const N: usize> {
    channel: C,
    registry: &'a ChannelRegistry,
    owner: OwnerId,
    pool: DescriptorPool<N>,
    config: StreamConfig,
    /// Control bits shared by every appended descriptor
    control: u32,
    state: StreamState,
    /// The registry holds the channel for this stream
    bound: bool,
    /// First slot linked after the controller stopped reading the chain
    stalled: Option<usize>,
    callback: Option<Callback<'a>>,
}

impl<'a, C: DmaChannel, const N: usize> DescriptorStream<'a, C, N> {
    /// Create an idle stream on `channel`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidChannel`] when the channel number is out of range
    /// - any error of [`TransferSettings::validate`] for `config.settings`
    pub fn new(
        channel: C,
        registry: &'a ChannelRegistry,
        config: StreamConfig,
    ) -> ConfigResult<Self> {
        if channel.number() >= MAX_CHANNELS {
            return Err(ConfigError::InvalidChannel);
        }
        config.settings.validate(C::FIFO_SIZE)?;

        Ok(Self {
            channel,
            registry,
            owner: registry.allocate_owner(),
            pool: DescriptorPool::new(),
            control: config.settings.control_template(),
            config,
            state: StreamState::Idle,
            bound: false,
            stalled: None,
            callback: None,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Descriptor pool capacity
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Current state
    #[inline(always)]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Polled status: `Ok`, `Busy`, `Timeout` or `Error`
    #[inline(always)]
    pub fn status(&self) -> Status {
        self.state.status()
    }

    /// Check if the stream currently owns its channel
    #[inline(always)]
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Physical channel number
    pub fn channel_number(&self) -> usize {
        self.channel.number()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replace the transfer settings used for subsequent appends.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::StreamActive`] while the channel is running
    /// - any error of [`TransferSettings::validate`]
    pub fn configure(&mut self, settings: TransferSettings) -> ConfigResult<()> {
        if self.bound {
            return Err(ConfigError::StreamActive);
        }
        settings.validate(C::FIFO_SIZE)?;

        self.config.settings = settings;
        self.control = settings.control_template();
        Ok(())
    }

    /// Install or remove the completion callback.
    ///
    /// Updates the completion interrupt of every queued descriptor. A
    /// one-shot chain that is already running keeps its current interrupt
    /// layout until the next [`enable`](Self::enable).
    pub fn set_callback(&mut self, callback: Option<Callback<'a>>) {
        self.callback = callback;
        if !self.bound || self.config.mode == ChainMode::Circular {
            self.apply_interrupt_flags();
        }
    }

    fn wants_interrupt(&self, is_last: bool) -> bool {
        if self.config.silent {
            is_last
        } else {
            match self.config.mode {
                ChainMode::OneShot => true,
                ChainMode::Circular => self.callback.is_some(),
            }
        }
    }

    fn apply_interrupt_flags(&self) {
        let queued = self.pool.queued();
        for (offset, desc) in self.pool.iter_queued().enumerate() {
            desc.set_interrupt(self.wants_interrupt(offset + 1 == queued));
        }
    }

    // =========================================================================
    // Descriptor Management
    // =========================================================================

    /// Queue one block transfer of `size` bytes.
    ///
    /// While the channel runs, the new descriptor is linked behind the live
    /// tail; circular chains keep pointing back to their first descriptor.
    /// Appending after `Done`, `Error` or `Timeout` discards the old chain.
    ///
    /// # Safety
    ///
    /// `source` must be readable and `destination` writable for `size` bytes
    /// (or one element for a fixed side) until the descriptor is retired or
    /// the stream is disabled.
    ///
    /// # Errors
    ///
    /// - [`DmaError::InvalidLength`] when `size` is 0 or not a multiple of the width
    /// - [`DmaError::Misaligned`] when an address is not width-aligned
    /// - [`DmaError::TransferTooLarge`] when the element count exceeds the channel maximum
    /// - [`DmaError::PoolFull`] when all descriptors are queued
    pub unsafe fn append(
        &mut self,
        destination: *mut u8,
        source: *const u8,
        size: usize,
    ) -> DmaResult<()> {
        let width = self.config.settings.width.bytes();
        if size == 0 || size % width != 0 {
            return Err(DmaError::InvalidLength);
        }
        let (destination, source) = (destination as usize, source as usize);
        if destination % width != 0 || source % width != 0 {
            return Err(DmaError::Misaligned);
        }
        let elements = size / width;
        if elements > C::MAX_TRANSFER as usize {
            return Err(DmaError::TransferTooLarge);
        }

        if !self.bound
            && matches!(
                self.state,
                StreamState::Done | StreamState::Error | StreamState::Timeout
            )
        {
            self.pool.reset();
            self.stalled = None;
        }

        let circular = self.config.mode == ChainMode::Circular;
        let mut ctrl = self.control | encode_count(elements as u32);
        if self.wants_interrupt(true) {
            ctrl |= control::INTERRUPT_ON_COMPLETE;
        }

        let previous = self.pool.queued().checked_sub(1);
        let slot = self.pool.tail_index();
        if self.pool.push(source, destination, ctrl, circular).is_none() {
            return Err(DmaError::PoolFull);
        }

        // The controller latched an empty link or already stopped, so it will
        // never fetch this descriptor on its own.
        if self.bound
            && !circular
            && self.stalled.is_none()
            && (!self.channel.is_active() || self.channel.next_pointer() == 0)
        {
            self.stalled = Some(slot);
        }

        // A running one-shot chain keeps the old tail armed so the stream
        // learns whether the controller followed the new link.
        if let Some(offset) = previous
            && self.config.silent
            && (!self.bound || circular)
        {
            self.pool.at_offset(offset).set_interrupt(false);
        }

        if !self.bound {
            self.state = StreamState::Ready;
        }
        Ok(())
    }

    /// Number of descriptors not yet retired.
    ///
    /// While the channel runs this subtracts the descriptors the controller
    /// has already passed, derived from its next pointer.
    pub fn queued(&self) -> usize {
        if self.bound {
            self.pool.queued() - self.executing_offset()
        } else {
            self.pool.queued()
        }
    }

    /// Offset from the pool head of the descriptor the controller executes.
    ///
    /// Equals the number of descriptors the controller can reach once it has
    /// stopped past the last of them. Descriptors from the stall point on are
    /// unreachable until the chain is restarted.
    fn executing_offset(&self) -> usize {
        let queued = self.pool.queued();
        if queued == 0 {
            return 0;
        }
        let reachable = self
            .stalled
            .map_or(queued, |slot| self.pool.offset_of(slot).min(queued));

        match self.pool.slot_of(self.channel.next_pointer()) {
            Some(next) => {
                let executing = match self.config.mode {
                    ChainMode::Circular if next == 0 => queued - 1,
                    ChainMode::Circular => next - 1,
                    ChainMode::OneShot => (next + N - 1) % N,
                };
                self.pool
                    .offset_of(executing)
                    .min(reachable.saturating_sub(1))
            }
            None if self.channel.is_active() => reachable.saturating_sub(1),
            None => reachable,
        }
    }

    fn executing_descriptor(&self) -> Option<&Descriptor> {
        let offset = self.executing_offset();
        (offset < self.pool.queued()).then(|| self.pool.at_offset(offset))
    }

    /// Bytes remaining in the executing descriptor.
    ///
    /// The controller's next pointer is read before and after the transfer
    /// count; the count is only trusted when both reads match the executing
    /// descriptor's link.
    ///
    /// # Errors
    ///
    /// [`DmaError::ResidueUnstable`] when the controller moved to another
    /// descriptor during the read. Retry.
    pub fn residue(&self) -> DmaResult<usize> {
        if !self.bound {
            return Ok(0);
        }
        let Some(current) = self.executing_descriptor() else {
            return Ok(0);
        };

        let expected = current.next();
        if self.channel.next_pointer() != expected {
            return Err(DmaError::ResidueUnstable);
        }
        let transfers = self.channel.transfer_count();
        if self.channel.next_pointer() != expected {
            return Err(DmaError::ResidueUnstable);
        }

        Ok(transfers as usize * current.element_bytes())
    }

    // =========================================================================
    // Channel Control
    // =========================================================================

    /// Bind the channel and start the chain at its head.
    ///
    /// # Errors
    ///
    /// - [`IoError::InvalidState`] when nothing is queued or the stream is running
    /// - [`DmaError::ChannelBusy`] when another stream owns the channel; the
    ///   stream enters the `Error` state
    pub fn enable(&mut self) -> Result<()> {
        if self.bound || self.pool.is_empty() {
            return Err(IoError::InvalidState.into());
        }

        if let Err(err) = self.registry.bind(self.channel.number(), self.owner) {
            self.state = StreamState::Error;
            return Err(err);
        }
        self.bound = true;
        self.stalled = None;

        self.pool.relink(self.config.mode == ChainMode::Circular);
        self.apply_interrupt_flags();

        #[cfg(feature = "log")]
        debug!(
            "DMA channel {} enabled with {} descriptors",
            self.channel.number(),
            self.pool.queued()
        );

        self.state = StreamState::Busy;
        self.channel
            .start(self.pool.head(), self.config.settings.priority);
        Ok(())
    }

    /// Halt the channel and release it. Idempotent.
    ///
    /// A running stream ends in the `Done` state; descriptors that did not
    /// execute stay counted in [`queued`](Self::queued) until the next append.
    pub fn disable(&mut self) {
        if !self.bound {
            return;
        }

        self.release_channel();
        if matches!(self.state, StreamState::Busy | StreamState::Timeout) {
            self.state = StreamState::Done;
        }

        #[cfg(feature = "log")]
        debug!("DMA channel {} disabled", self.channel.number());
    }

    /// Halt if running and forget every queued descriptor.
    pub fn clear(&mut self) {
        if self.bound {
            self.release_channel();
        }
        self.pool.reset();
        self.state = StreamState::Idle;
    }

    fn release_channel(&mut self) {
        self.channel.halt();
        self.registry.release(self.channel.number(), self.owner);
        self.bound = false;
        self.stalled = None;
    }

    // =========================================================================
    // Interrupt Path
    // =========================================================================

    /// Handle one channel event. Call from the channel's interrupt handler.
    ///
    /// Returns the resulting status, or `None` when the stream does not own
    /// the channel and the event was ignored. The callback, if any, receives
    /// the same status.
    pub fn on_interrupt(&mut self, event: TransferEvent) -> Option<Status> {
        if !self.bound {
            return None;
        }

        let oneshot = self.config.mode == ChainMode::OneShot;
        match event {
            TransferEvent::Progress => {
                if oneshot {
                    self.retire_passed();
                }
                self.state = StreamState::Busy;
            }
            TransferEvent::Complete => {
                if oneshot {
                    self.retire_passed();
                }
                if oneshot && !self.pool.is_empty() {
                    #[cfg(feature = "log")]
                    trace!(
                        "DMA channel {} underrun, restarting {} descriptors",
                        self.channel.number(),
                        self.pool.queued()
                    );
                    self.stalled = None;
                    self.channel
                        .start(self.pool.head(), self.config.settings.priority);
                    self.state = StreamState::Busy;
                } else {
                    self.release_channel();
                    self.state = StreamState::Done;
                }
            }
            TransferEvent::BusError => {
                #[cfg(feature = "log")]
                warn!("DMA channel {} bus error", self.channel.number());
                self.release_channel();
                self.state = StreamState::Error;
            }
            TransferEvent::Timeout => {
                #[cfg(feature = "log")]
                warn!("DMA channel {} request timeout", self.channel.number());
                if self.config.timeout_policy == TimeoutPolicy::Abort {
                    self.release_channel();
                } else {
                    self.drain_and_resume();
                }
                self.state = StreamState::Timeout;
            }
        }

        let status = self.status();
        if let Some(callback) = self.callback {
            callback(status);
        }
        Some(status)
    }

    /// Retire every descriptor the controller has moved past.
    ///
    /// Several completions may be folded into one interrupt, so the count
    /// comes from the controller position rather than from the event.
    fn retire_passed(&mut self) {
        let passed = self.executing_offset();
        self.pool.retire(passed);
    }

    fn drain_and_resume(&mut self) {
        self.channel.pause();

        let mut spins = 0u32;
        while self.channel.is_pending() {
            if spins >= DRAIN_SPIN_LIMIT {
                #[cfg(feature = "log")]
                warn!("DMA channel {} FIFO did not drain", self.channel.number());
                break;
            }
            spins += 1;
            core::hint::spin_loop();
        }

        self.channel.resume();
    }
}

impl<C: DmaChannel, const N: usize> Drop for DescriptorStream<'_, C, N> {
    fn drop(&mut self) {
        if self.bound {
            self.release_channel();
        }
    }
}

impl<C: DmaChannel, const N: usize> core::fmt::Debug for DescriptorStream<'_, C, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DescriptorStream")
            .field("channel", &self.channel.number())
            .field("capacity", &N)
            .field("head", &self.pool.head_index())
            .field("queued", &self.pool.queued())
            .field("state", &self.state)
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
