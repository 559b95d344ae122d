//! Channel Binding Registry
//!
//! Physical DMA channels are a process-wide resource. The [`ChannelRegistry`]
//! records which stream owns each channel and which handler receives its
//! interrupts.
//!
//! # Binding
//!
//! A stream binds its channel in [`enable`](crate::driver::stream::DescriptorStream::enable)
//! and releases it when the transfer completes, fails or is disabled. Binding
//! is a compare-and-swap performed inside a critical section: it succeeds only
//! when the slot is free or already held by the same owner.
//!
//! # Dispatch
//!
//! The interrupt vector of a channel calls [`ChannelRegistry::dispatch`], which
//! forwards the decoded [`TransferEvent`] to the registered [`ChannelHandler`].
//!
//! ```ignore
//! static STREAM: SharedStream<MmioChannel, 8> = SharedStream::new();
//!
//! REGISTRY.register_handler(0, &STREAM)?;
//!
//! #[interrupt]
//! fn DMA_CH0() {
//!     let status = unsafe { MmioChannel::new(DMA_CH0_BASE, 0) }.take_interrupt_status();
//!     if let Some(event) = status.event() {
//!         REGISTRY.dispatch(0, event);
//!     }
//! }
//! ```

#[cfg(feature = "log")]
use log::warn;

use crate::driver::error::{ConfigError, DmaError, Result};
use crate::driver::interrupt::TransferEvent;
use crate::internal::constants::MAX_CHANNELS;
use crate::sync::CriticalSectionCell;

/// Identity of a channel owner, handed out by [`ChannelRegistry::allocate_owner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OwnerId(u32);

impl OwnerId {
    /// Raw identifier value
    #[inline(always)]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Receiver of channel interrupt events.
pub trait ChannelHandler: Sync {
    /// Handle one event; called from interrupt context.
    fn on_event(&self, event: TransferEvent);
}

/// Channel ownership table and interrupt dispatch table.
pub struct ChannelRegistry {
    owners: CriticalSectionCell<[Option<OwnerId>; MAX_CHANNELS]>,
    handlers: CriticalSectionCell<[Option<&'static dyn ChannelHandler>; MAX_CHANNELS]>,
    next_owner: CriticalSectionCell<u32>,
}

/// Process-wide registry shared by all streams of the application
pub static REGISTRY: ChannelRegistry = ChannelRegistry::new();

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    /// Create an empty registry (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            owners: CriticalSectionCell::new([None; MAX_CHANNELS]),
            handlers: CriticalSectionCell::new([None; MAX_CHANNELS]),
            next_owner: CriticalSectionCell::new(0),
        }
    }

    /// Hand out a fresh owner identity.
    pub fn allocate_owner(&self) -> OwnerId {
        self.next_owner.with(|next| {
            let id = OwnerId(*next);
            *next = next.wrapping_add(1);
            id
        })
    }

    /// Claim `channel` for `owner`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidChannel`] when `channel` is out of range
    /// - [`DmaError::ChannelBusy`] when another owner holds the channel
    pub fn bind(&self, channel: usize, owner: OwnerId) -> Result<()> {
        if channel >= MAX_CHANNELS {
            return Err(ConfigError::InvalidChannel.into());
        }

        let bound = self.owners.with(|owners| match owners[channel] {
            None => {
                owners[channel] = Some(owner);
                true
            }
            Some(current) => current == owner,
        });

        if bound {
            Ok(())
        } else {
            #[cfg(feature = "log")]
            warn!("DMA channel {channel} already bound");
            Err(DmaError::ChannelBusy.into())
        }
    }

    /// Release `channel` if `owner` holds it. Returns whether it was released.
    pub fn release(&self, channel: usize, owner: OwnerId) -> bool {
        if channel >= MAX_CHANNELS {
            return false;
        }
        self.owners.with(|owners| {
            if owners[channel] == Some(owner) {
                owners[channel] = None;
                true
            } else {
                false
            }
        })
    }

    /// Current owner of `channel`
    pub fn owner(&self, channel: usize) -> Option<OwnerId> {
        if channel >= MAX_CHANNELS {
            return None;
        }
        self.owners.with_ref(|owners| owners[channel])
    }

    /// Check if `channel` is bound to any owner
    pub fn is_bound(&self, channel: usize) -> bool {
        self.owner(channel).is_some()
    }

    /// Route interrupts of `channel` to `handler`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidChannel`] when `channel` is out of range.
    pub fn register_handler(
        &self,
        channel: usize,
        handler: &'static dyn ChannelHandler,
    ) -> Result<()> {
        if channel >= MAX_CHANNELS {
            return Err(ConfigError::InvalidChannel.into());
        }
        self.handlers.with(|handlers| handlers[channel] = Some(handler));
        Ok(())
    }

    /// Remove the handler of `channel`.
    pub fn unregister_handler(&self, channel: usize) {
        if channel < MAX_CHANNELS {
            self.handlers.with(|handlers| handlers[channel] = None);
        }
    }

    /// Forward `event` to the handler of `channel`.
    ///
    /// The handler runs outside the registry's critical section. Returns
    /// `false` when no handler is registered.
    pub fn dispatch(&self, channel: usize, event: TransferEvent) -> bool {
        if channel >= MAX_CHANNELS {
            return false;
        }
        match self.handlers.with_ref(|handlers| handlers[channel]) {
            Some(handler) => {
                handler.on_event(event);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
