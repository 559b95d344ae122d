//! Configuration types for DMA descriptor streams

use crate::driver::error::{ConfigError, ConfigResult};
use crate::internal::dma::descriptor::bits::control;

/// Size of one transfer element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Width {
    /// 8-bit elements
    #[default]
    Byte = 1,
    /// 16-bit elements
    HalfWord = 2,
    /// 32-bit elements
    Word = 4,
}

impl Width {
    /// Element size in bytes
    #[inline(always)]
    #[must_use]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Encoding used in the descriptor control word
    #[inline(always)]
    #[must_use]
    pub const fn to_bits(self) -> u32 {
        (self as u32).trailing_zeros()
    }
}

/// Elements moved per bus request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Burst {
    /// One element per request
    #[default]
    Single = 1,
    /// 4 element burst
    Burst4 = 4,
    /// 8 element burst
    Burst8 = 8,
    /// 16 element burst
    Burst16 = 16,
}

impl Burst {
    /// Elements per burst
    #[inline(always)]
    #[must_use]
    pub const fn elements(self) -> usize {
        self as usize
    }

    /// Encoding used in the descriptor control word
    #[inline(always)]
    #[must_use]
    pub const fn to_bits(self) -> u32 {
        (self as u32).trailing_zeros()
    }
}

/// Channel arbitration priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Priority {
    /// Round-robin with other channels
    #[default]
    Normal,
    /// Fixed high priority
    High,
}

/// How the descriptor chain ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChainMode {
    /// Last descriptor terminates the chain; completed slots are recycled
    #[default]
    OneShot,
    /// Last descriptor points back to the first; the chain never ends
    Circular,
}

/// Reaction to a peripheral request timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutPolicy {
    /// Pause, drain the FIFO and resume; the chain stays alive
    #[default]
    Restart,
    /// Halt the channel and release it
    Abort,
}

/// Per-chain transfer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferSettings {
    /// Element width (same on both sides)
    pub width: Width,
    /// Burst size
    pub burst: Burst,
    /// Increment the source address after each element
    pub source_increment: bool,
    /// Increment the destination address after each element
    pub destination_increment: bool,
    /// Arbitration priority
    pub priority: Priority,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferSettings {
    /// Memory-to-memory byte copy with single transfers
    #[must_use]
    pub const fn new() -> Self {
        Self {
            width: Width::Byte,
            burst: Burst::Single,
            source_increment: true,
            destination_increment: true,
            priority: Priority::Normal,
        }
    }

    /// Memory to a fixed peripheral data register
    #[must_use]
    pub const fn memory_to_peripheral(width: Width) -> Self {
        Self::new().with_width(width).with_destination_increment(false)
    }

    /// Fixed peripheral data register to memory
    #[must_use]
    pub const fn peripheral_to_memory(width: Width) -> Self {
        Self::new().with_width(width).with_source_increment(false)
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the element width
    #[must_use]
    pub const fn with_width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    /// Set the burst size
    #[must_use]
    pub const fn with_burst(mut self, burst: Burst) -> Self {
        self.burst = burst;
        self
    }

    /// Enable or disable source address increment
    #[must_use]
    pub const fn with_source_increment(mut self, enabled: bool) -> Self {
        self.source_increment = enabled;
        self
    }

    /// Enable or disable destination address increment
    #[must_use]
    pub const fn with_destination_increment(mut self, enabled: bool) -> Self {
        self.destination_increment = enabled;
        self
    }

    /// Set the arbitration priority
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Check the settings against a channel FIFO of `fifo_size` bytes.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::BurstTooLarge`] when one burst overflows the FIFO
    /// - [`ConfigError::FixedAddressBurst`] when a fixed side uses bursts
    pub const fn validate(&self, fifo_size: usize) -> ConfigResult<()> {
        if self.burst.elements() * self.width.bytes() > fifo_size {
            return Err(ConfigError::BurstTooLarge);
        }
        let fixed = !self.source_increment || !self.destination_increment;
        if fixed && !matches!(self.burst, Burst::Single) {
            return Err(ConfigError::FixedAddressBurst);
        }
        Ok(())
    }

    /// Control word bits shared by every descriptor of the chain
    pub(crate) const fn control_template(&self) -> u32 {
        let mut bits = (self.width.to_bits() << control::WIDTH_SHIFT)
            | (self.burst.to_bits() << control::BURST_SHIFT);
        if !self.source_increment {
            bits |= control::SRC_FIXED;
        }
        if !self.destination_increment {
            bits |= control::DST_FIXED;
        }
        bits
    }
}

/// Complete stream configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamConfig {
    /// Chain termination mode
    pub mode: ChainMode,
    /// Interrupt only on the final descriptor of the chain
    pub silent: bool,
    /// Reaction to peripheral timeouts
    pub timeout_policy: TimeoutPolicy,
    /// Initial transfer settings
    pub settings: TransferSettings,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamConfig {
    /// One-shot chain, interrupt per descriptor, restart on timeout
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: ChainMode::OneShot,
            silent: false,
            timeout_policy: TimeoutPolicy::Restart,
            settings: TransferSettings::new(),
        }
    }

    /// Circular chain with the given settings
    #[must_use]
    pub const fn circular(settings: TransferSettings) -> Self {
        Self::new()
            .with_mode(ChainMode::Circular)
            .with_settings(settings)
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the chain mode
    #[must_use]
    pub const fn with_mode(mut self, mode: ChainMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable silent mode
    #[must_use]
    pub const fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Set the timeout policy
    #[must_use]
    pub const fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    /// Set the transfer settings
    #[must_use]
    pub const fn with_settings(mut self, settings: TransferSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Descriptor stream state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    /// Nothing queued
    #[default]
    Idle,
    /// Descriptors queued, channel not started
    Ready,
    /// Channel running
    Busy,
    /// Chain completed or stream disabled
    Done,
    /// Bus error or channel contention
    Error,
    /// Peripheral request timed out
    Timeout,
}

// =============================================================================
// Unit Tests
// =============================================================================
