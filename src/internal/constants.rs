//! Centralized Constants
//!
//! This module provides a single source of truth for the magic numbers and
//! default configuration values used throughout the crate.
//!
//! # Organization
//!
//! Constants are grouped by category:
//! - **Queue sizes**: RingQueue capacity limits and defaults
//! - **Channels**: Registry size and descriptor limits
//! - **Timing**: Spin and polling parameters for blocking waits
//!
//! # Note
//!
//! Descriptor and register bit definitions remain in their respective modules
//! (`internal/descriptor/bits.rs`, `internal/register/channel.rs`) as they are
//! specific to those hardware blocks.

// =============================================================================
// Queue Sizes
// =============================================================================

/// Capacity substituted when a queue is created with a requested capacity of 0
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Largest supported queue capacity (cursors fit in 16 bits)
pub const MAX_QUEUE_CAPACITY: usize = u16::MAX as usize;

// =============================================================================
// Channels and Descriptors
// =============================================================================

/// Number of physical channel slots tracked by a [`ChannelRegistry`]
///
/// [`ChannelRegistry`]: crate::hal::registry::ChannelRegistry
pub const MAX_CHANNELS: usize = 32;

/// Largest element count encodable in a single descriptor (16-bit count field)
pub const MAX_DESCRIPTOR_TRANSFERS: u32 = 1 << 16;

/// Default staging FIFO depth in bytes for register-backed channels
pub const DEFAULT_FIFO_SIZE: usize = 16;

// =============================================================================
// Timing
// =============================================================================

/// Polling interval used by bounded waits, in microseconds
pub const WAIT_POLL_INTERVAL_US: u32 = 10;

/// Default bound for [`SharedStream::wait_timeout`], in microseconds
///
/// [`SharedStream::wait_timeout`]: crate::sync::SharedStream::wait_timeout
pub const DEFAULT_WAIT_TIMEOUT_US: u32 = 100_000;

/// Maximum spin iterations while draining a paused channel
pub const DRAIN_SPIN_LIMIT: u32 = 10_000;
