//! DMA Streams and Byte Queues
//!
//! A `no_std` Rust implementation of two building blocks for peripheral data
//! movement on microcontrollers: an ISR-safe circular byte queue and a
//! scatter-gather DMA descriptor stream.
//!
//! # Architecture
//!
//! The crate is organized into four layers:
//!
//! 1. **Queue Layer** ([`queue`]): [`RingQueue`] with inline, arena and heap
//!    storage plus zero-copy deferred access
//! 2. **Stream Layer** ([`driver`]): [`DescriptorStream`] chains a fixed pool
//!    of descriptors into an unbounded transfer stream, and the
//!    [`TxPump`]/[`RxPump`] glue moves queue contents through it
//! 3. **HAL Layer** ([`hal`]): the [`DmaChannel`] trait, a register-backed
//!    [`MmioChannel`] and the [`ChannelRegistry`] that arbitrates channel
//!    ownership and routes interrupts
//! 4. **Sync Layer** ([`sync`]): critical-section slots for sharing streams
//!    and queues with interrupt handlers, with blocking, bounded and async
//!    waits
//!
//! # Features
//!
//! - `watermark` (default): High-water mark and drop counters on queues
//! - `alloc`: Heap-backed queues via [`HeapQueue`]
//! - `async`: Async/await support with wakers
//! - `log`: Warnings on bus errors, timeouts and channel contention
//! - `defmt`: Enable defmt formatting for error and status types
//!
//! # Example
//!
//! ```ignore
//! use ph_dma_stream::{DescriptorStream, MmioChannel, REGISTRY, SharedStream, StreamConfig};
//!
//! static STREAM: SharedStream<MmioChannel, 8> = SharedStream::new();
//!
//! let channel = unsafe { MmioChannel::new(DMA_BASE + 0x40, 4) };
//! let mut stream = DescriptorStream::new(channel, &REGISTRY, StreamConfig::new())?;
//! unsafe {
//!     stream.append(dst_a.as_mut_ptr(), src_a.as_ptr(), src_a.len())?;
//!     stream.append(dst_b.as_mut_ptr(), src_b.as_ptr(), src_b.len())?;
//! }
//!
//! STREAM.install(stream);
//! REGISTRY.register_handler(4, &STREAM)?;
//! STREAM.with(|s| s.enable()).unwrap()?;
//! STREAM.wait_timeout(&mut delay, 10_000)?;
//! ```
//!
//! # Memory Requirements
//!
//! A stream with `N` descriptors carries `N * 4` machine words of descriptor
//! storage inline. Descriptors, queues and staging buffers handed to a
//! controller must live in DMA-capable memory.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here and in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements,
    clippy::let_underscore_future
)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(test)]
extern crate std;

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod hal;
pub mod queue;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::{
    Burst, ChainMode, Priority, StreamConfig, StreamState, TimeoutPolicy, TransferSettings, Width,
};
pub use driver::error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, IoError, IoResult, Result,
};
pub use driver::interrupt::{InterruptStatus, Status, TransferEvent};
pub use driver::pump::{Notify, RxPump, TxPump};
pub use driver::stream::{Callback, DescriptorStream};
pub use hal::{ChannelHandler, ChannelRegistry, DmaChannel, MmioChannel, OwnerId, REGISTRY};
pub use internal::dma::Descriptor;
#[cfg(feature = "alloc")]
pub use queue::HeapQueue;
pub use queue::{ArenaQueue, QueueStorage, RingQueue, StaticQueue};
pub use sync::{SharedQueue, SharedStream};

#[cfg(feature = "async")]
pub use sync::{AtomicWaker, WaitFuture};

/// Low-level register accessors for advanced use.
///
/// These are intentionally separated from the primary facade. Most users should
/// prefer [`MmioChannel`] instead of touching channel registers directly.
///
/// # Safety
///
/// Direct register access bypasses stream invariants. Use only if you fully
/// understand the controller and accept responsibility for correct sequencing
/// and synchronization.
pub mod unsafe_registers {
    pub use crate::internal::register::channel;
    pub use crate::internal::register::{clear_bits, modify_reg, read_reg, set_bits, write_reg};
}

/// Descriptor control word layout.
///
/// Useful when implementing [`DmaChannel`] for another controller that
/// consumes the same descriptor records.
pub mod descriptor_bits {
    pub use crate::internal::dma::descriptor::bits::{control, decode_count, encode_count};
}

/// Shared crate constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on queue, stream and channel types.
pub mod constants {
    pub use crate::internal::constants::{
        DEFAULT_FIFO_SIZE,
        DEFAULT_QUEUE_CAPACITY,
        DEFAULT_WAIT_TIMEOUT_US,
        DRAIN_SPIN_LIMIT,
        MAX_CHANNELS,
        MAX_DESCRIPTOR_TRANSFERS,
        MAX_QUEUE_CAPACITY,
        WAIT_POLL_INTERVAL_US,
    };
}

// =============================================================================
// Macro Helpers
// =============================================================================

/// Declare a static, ISR-safe descriptor stream slot.
///
/// This macro expands to a [`SharedStream`] static with `$n` descriptors
/// (default 8) for channel type `$channel`.
///
/// # Examples
///
/// ```ignore
/// ph_dma_stream::dma_stream_static!(UART_TX, MmioChannel);
///
/// UART_TX.install(stream);
/// REGISTRY.register_handler(3, &UART_TX)?;
/// ```
#[macro_export]
macro_rules! dma_stream_static {
    ($name:ident, $channel:ty) => {
        $crate::dma_stream_static!($name, $channel, 8);
    };
    ($name:ident, $channel:ty, $n:expr) => {
        static $name: $crate::sync::SharedStream<$channel, $n> = $crate::sync::SharedStream::new();
    };
}

/// Declare a static, ISR-safe byte queue with `$n` bytes of inline storage.
///
/// # Examples
///
/// ```ignore
/// ph_dma_stream::byte_queue_static!(RX_BYTES, 256);
///
/// RX_BYTES.push_byte(byte);
/// ```
#[macro_export]
macro_rules! byte_queue_static {
    ($name:ident, $n:expr) => {
        static $name: $crate::sync::SharedQueue<[u8; $n]> = $crate::sync::SharedQueue::new();
    };
}
