//! Synchronization and Concurrency Support
//!
//! This module provides synchronization primitives and ISR-safe wrappers
//! for streams and queues. It includes:
//!
//! - **Primitives** (`primitives`): Low-level synchronization types
//!   - [`CriticalSectionCell`] - ISR-safe interior mutability
//!   - [`AtomicWaker`] - Async waker storage for interrupts
//!
//! - **Shared Wrappers** (`shared`): ISR-safe stream and queue slots
//!   - [`SharedStream`] - Critical-section protected descriptor stream with
//!     blocking, bounded and async waits
//!   - [`SharedQueue`] - Critical-section protected byte queue
//!
//! - **Async Support** (`asynch`): The [`WaitFuture`] behind
//!   [`SharedStream::wait`]
//!
//! # Feature Flags
//!
//! - `async`: Enables [`AtomicWaker`] and the `asynch` module
//!
//! # Example
//!
//! ```ignore
//! use ph_dma_stream::sync::{SharedQueue, SharedStream};
//!
//! static RX: SharedQueue<[u8; 128]> = SharedQueue::new();
//! static STREAM: SharedStream<MmioChannel, 4> = SharedStream::new();
//!
//! #[interrupt]
//! fn DMA_CH2() {
//!     if let Some(event) = CHANNEL2.take_interrupt_status().event() {
//!         STREAM.on_event(event);
//!     }
//! }
//! ```

mod primitives;

#[cfg(feature = "async")]
pub use primitives::AtomicWaker;
pub use primitives::CriticalSectionCell;

mod shared;

pub use shared::{SharedQueue, SharedStream};

#[cfg(feature = "async")]
pub mod asynch;

#[cfg(feature = "async")]
pub use asynch::WaitFuture;
