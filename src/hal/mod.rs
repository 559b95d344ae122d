//! Hardware Abstraction Layer
//!
//! This module connects descriptor streams to DMA hardware.
//!
//! # Modules
//!
//! - [`channel`]: The [`DmaChannel`] trait implemented per DMA engine
//! - [`mmio`]: Register-backed channel for memory-mapped controllers
//! - [`registry`]: Channel ownership arbitration and interrupt dispatch
//!
//! # Delay Integration
//!
//! Bounded waits use `embedded_hal::delay::DelayNs` directly.
//! Pass any delay implementation from your HAL.

pub mod channel;
pub mod mmio;
pub mod registry;

// Re-export commonly used types
pub use channel::DmaChannel;
pub use mmio::MmioChannel;
pub use registry::{ChannelHandler, ChannelRegistry, OwnerId, REGISTRY};
