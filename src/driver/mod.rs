//! Core components for DMA descriptor streams.
//!
//! This module contains the stream itself and the types around it:
//!
//! - [`config`] - Transfer settings and stream configuration builders
//! - [`error`] - Error types and result aliases
//! - [`interrupt`] - Channel status decoding and transfer events
//! - [`stream`] - The [`DescriptorStream`] state machine
//! - [`pump`] - Queue-backed transmit and receive pumps
//!
//! # Example
//!
//! ```ignore
//! use ph_dma_stream::driver::{StreamConfig, TransferSettings, Width};
//!
//! let config = StreamConfig::new()
//!     .with_settings(TransferSettings::memory_to_peripheral(Width::Byte))
//!     .with_silent(true);
//! ```

// Submodules
pub mod config;
pub mod error;
pub mod interrupt;
pub mod pump;
pub mod stream;

// Re-exports for convenience
pub use config::{
    Burst, ChainMode, Priority, StreamConfig, StreamState, TimeoutPolicy, TransferSettings, Width,
};
pub use error::{ConfigError, ConfigResult, DmaError, DmaResult, Error, IoError, IoResult, Result};
pub use interrupt::{InterruptStatus, Status, TransferEvent};
pub use pump::{Notify, RxPump, TxPump};
pub use stream::{Callback, DescriptorStream};
