//! Channel interrupt decoding and transfer status.
//!
//! This module provides the [`InterruptStatus`] structure for parsing a
//! channel status register, the [`TransferEvent`] a stream consumes from its
//! interrupt handler, and the polled [`Status`] of a stream.

use crate::driver::error::{DmaError, IoError, Result};
use crate::internal::register::channel::status;

// =============================================================================
// Transfer Events
// =============================================================================

/// Event delivered to a stream from its channel interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferEvent {
    /// A descriptor finished and the channel moved on to the next one
    Progress,
    /// A descriptor finished and the channel stopped
    Complete,
    /// The controller reported a bus error
    BusError,
    /// The peripheral stopped issuing requests
    Timeout,
}

// =============================================================================
// Stream Status
// =============================================================================

/// Polled stream status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// No transfer in flight and no error
    Ok,
    /// Transfer in progress
    Busy,
    /// Peripheral request timeout
    Timeout,
    /// Bus error or channel contention
    Error,
}

impl Status {
    /// Check if the stream still owns a running transfer
    #[inline]
    pub const fn is_busy(self) -> bool {
        matches!(self, Status::Busy)
    }

    /// Map a terminal status onto the crate error type.
    ///
    /// `Busy` maps to `Ok`; callers that need completion poll until it changes.
    pub const fn into_result(self) -> Result<()> {
        match self {
            Status::Ok | Status::Busy => Ok(()),
            Status::Timeout => Err(crate::driver::error::Error::Io(IoError::Timeout)),
            Status::Error => Err(crate::driver::error::Error::Dma(DmaError::BusError)),
        }
    }
}

// =============================================================================
// Interrupt Status
// =============================================================================

/// Flags parsed from a channel status register.
///
/// # Example
///
/// ```ignore
/// let status = InterruptStatus::from_raw(raw);
/// if let Some(event) = status.event() {
///     stream.on_interrupt(event);
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptStatus {
    /// Channel is still moving data
    pub active: bool,
    /// Staging FIFO still holds data
    pub fifo_pending: bool,
    /// Descriptor with interrupt-on-completion finished
    pub done: bool,
    /// Bus error
    pub bus_error: bool,
    /// Peripheral request timeout
    pub timeout: bool,
}

impl InterruptStatus {
    /// Create from raw channel status register value
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self {
            active: (raw & status::ACTIVE) != 0,
            fifo_pending: (raw & status::FIFO_PENDING) != 0,
            done: (raw & status::DONE) != 0,
            bus_error: (raw & status::ERROR) != 0,
            timeout: (raw & status::TIMEOUT) != 0,
        }
    }

    /// Interrupt flags to write back for clearing (write-1-to-clear)
    #[inline]
    pub fn to_raw(&self) -> u32 {
        let mut val = 0u32;
        if self.done {
            val |= status::DONE;
        }
        if self.bus_error {
            val |= status::ERROR;
        }
        if self.timeout {
            val |= status::TIMEOUT;
        }
        val
    }

    /// Check if any interrupt flag is set
    #[inline]
    pub fn any(&self) -> bool {
        self.done || self.bus_error || self.timeout
    }

    /// Event to deliver to the stream, most severe first
    pub fn event(&self) -> Option<TransferEvent> {
        if self.bus_error {
            Some(TransferEvent::BusError)
        } else if self.timeout {
            Some(TransferEvent::Timeout)
        } else if self.done && self.active {
            Some(TransferEvent::Progress)
        } else if self.done {
            Some(TransferEvent::Complete)
        } else {
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
