//! DMA Channel Interface
//!
//! [`DmaChannel`] is the seam between a
//! [`DescriptorStream`](crate::driver::stream::DescriptorStream) and the
//! controller that walks its descriptors. One implementation exists per DMA
//! engine; [`MmioChannel`](super::mmio::MmioChannel) covers memory-mapped
//! scatter-gather controllers.
//!
//! # Register Semantics
//!
//! An implementation exposes the live state of one physical channel:
//!
//! - the *next pointer*: address of the descriptor the controller fetches
//!   after the executing one, or 0 when the executing descriptor ends the chain
//! - the *transfer count*: elements still to move in the executing descriptor
//! - the *active* flag: the channel is moving data
//! - the *pending* flag: the staging FIFO still holds data

use crate::driver::config::Priority;
use crate::internal::dma::Descriptor;

/// One physical DMA channel.
pub trait DmaChannel {
    /// Staging FIFO depth in bytes
    const FIFO_SIZE: usize;

    /// Largest element count of a single descriptor
    const MAX_TRANSFER: u32;

    /// Physical channel number, used for registry arbitration
    fn number(&self) -> usize;

    /// Start walking the chain at `head`.
    fn start(&mut self, head: &Descriptor, priority: Priority);

    /// Stop the channel immediately, discarding the rest of the chain.
    fn halt(&mut self);

    /// Check if the channel is moving data
    fn is_active(&self) -> bool;

    /// Address of the next descriptor to fetch, 0 at the end of the chain
    fn next_pointer(&self) -> usize;

    /// Elements remaining in the executing descriptor
    fn transfer_count(&self) -> u32;

    /// Stop issuing new bus requests without losing position.
    fn pause(&mut self);

    /// Resume after [`pause`](Self::pause).
    fn resume(&mut self);

    /// Check if the staging FIFO still holds data
    fn is_pending(&self) -> bool;
}
