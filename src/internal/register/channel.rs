//! Scatter-gather channel register window
//!
//! Offsets are relative to the base address of one channel's register block.
//! The controller fetches descriptors on its own once `NEXT` holds the head
//! of a chain and `CONFIG.ENABLE` is set.

/// Address of the next descriptor to fetch (0 = chain ends after current)
pub const NEXT_OFFSET: usize = 0x00;
/// Elements remaining in the executing descriptor
pub const COUNT_OFFSET: usize = 0x04;
/// Channel configuration
pub const CONFIG_OFFSET: usize = 0x08;
/// Channel status and interrupt flags
pub const STATUS_OFFSET: usize = 0x0C;

/// Size of one channel register block
pub const BLOCK_SIZE: usize = 0x10;

/// CONFIG register bits
pub mod config {
    /// Channel enable; cleared by hardware when the chain ends
    pub const ENABLE: u32 = 1 << 0;
    /// Fixed (high) arbitration priority
    pub const FIXED_PRIORITY: u32 = 1 << 1;
    /// Suspend fetching new bursts
    pub const PAUSE: u32 = 1 << 2;
}

/// STATUS register bits
pub mod status {
    /// Channel is moving data
    pub const ACTIVE: u32 = 1 << 0;
    /// Staging FIFO still holds data
    pub const FIFO_PENDING: u32 = 1 << 1;
    /// A descriptor with interrupt-on-completion finished (write 1 to clear)
    pub const DONE: u32 = 1 << 2;
    /// Bus error (write 1 to clear)
    pub const ERROR: u32 = 1 << 3;
    /// Peripheral request timeout (write 1 to clear)
    pub const TIMEOUT: u32 = 1 << 4;

    /// All write-1-to-clear interrupt flags
    pub const IRQ_MASK: u32 = DONE | ERROR | TIMEOUT;
}
