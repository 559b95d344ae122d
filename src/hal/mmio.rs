//! Memory-mapped scatter-gather channel
//!
//! [`MmioChannel`] drives one channel of a descriptor-fetching DMA controller
//! through the register window described in
//! `internal::register::channel`. The integrator supplies the base address of
//! the channel's register block.
//!
//! Descriptor addresses are programmed as 32-bit values; the controller must
//! be able to reach the descriptor pool at those addresses.

use crate::driver::config::Priority;
use crate::driver::interrupt::InterruptStatus;
use crate::hal::channel::DmaChannel;
use crate::internal::constants::{DEFAULT_FIFO_SIZE, MAX_DESCRIPTOR_TRANSFERS};
use crate::internal::dma::Descriptor;
use crate::internal::register::channel::{
    COUNT_OFFSET, CONFIG_OFFSET, NEXT_OFFSET, STATUS_OFFSET, config, status,
};
use crate::internal::register::{clear_bits, read_reg, set_bits, write_reg};

/// Register-backed DMA channel.
#[derive(Debug)]
pub struct MmioChannel {
    /// Base address of the channel register block
    base: usize,
    /// Physical channel number
    number: usize,
}

impl MmioChannel {
    /// Create a channel handle over the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a channel register block of this layout,
    /// and no other handle may drive the same channel concurrently outside of
    /// interrupt status handling.
    pub const unsafe fn new(base: usize, number: usize) -> Self {
        Self { base, number }
    }

    /// Base address of the register block
    #[inline(always)]
    pub fn base(&self) -> usize {
        self.base
    }

    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: base validity is guaranteed by the constructor contract
        unsafe { read_reg(self.base + offset) }
    }

    #[inline(always)]
    fn write(&mut self, offset: usize, value: u32) {
        // SAFETY: base validity is guaranteed by the constructor contract
        unsafe { write_reg(self.base + offset, value) }
    }

    /// Read the channel status without clearing anything
    pub fn interrupt_status(&self) -> InterruptStatus {
        InterruptStatus::from_raw(self.read(STATUS_OFFSET))
    }

    /// Read the channel status and clear the interrupt flags it reports.
    pub fn take_interrupt_status(&mut self) -> InterruptStatus {
        let status = self.interrupt_status();
        if status.any() {
            self.write(STATUS_OFFSET, status.to_raw());
        }
        status
    }
}

impl DmaChannel for MmioChannel {
    const FIFO_SIZE: usize = DEFAULT_FIFO_SIZE;
    const MAX_TRANSFER: u32 = MAX_DESCRIPTOR_TRANSFERS;

    fn number(&self) -> usize {
        self.number
    }

    fn start(&mut self, head: &Descriptor, priority: Priority) {
        let mut cfg = config::ENABLE;
        if priority == Priority::High {
            cfg |= config::FIXED_PRIORITY;
        }

        self.write(STATUS_OFFSET, status::IRQ_MASK);
        self.write(NEXT_OFFSET, head.addr() as u32);
        self.write(CONFIG_OFFSET, cfg);
    }

    fn halt(&mut self) {
        // SAFETY: base validity is guaranteed by the constructor contract
        unsafe { clear_bits(self.base + CONFIG_OFFSET, config::ENABLE | config::PAUSE) }
    }

    fn is_active(&self) -> bool {
        (self.read(STATUS_OFFSET) & status::ACTIVE) != 0
    }

    fn next_pointer(&self) -> usize {
        self.read(NEXT_OFFSET) as usize
    }

    fn transfer_count(&self) -> u32 {
        self.read(COUNT_OFFSET)
    }

    fn pause(&mut self) {
        // SAFETY: base validity is guaranteed by the constructor contract
        unsafe { set_bits(self.base + CONFIG_OFFSET, config::PAUSE) }
    }

    fn resume(&mut self) {
        // SAFETY: base validity is guaranteed by the constructor contract
        unsafe { clear_bits(self.base + CONFIG_OFFSET, config::PAUSE) }
    }

    fn is_pending(&self) -> bool {
        (self.read(STATUS_OFFSET) & status::FIFO_PENDING) != 0
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::interrupt::TransferEvent;
    use crate::internal::register::channel::BLOCK_SIZE;

    /// RAM stand-in for one channel register block
    #[repr(C, align(4))]
    struct FakeWindow {
        regs: [u32; BLOCK_SIZE / 4],
    }

    impl FakeWindow {
        fn new() -> Self {
            Self {
                regs: [0; BLOCK_SIZE / 4],
            }
        }

        fn channel(&mut self, number: usize) -> MmioChannel {
            // SAFETY: the window outlives every channel built in these tests
            unsafe { MmioChannel::new(self.regs.as_mut_ptr() as usize, number) }
        }

        fn reg(&self, offset: usize) -> u32 {
            // SAFETY: offset is within the window
            unsafe { read_reg(self.regs.as_ptr() as usize + offset) }
        }

        fn set_reg(&mut self, offset: usize, value: u32) {
            // SAFETY: offset is within the window
            unsafe { write_reg(self.regs.as_mut_ptr() as usize + offset, value) }
        }
    }

    #[test]
    fn start_programs_head_and_enables() {
        let mut window = FakeWindow::new();
        let mut channel = window.channel(2);
        let head = Descriptor::new();

        channel.start(&head, Priority::Normal);

        assert_eq!(window.reg(NEXT_OFFSET), head.addr() as u32);
        assert_eq!(window.reg(CONFIG_OFFSET), config::ENABLE);
        assert_eq!(channel.number(), 2);
    }

    #[test]
    fn start_with_high_priority_sets_fixed_priority() {
        let mut window = FakeWindow::new();
        let mut channel = window.channel(0);

        channel.start(&Descriptor::new(), Priority::High);
        assert_eq!(
            window.reg(CONFIG_OFFSET),
            config::ENABLE | config::FIXED_PRIORITY
        );
    }

    #[test]
    fn pause_resume_and_halt_touch_config_bits() {
        let mut window = FakeWindow::new();
        window.set_reg(CONFIG_OFFSET, config::ENABLE);
        let mut channel = window.channel(0);

        channel.pause();
        assert_eq!(window.reg(CONFIG_OFFSET), config::ENABLE | config::PAUSE);
        channel.resume();
        assert_eq!(window.reg(CONFIG_OFFSET), config::ENABLE);

        channel.pause();
        channel.halt();
        assert_eq!(window.reg(CONFIG_OFFSET), 0);
    }

    #[test]
    fn live_state_reads_registers() {
        let mut window = FakeWindow::new();
        window.set_reg(NEXT_OFFSET, 0x2000_0040);
        window.set_reg(COUNT_OFFSET, 17);
        window.set_reg(STATUS_OFFSET, status::ACTIVE | status::FIFO_PENDING);
        let channel = window.channel(0);

        assert_eq!(channel.next_pointer(), 0x2000_0040);
        assert_eq!(channel.transfer_count(), 17);
        assert!(channel.is_active());
        assert!(channel.is_pending());
    }

    #[test]
    fn interrupt_status_decodes_event() {
        let mut window = FakeWindow::new();
        window.set_reg(STATUS_OFFSET, status::DONE | status::ACTIVE);
        let mut channel = window.channel(0);

        assert_eq!(
            channel.interrupt_status().event(),
            Some(TransferEvent::Progress)
        );

        let taken = channel.take_interrupt_status();
        assert!(taken.done);
        assert_eq!(window.reg(STATUS_OFFSET), status::DONE);
    }

    #[test]
    fn take_interrupt_status_skips_write_when_idle() {
        let mut window = FakeWindow::new();
        window.set_reg(STATUS_OFFSET, status::ACTIVE);
        let mut channel = window.channel(0);

        assert!(!channel.take_interrupt_status().any());
        assert_eq!(window.reg(STATUS_OFFSET), status::ACTIVE);
    }
}
