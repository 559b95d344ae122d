//! Scatter-gather DMA descriptor record.
//!
//! Each descriptor describes one contiguous block transfer and points to the
//! next descriptor of the chain. A `next` of 0 terminates the chain.

pub mod bits;

use bits::{control, decode_count};

/// Volatile cell wrapper for descriptor fields
///
/// Ensures all accesses are volatile so the compiler never caches or
/// reorders reads of memory the DMA controller also touches.
#[repr(transparent)]
pub(crate) struct VolatileCell<T: Copy> {
    value: core::cell::UnsafeCell<T>,
}

// Safety: every access is a single volatile load or store of a word-sized
// value, which the DMA controller observes atomically.
unsafe impl<T: Copy> Sync for VolatileCell<T> {}

impl<T: Copy> VolatileCell<T> {
    /// Create a new volatile cell with the given initial value
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self {
            value: core::cell::UnsafeCell::new(value),
        }
    }

    /// Read the value (volatile read)
    #[inline(always)]
    pub fn get(&self) -> T {
        unsafe { core::ptr::read_volatile(self.value.get()) }
    }

    /// Write a value (volatile write)
    #[inline(always)]
    pub fn set(&self, value: T) {
        unsafe { core::ptr::write_volatile(self.value.get(), value) }
    }

    /// Update the value using a function (read-modify-write)
    #[inline(always)]
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(T) -> T,
    {
        let old = self.get();
        self.set(f(old));
    }
}

/// Hardware descriptor `{source, destination, control, next}`.
///
/// Addresses are stored at native pointer width. Controllers fetch
/// descriptors as whole words, so the record is at least word-aligned.
#[repr(C, align(4))]
pub struct Descriptor {
    /// Source address of the block
    source: VolatileCell<usize>,
    /// Destination address of the block
    destination: VolatileCell<usize>,
    /// Element count, width, burst and flags
    control: VolatileCell<u32>,
    /// Address of the next descriptor, 0 at the end of the chain
    next: VolatileCell<usize>,
}

impl Descriptor {
    /// Size of the descriptor in bytes
    pub const SIZE: usize = core::mem::size_of::<Self>();

    /// Create a new zeroed descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            source: VolatileCell::new(0),
            destination: VolatileCell::new(0),
            control: VolatileCell::new(0),
            next: VolatileCell::new(0),
        }
    }

    /// Fill the descriptor as the terminating entry of a chain.
    pub fn program(&self, source: usize, destination: usize, control: u32) {
        self.source.set(source);
        self.destination.set(destination);
        self.control.set(control);
        self.next.set(0);
    }

    /// Source address
    #[inline(always)]
    pub fn source(&self) -> usize {
        self.source.get()
    }

    /// Destination address
    #[inline(always)]
    pub fn destination(&self) -> usize {
        self.destination.get()
    }

    /// Raw control word
    #[inline(always)]
    pub fn control(&self) -> u32 {
        self.control.get()
    }

    /// Address of the next descriptor, 0 when this one ends the chain
    #[inline(always)]
    pub fn next(&self) -> usize {
        self.next.get()
    }

    /// Point this descriptor at `next` (0 terminates the chain).
    #[inline(always)]
    pub fn set_next(&self, next: usize) {
        self.next.set(next);
    }

    /// Address of this descriptor as seen by the DMA controller
    #[inline(always)]
    pub fn addr(&self) -> usize {
        core::ptr::from_ref(self) as usize
    }

    /// Number of elements moved by this descriptor
    #[inline(always)]
    pub fn elements(&self) -> u32 {
        decode_count(self.control.get())
    }

    /// Size of one element in bytes, decoded from the width field
    #[inline(always)]
    pub fn element_bytes(&self) -> usize {
        1 << ((self.control.get() & control::WIDTH_MASK) >> control::WIDTH_SHIFT)
    }

    /// Check if completion of this descriptor raises an interrupt
    #[inline(always)]
    pub fn interrupts(&self) -> bool {
        (self.control.get() & control::INTERRUPT_ON_COMPLETE) != 0
    }

    /// Enable or disable the completion interrupt of this descriptor.
    #[inline(always)]
    pub fn set_interrupt(&self, enabled: bool) {
        if enabled {
            self.control
                .update(|v| v | control::INTERRUPT_ON_COMPLETE);
        } else {
            self.control
                .update(|v| v & !control::INTERRUPT_ON_COMPLETE);
        }
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Descriptor")
            .field("source", &format_args!("{:#x}", self.source()))
            .field("destination", &format_args!("{:#x}", self.destination()))
            .field("control", &format_args!("{:#010x}", self.control()))
            .field("next", &format_args!("{:#x}", self.next()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::bits::encode_count;
    use super::*;

    #[test]
    fn volatile_cell_update() {
        let cell = VolatileCell::new(0x10u32);
        cell.update(|v| v | 0x01);
        assert_eq!(cell.get(), 0x11);
    }

    #[test]
    fn descriptor_is_word_aligned() {
        assert!(core::mem::align_of::<Descriptor>() >= 4);
        assert_eq!(Descriptor::SIZE % 4, 0);

        let pool = [const { Descriptor::new() }; 3];
        for desc in &pool {
            assert_eq!(desc.addr() % 4, 0);
        }
    }

    #[test]
    fn new_descriptor_is_zeroed() {
        let desc = Descriptor::new();
        assert_eq!(desc.source(), 0);
        assert_eq!(desc.destination(), 0);
        assert_eq!(desc.control(), 0);
        assert_eq!(desc.next(), 0);
    }

    #[test]
    fn program_terminates_chain() {
        let desc = Descriptor::new();
        desc.set_next(0x1234);
        desc.program(0x100, 0x200, encode_count(8));

        assert_eq!(desc.source(), 0x100);
        assert_eq!(desc.destination(), 0x200);
        assert_eq!(desc.elements(), 8);
        assert_eq!(desc.next(), 0);
    }

    #[test]
    fn interrupt_flag_toggles_without_touching_count() {
        let desc = Descriptor::new();
        desc.program(0, 0, encode_count(3));

        desc.set_interrupt(true);
        assert!(desc.interrupts());
        assert_eq!(desc.elements(), 3);

        desc.set_interrupt(false);
        assert!(!desc.interrupts());
        assert_eq!(desc.elements(), 3);
    }

    #[test]
    fn element_bytes_follow_width_field() {
        let desc = Descriptor::new();
        desc.program(0, 0, encode_count(1));
        assert_eq!(desc.element_bytes(), 1);

        desc.program(0, 0, encode_count(1) | (2 << control::WIDTH_SHIFT));
        assert_eq!(desc.element_bytes(), 4);
    }

    #[test]
    fn addr_matches_reference() {
        let desc = Descriptor::new();
        assert_eq!(desc.addr(), &desc as *const Descriptor as usize);
    }

    #[test]
    fn size_covers_four_fields() {
        assert_eq!(Descriptor::SIZE, 4 * core::mem::size_of::<usize>());
    }
}
