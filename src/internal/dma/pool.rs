//! Fixed-capacity descriptor pool with wraparound indices.

use super::descriptor::Descriptor;

/// Inline pool of `N` descriptors used as a ring.
///
/// Queued descriptors occupy the slots `head .. head + queued` (modulo `N`)
/// and are linked in that order.
pub struct DescriptorPool<const N: usize> {
    /// Descriptor storage
    descriptors: [Descriptor; N],
    /// Slot of the oldest queued descriptor
    head: usize,
    /// Number of queued descriptors
    queued: usize,
}

impl<const N: usize> DescriptorPool<N> {
    /// Create an empty pool. `N` must be non-zero.
    #[must_use]
    pub const fn new() -> Self {
        const {
            assert!(N > 0, "descriptor pool needs at least one slot");
        }

        Self {
            descriptors: [const { Descriptor::new() }; N],
            head: 0,
            queued: 0,
        }
    }

    /// Number of slots in the pool
    #[inline(always)]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of queued descriptors
    #[inline(always)]
    #[must_use]
    pub const fn queued(&self) -> usize {
        self.queued
    }

    /// Check if no descriptor is queued
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.queued == 0
    }

    /// Check if every slot is queued
    #[inline(always)]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.queued == N
    }

    /// Slot of the oldest queued descriptor
    #[inline(always)]
    #[must_use]
    pub const fn head_index(&self) -> usize {
        self.head
    }

    /// Slot the next pushed descriptor lands in
    #[inline(always)]
    #[must_use]
    pub const fn tail_index(&self) -> usize {
        (self.head + self.queued) % N
    }

    /// Get a reference to the descriptor in a slot (index wraps)
    #[inline(always)]
    pub fn get(&self, index: usize) -> &Descriptor {
        &self.descriptors[index % N]
    }

    /// Oldest queued descriptor
    #[inline(always)]
    pub fn head(&self) -> &Descriptor {
        self.get(self.head)
    }

    /// Queued descriptor `offset` positions after the head
    #[inline(always)]
    pub fn at_offset(&self, offset: usize) -> &Descriptor {
        self.get(self.head + offset)
    }

    /// Newest queued descriptor
    pub fn last(&self) -> Option<&Descriptor> {
        if self.queued == 0 {
            None
        } else {
            Some(self.at_offset(self.queued - 1))
        }
    }

    /// Program the next free slot and link it behind the current tail.
    ///
    /// The new descriptor is written completely before the previous tail
    /// points at it, so a chain the hardware is walking stays consistent.
    /// With `close_loop` the new descriptor points back at the head.
    ///
    /// Returns `None` when the pool is full.
    pub fn push(
        &mut self,
        source: usize,
        destination: usize,
        control: u32,
        close_loop: bool,
    ) -> Option<&Descriptor> {
        if self.is_full() {
            return None;
        }

        let slot = self.tail_index();
        let entry = &self.descriptors[slot];
        entry.program(source, destination, control);
        if close_loop {
            entry.set_next(self.head().addr());
        }

        if let Some(previous) = self.last() {
            previous.set_next(entry.addr());
        }

        self.queued += 1;
        Some(&self.descriptors[slot])
    }

    /// Drop `count` descriptors from the head of the queue.
    pub fn retire(&mut self, count: usize) {
        let count = count.min(self.queued);
        self.head = (self.head + count) % N;
        self.queued -= count;
    }

    /// Forget all queued descriptors and rewind to slot 0
    #[inline(always)]
    pub fn reset(&mut self) {
        self.head = 0;
        self.queued = 0;
    }

    /// Rewrite the `next` links of the queued chain from current addresses.
    pub fn relink(&self, close_loop: bool) {
        for offset in 0..self.queued {
            let next = if offset + 1 < self.queued {
                self.at_offset(offset + 1).addr()
            } else if close_loop {
                self.head().addr()
            } else {
                0
            };
            self.at_offset(offset).set_next(next);
        }
    }

    /// Slot of the descriptor at `addr`, if it belongs to this pool
    pub fn slot_of(&self, addr: usize) -> Option<usize> {
        let base = self.base_addr();
        let span = addr.checked_sub(base)?;
        if span % Descriptor::SIZE != 0 || span / Descriptor::SIZE >= N {
            return None;
        }
        Some(span / Descriptor::SIZE)
    }

    /// Distance of a slot from the head, in queue order
    #[inline(always)]
    pub fn offset_of(&self, slot: usize) -> usize {
        (slot + N - self.head) % N
    }

    /// Get the base address of the descriptor array
    #[inline(always)]
    pub fn base_addr(&self) -> usize {
        self.descriptors.as_ptr() as usize
    }

    /// Iterate over the queued descriptors from head to tail
    pub fn iter_queued(&self) -> impl Iterator<Item = &Descriptor> {
        (0..self.queued).map(move |offset| self.at_offset(offset))
    }
}

impl<const N: usize> Default for DescriptorPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
