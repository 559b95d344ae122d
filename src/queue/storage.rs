//! Backing stores for [`RingQueue`](super::RingQueue)

/// Byte storage a queue can run over.
///
/// Implementations hand out the whole backing slice; the queue only touches
/// the first `capacity` bytes of it.
pub trait QueueStorage {
    /// Shared view of the backing bytes
    fn as_bytes(&self) -> &[u8];

    /// Exclusive view of the backing bytes
    fn as_bytes_mut(&mut self) -> &mut [u8];
}

impl<const N: usize> QueueStorage for [u8; N] {
    #[inline(always)]
    fn as_bytes(&self) -> &[u8] {
        self
    }

    #[inline(always)]
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl QueueStorage for &mut [u8] {
    #[inline(always)]
    fn as_bytes(&self) -> &[u8] {
        self
    }

    #[inline(always)]
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

#[cfg(feature = "alloc")]
impl QueueStorage for alloc::boxed::Box<[u8]> {
    #[inline(always)]
    fn as_bytes(&self) -> &[u8] {
        self
    }

    #[inline(always)]
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}
