//! Interrupt-safe cells.
//!
//! Everything the foreground and a DMA interrupt handler both touch (the
//! channel table, stream and queue slots, async wakers) lives in a
//! [`CriticalSectionCell`].

use core::cell::RefCell;
#[cfg(feature = "async")]
use core::task::Waker;
use critical_section::Mutex;

/// `RefCell` behind a critical section.
///
/// Each access masks interrupts for the length of the closure. Keep closures
/// short: a stream's `append` or `on_interrupt`, never a wait loop.
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Wrap `value`. Usable in `static` initializers.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` on the contents.
    ///
    /// # Panics
    ///
    /// If the cell is already borrowed, i.e. `with` was re-entered from a
    /// handler that preempted another `with` on the same cell. Interrupt
    /// handlers use [`try_with`](Self::try_with) instead.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Run `f` unless the cell is already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            let mut guard = self.inner.borrow(cs).try_borrow_mut().ok()?;
            Some(f(&mut guard))
        })
    }

    /// Run `f` on a shared borrow of the contents.
    #[inline]
    pub fn with_ref<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        critical_section::with(|cs| f(&self.inner.borrow_ref(cs)))
    }
}

// SAFETY: every access to the inner RefCell happens inside a critical section.
unsafe impl<T> Sync for CriticalSectionCell<T> {}

/// Single waker slot filled by a poll and drained by the channel interrupt.
#[cfg(feature = "async")]
pub struct AtomicWaker {
    slot: CriticalSectionCell<Option<Waker>>,
}

#[cfg(feature = "async")]
impl AtomicWaker {
    /// Empty slot. Usable in `static` initializers.
    pub const fn new() -> Self {
        Self {
            slot: CriticalSectionCell::new(None),
        }
    }

    /// Store `waker`, replacing any waker for a different task.
    pub fn register(&self, waker: &Waker) {
        self.slot.with(|slot| {
            if !slot.as_ref().is_some_and(|stored| stored.will_wake(waker)) {
                *slot = Some(waker.clone());
            }
        });
    }

    /// Take the stored waker and wake it outside the critical section.
    #[inline]
    pub fn wake(&self) {
        if let Some(waker) = self.slot.with(Option::take) {
            waker.wake();
        }
    }

    /// Whether a task is waiting
    pub fn is_registered(&self) -> bool {
        self.slot.with_ref(Option::is_some)
    }
}

#[cfg(feature = "async")]
impl Default for AtomicWaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::StaticQueue;
    #[cfg(feature = "async")]
    use crate::testing::{WakeCounter, counting_waker};

    #[test]
    fn cell_guards_a_queue_shared_with_a_handler() {
        static QUEUE: CriticalSectionCell<StaticQueue<8>> = CriticalSectionCell::new(StaticQueue::new());

        // Foreground fills, "handler" drains.
        QUEUE.with(|q| q.push_array(b"abc"));
        let drained = QUEUE.try_with(|q| {
            let mut out = [0u8; 3];
            q.pop_array(&mut out);
            out
        });

        assert_eq!(drained, Some(*b"abc"));
        assert!(QUEUE.with_ref(|q| q.is_empty()));
    }

    #[test]
    fn preempting_handler_backs_off() {
        let cell = CriticalSectionCell::new(3u32);

        let seen_by_handler = cell.with(|value| {
            *value += 1;
            cell.try_with(|v| *v)
        });

        assert_eq!(seen_by_handler, None);
        assert_eq!(cell.try_with(|v| *v), Some(4));
    }

    #[cfg(feature = "async")]
    #[test]
    fn wake_is_one_shot() {
        let slot = AtomicWaker::new();
        let counter = WakeCounter::new();

        slot.register(&counting_waker(counter.clone()));
        assert!(slot.is_registered());

        slot.wake();
        slot.wake();
        assert_eq!(counter.count(), 1);
        assert!(!slot.is_registered());
    }

    #[cfg(feature = "async")]
    #[test]
    fn newer_task_replaces_stored_waker() {
        let slot = AtomicWaker::default();
        let stale = WakeCounter::new();
        let current = WakeCounter::new();

        slot.register(&counting_waker(stale.clone()));
        slot.register(&counting_waker(current.clone()));
        slot.wake();

        assert_eq!(stale.count(), 0);
        assert_eq!(current.count(), 1);
    }
}
