//! Testing utilities and mock implementations
//!
//! This module provides a simulated DMA controller for testing streams,
//! pumps and shared wrappers on the host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::{Cell, RefCell};
use std::vec::Vec;

use crate::driver::config::Priority;
use crate::driver::interrupt::{Status, TransferEvent};
use crate::hal::channel::DmaChannel;
use crate::internal::constants::{DEFAULT_FIFO_SIZE, MAX_DESCRIPTOR_TRANSFERS};
use crate::internal::dma::Descriptor;
use crate::internal::dma::descriptor::bits::control;

// =============================================================================
// Mock DMA Controller
// =============================================================================

/// Simulated DMA channel that walks descriptor chains in host memory.
///
/// Data is really copied between the addresses a descriptor names, so tests
/// can check buffer contents. The `next` pointer is read live from the
/// executing descriptor, which lets a test link a continuation before or
/// after the channel reaches the end of the chain.
///
/// # Example
///
/// ```ignore
/// let hw = MockHardware::new(0);
/// let mut stream = DescriptorStream::<_, 4>::new(hw.channel(), &registry, config)?;
/// unsafe { stream.append(dst.as_mut_ptr(), src.as_ptr(), 4)? };
/// stream.enable()?;
///
/// let event = hw.run_to_event().unwrap();
/// stream.on_interrupt(event);
/// ```
#[derive(Debug, Default)]
pub struct MockHardware {
    number: usize,
    /// Address of the executing descriptor, 0 when stopped
    current: Cell<usize>,
    /// Elements left in the executing descriptor
    count: Cell<u32>,
    paused: Cell<bool>,
    /// Number of `is_pending` polls that still report data in the FIFO
    pending_polls: Cell<u32>,
    /// Next-pointer reads return a different value each time
    unstable: Cell<bool>,
    next_reads: Cell<usize>,
    starts: Cell<usize>,
    halts: Cell<usize>,
    pauses: Cell<usize>,
    resumes: Cell<usize>,
    priority: Cell<Option<Priority>>,
}

impl MockHardware {
    /// Create an idle controller channel with the given number
    pub fn new(number: usize) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    /// Channel handle for a stream
    pub fn channel(&self) -> MockChannel<'_> {
        MockChannel { hw: self }
    }

    /// Leak a controller for tests that need `'static` streams
    pub fn leak(number: usize) -> &'static Self {
        std::boxed::Box::leak(std::boxed::Box::new(Self::new(number)))
    }

    fn descriptor(&self) -> Option<&Descriptor> {
        match self.current.get() {
            0 => None,
            // SAFETY: tests keep every started chain alive while the mock walks it
            addr => Some(unsafe { &*(addr as *const Descriptor) }),
        }
    }

    fn load(&self, addr: usize) {
        self.current.set(addr);
        self.count.set(self.descriptor().map_or(0, Descriptor::elements));
    }

    /// Check if the channel is walking a chain
    pub fn is_running(&self) -> bool {
        self.current.get() != 0
    }

    /// Copy `elements` elements of the executing descriptor.
    pub fn move_elements(&self, elements: u32) {
        let Some(desc) = self.descriptor() else {
            return;
        };
        let elements = elements.min(self.count.get());
        let width = desc.element_bytes();
        let ctrl = desc.control();
        let done = (desc.elements() - self.count.get()) as usize;

        for index in done..done + elements as usize {
            let src = if ctrl & control::SRC_FIXED != 0 {
                desc.source()
            } else {
                desc.source() + index * width
            };
            let dst = if ctrl & control::DST_FIXED != 0 {
                desc.destination()
            } else {
                desc.destination() + index * width
            };
            // SAFETY: tests point descriptors at live buffers of sufficient size
            unsafe { core::ptr::copy(src as *const u8, dst as *mut u8, width) };
        }
        self.count.set(self.count.get() - elements);
    }

    /// Finish the executing descriptor and fetch the next one.
    ///
    /// Returns the event the controller raises, if the finished descriptor
    /// has its completion interrupt enabled.
    pub fn finish_current(&self) -> Option<TransferEvent> {
        let desc = self.descriptor()?;
        self.move_elements(self.count.get());

        let interrupts = desc.interrupts();
        self.load(desc.next());

        if !interrupts {
            None
        } else if self.is_running() {
            Some(TransferEvent::Progress)
        } else {
            Some(TransferEvent::Complete)
        }
    }

    /// Run until the controller raises an event or stops silently
    pub fn run_to_event(&self) -> Option<TransferEvent> {
        while self.is_running() {
            if let Some(event) = self.finish_current() {
                return Some(event);
            }
        }
        None
    }

    /// Report data in the FIFO for the next `polls` pending checks
    pub fn set_pending_polls(&self, polls: u32) {
        self.pending_polls.set(polls);
    }

    /// Make every next-pointer read return a different value
    pub fn set_unstable(&self, unstable: bool) {
        self.unstable.set(unstable);
    }

    pub fn starts(&self) -> usize {
        self.starts.get()
    }

    pub fn halts(&self) -> usize {
        self.halts.get()
    }

    pub fn pauses(&self) -> usize {
        self.pauses.get()
    }

    pub fn resumes(&self) -> usize {
        self.resumes.get()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority.get()
    }

    /// Address of the executing descriptor
    pub fn current(&self) -> usize {
        self.current.get()
    }
}

/// [`DmaChannel`] handle onto a [`MockHardware`]
#[derive(Debug, Clone, Copy)]
pub struct MockChannel<'h> {
    hw: &'h MockHardware,
}

impl DmaChannel for MockChannel<'_> {
    const FIFO_SIZE: usize = DEFAULT_FIFO_SIZE;
    const MAX_TRANSFER: u32 = MAX_DESCRIPTOR_TRANSFERS;

    fn number(&self) -> usize {
        self.hw.number
    }

    fn start(&mut self, head: &Descriptor, priority: Priority) {
        self.hw.starts.set(self.hw.starts.get() + 1);
        self.hw.priority.set(Some(priority));
        self.hw.load(head.addr());
    }

    fn halt(&mut self) {
        self.hw.halts.set(self.hw.halts.get() + 1);
        self.hw.paused.set(false);
        self.hw.load(0);
    }

    fn is_active(&self) -> bool {
        self.hw.is_running()
    }

    fn next_pointer(&self) -> usize {
        let next = self.hw.descriptor().map_or(0, Descriptor::next);
        if self.hw.unstable.get() {
            let reads = self.hw.next_reads.get();
            self.hw.next_reads.set(reads + 1);
            next + reads * Descriptor::SIZE
        } else {
            next
        }
    }

    fn transfer_count(&self) -> u32 {
        self.hw.count.get()
    }

    fn pause(&mut self) {
        self.hw.pauses.set(self.hw.pauses.get() + 1);
        self.hw.paused.set(true);
    }

    fn resume(&mut self) {
        self.hw.resumes.set(self.hw.resumes.get() + 1);
        self.hw.paused.set(false);
    }

    fn is_pending(&self) -> bool {
        let polls = self.hw.pending_polls.get();
        if polls > 0 {
            self.hw.pending_polls.set(polls - 1);
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Callback Recorder
// =============================================================================

/// Records every status a stream callback receives
#[derive(Debug, Default)]
pub struct StatusLog {
    entries: RefCell<Vec<Status>>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, status: Status) {
        self.entries.borrow_mut().push(status);
    }

    pub fn entries(&self) -> Vec<Status> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn last(&self) -> Option<Status> {
        self.entries.borrow().last().copied()
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records delays for verification without actually waiting. An optional
/// hook runs on every delay so a test can complete a transfer mid-wait.
#[derive(Default)]
pub struct MockDelay<'a> {
    total_ns: u64,
    hook: Option<&'a dyn Fn(u64)>,
}

impl<'a> MockDelay<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` with the accumulated delay after every delay call
    pub fn with_hook(hook: &'a dyn Fn(u64)) -> Self {
        Self {
            total_ns: 0,
            hook: Some(hook),
        }
    }

    pub fn total_us(&self) -> u64 {
        self.total_ns / 1_000
    }
}

impl embedded_hal::delay::DelayNs for MockDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        if let Some(hook) = self.hook {
            hook(self.total_ns);
        }
    }
}

// =============================================================================
// Waker Helpers
// =============================================================================

#[cfg(feature = "async")]
pub use waker::{WakeCounter, block_on, counting_waker};

#[cfg(feature = "async")]
mod waker {
    use core::future::Future;
    use core::pin::pin;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how often a waker built by [`counting_waker`] was woken
    pub struct WakeCounter {
        count: AtomicUsize,
    }

    impl WakeCounter {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                count: AtomicUsize::new(0),
            })
        }

        pub fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    /// Waker that increments `counter` on every wake
    pub fn counting_waker(counter: Arc<WakeCounter>) -> Waker {
        fn clone_fn(ptr: *const ()) -> RawWaker {
            // SAFETY: `ptr` originates from `Arc::into_raw` in this helper.
            let arc = unsafe { Arc::from_raw(ptr as *const WakeCounter) };
            let cloned = arc.clone();
            core::mem::forget(arc);
            RawWaker::new(Arc::into_raw(cloned) as *const (), &VTABLE)
        }

        fn wake_fn(ptr: *const ()) {
            // SAFETY: `ptr` originates from `Arc::into_raw` in this helper.
            let arc = unsafe { Arc::from_raw(ptr as *const WakeCounter) };
            arc.count.fetch_add(1, Ordering::SeqCst);
        }

        fn wake_by_ref_fn(ptr: *const ()) {
            // SAFETY: `ptr` originates from `Arc::into_raw` in this helper.
            let arc = unsafe { Arc::from_raw(ptr as *const WakeCounter) };
            arc.count.fetch_add(1, Ordering::SeqCst);
            core::mem::forget(arc);
        }

        fn drop_fn(ptr: *const ()) {
            // SAFETY: `ptr` originates from `Arc::into_raw` in this helper.
            unsafe {
                drop(Arc::from_raw(ptr as *const WakeCounter));
            }
        }

        static VTABLE: RawWakerVTable =
            RawWakerVTable::new(clone_fn, wake_fn, wake_by_ref_fn, drop_fn);

        let raw = RawWaker::new(Arc::into_raw(counter) as *const (), &VTABLE);
        // SAFETY: `raw` is built from a valid `RawWakerVTable` and pointer.
        unsafe { Waker::from_raw(raw) }
    }

    /// Poll `future` to completion, running `between` after every pending poll
    pub fn block_on<F: Future>(future: F, mut between: impl FnMut()) -> F::Output {
        let counter = WakeCounter::new();
        let waker = counting_waker(counter);
        let mut cx = Context::from_waker(&waker);
        let mut future = pin!(future);

        loop {
            if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                return output;
            }
            between();
        }
    }
}
