//! Async/await support for descriptor streams.
//!
//! Provides the future returned by [`SharedStream::wait`]. The future is
//! woken from [`ChannelHandler::on_event`], so the slot has to receive its
//! channel's events, usually through [`ChannelRegistry::dispatch`].
//!
//! [`ChannelHandler::on_event`]: crate::hal::registry::ChannelHandler::on_event
//! [`ChannelRegistry::dispatch`]: crate::hal::registry::ChannelRegistry::dispatch

use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use super::shared::SharedStream;
use crate::driver::error::{IoError, Result};
use crate::driver::interrupt::Status;
use crate::hal::channel::DmaChannel;

/// Future resolving when a shared stream leaves the `Busy` state.
///
/// Resolves to the stream's final status as a result, or
/// [`IoError::InvalidState`] when the slot is empty.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct WaitFuture<'a, C: DmaChannel + 'static, const N: usize> {
    shared: &'a SharedStream<C, N>,
}

impl<'a, C: DmaChannel + 'static, const N: usize> WaitFuture<'a, C, N> {
    /// Create a new wait future.
    pub fn new(shared: &'a SharedStream<C, N>) -> Self {
        Self { shared }
    }

    fn ready(&self) -> Option<Result<()>> {
        match self.shared.status() {
            None => Some(Err(IoError::InvalidState.into())),
            Some(Status::Busy) => None,
            Some(status) => Some(status.into_result()),
        }
    }
}

impl<C: DmaChannel + 'static, const N: usize> Future for WaitFuture<'_, C, N> {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.ready() {
            return Poll::Ready(result);
        }

        // Register before the second check so a completion in between wakes us
        self.shared.waker.register(cx.waker());
        match self.ready() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}
