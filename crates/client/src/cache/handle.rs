//! Per-requester handles returned by [`FetchCache::request`](super::FetchCache::request).

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::oneshot;

use rebrowse_core::{Error, ResourceLocator};

use super::Inner;

/// Outcome delivered to every requester of a locator.
pub type FetchOutcome = Result<Bytes, Error>;

/// Unique id of one requester's interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub(crate) u64);

/// Cloneable token identifying one request, used to cancel it.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub(crate) locator: ResourceLocator,
    pub(crate) id: RequestId,
    pub(crate) canceled: Arc<AtomicBool>,
}

impl RequestTicket {
    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

/// One requester's interest in a locator.
///
/// Resolves exactly once with the shared outcome, or never if the request
/// was canceled first. Dropping an unresolved handle cancels it; the
/// underlying fetch keeps running for the other requesters and still
/// populates the cache.
#[derive(Debug)]
pub struct FetchHandle {
    pub(crate) ticket: RequestTicket,
    pub(crate) rx: Option<oneshot::Receiver<FetchOutcome>>,
    pub(crate) cache: Weak<Inner>,
}

impl FetchHandle {
    /// Token that can cancel this request from elsewhere.
    pub fn ticket(&self) -> &RequestTicket {
        &self.ticket
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.ticket.locator
    }

    /// Withdraw this requester's interest.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Future for FetchHandle {
    type Output = FetchOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.ticket.is_canceled() {
            self.rx = None;
            return Poll::Pending;
        }

        let Some(rx) = self.rx.as_mut() else {
            return Poll::Pending;
        };

        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => {
                self.rx = None;
                Poll::Ready(outcome)
            }
            // Sender dropped: the request was withdrawn.
            Poll::Ready(Err(_)) => {
                self.rx = None;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for FetchHandle {
    fn drop(&mut self) {
        if self.rx.is_none() {
            return;
        }
        if let Some(inner) = self.cache.upgrade() {
            inner.withdraw(&self.ticket);
        }
    }
}
