//! Subscriptions
//!
//! Each subscription owns a queue the bus pushes into and the consumer drains
//! through an `EventStream`. Dropping the stream deregisters the subscription.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use herald_core::DomainEvent;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::overflow::Capacity;

/// Identifier of a subscription, unique within its bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Why a push into a subscriber queue was refused
#[derive(Debug)]
pub(crate) enum PushError {
    Full(Arc<DomainEvent>),
    Closed(Arc<DomainEvent>),
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Arc<DomainEvent>>,
    closed: bool,
}

/// Single-consumer event queue of one subscription
#[derive(Debug)]
pub(crate) struct SubscriberQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: Capacity,
}

impl SubscriberQueue {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            capacity,
        }
    }

    pub fn try_push(&self, event: Arc<DomainEvent>) -> Result<(), PushError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(PushError::Closed(event));
            }
            if self.capacity.is_full(state.items.len()) {
                return Err(PushError::Full(event));
            }
            state.items.push_back(event);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Push, evicting the oldest item if full. Returns the evicted item.
    pub fn push_evicting(
        &self,
        event: Arc<DomainEvent>,
    ) -> Result<Option<Arc<DomainEvent>>, PushError> {
        let evicted = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(PushError::Closed(event));
            }
            let evicted = if self.capacity.is_full(state.items.len()) {
                state.items.pop_front()
            } else {
                None
            };
            state.items.push_back(event);
            evicted
        };
        self.notify.notify_one();
        Ok(evicted)
    }

    /// Push ignoring capacity. Used for replay hand-off and warm-up backlog.
    pub fn push_unchecked(&self, event: Arc<DomainEvent>) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.items.push_back(event);
        }
        self.notify.notify_one();
        true
    }

    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_one();
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Wait for the next event. Queued events are drained before a close is observed.
    pub async fn recv(&self) -> Option<Arc<DomainEvent>> {
        loop {
            {
                let mut state = self.state.lock();
                if let Some(event) = state.items.pop_front() {
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }
            // notify_one stores a permit, so a push between unlock and here is not lost
            self.notify.notified().await;
        }
    }

    /// Stream draining this queue until it is closed
    pub fn into_stream(self: Arc<Self>) -> BoxStream<'static, Arc<DomainEvent>> {
        futures::stream::unfold(self, |queue| async move {
            queue.recv().await.map(|event| (event, queue))
        })
        .boxed()
    }
}

/// Runs a cleanup action when dropped
pub(crate) struct SubscriptionGuard(Option<Box<dyn FnOnce() + Send>>);

impl SubscriptionGuard {
    pub fn new<F>(on_drop: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Some(Box::new(on_drop)))
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(on_drop) = self.0.take() {
            on_drop();
        }
    }
}

/// Stream of events for one subscription
///
/// The subscription is registered when the stream is created and cancelled
/// when it is dropped. The stream ends when the bus shuts down or fails.
pub struct EventStream {
    id: SubscriptionId,
    inner: BoxStream<'static, Arc<DomainEvent>>,
    _guard: SubscriptionGuard,
}

impl EventStream {
    pub(crate) fn new(
        id: SubscriptionId,
        inner: BoxStream<'static, Arc<DomainEvent>>,
        guard: SubscriptionGuard,
    ) -> Self {
        Self {
            id,
            inner,
            _guard: guard,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Stream for EventStream {
    type Item = Arc<DomainEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").field("id", &self.id).finish()
    }
}
