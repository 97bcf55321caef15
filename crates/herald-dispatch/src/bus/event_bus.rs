//! Event bus contract
//!
//! `EventBus` is the object-safe interface every backend implements.
//! `EventBusExt` adds the generic subscription helpers on top of it.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{FutureExt, Stream, StreamExt};
use herald_core::{DomainEvent, EventFilter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use super::error::BusResult;
use super::scheduler::Scheduler;
use super::stats::BusStatsSnapshot;
use super::subscription::EventStream;
use crate::adapter::{AsyncEventListener, EventListener};

/// Buffer between a handler task and its `HandledStream`
const HANDLED_BUFFER: usize = 64;

/// Distributes domain events to independent subscriptions
pub trait EventBus: Send + Sync {
    /// Publish one event. Callers must not publish concurrently on the same bus.
    fn publish(&self, event: DomainEvent) -> BusResult<()>;

    /// Register a subscription receiving events that match `filter`
    fn subscribe_filter(&self, filter: EventFilter) -> EventStream;

    /// Complete every subscription and discard later publishes. Idempotent.
    fn shutdown(&self);

    fn is_shutdown(&self) -> bool;

    fn subscriber_count(&self) -> usize;

    fn stats(&self) -> BusStatsSnapshot;

    /// Runtime used for handler callbacks and timers
    fn scheduler(&self) -> &Scheduler;

    fn name(&self) -> &'static str;
}

/// Generic helpers available on every `EventBus`
pub trait EventBusExt: EventBus {
    fn subscribe(&self, filter: impl Into<EventFilter>) -> EventStream {
        self.subscribe_filter(filter.into())
    }

    /// Run `handler` for each matching event on the bus scheduler
    ///
    /// Errors and panics from the handler are logged and suppressed; the
    /// subscription keeps going. Successful outputs are yielded by the
    /// returned stream. Dropping the stream cancels the subscription.
    fn subscribe_with<F, Fut, T>(
        &self,
        filter: impl Into<EventFilter>,
        handler: F,
    ) -> HandledStream<T>
    where
        F: Fn(Arc<DomainEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let filter = filter.into();
        let mut events = self.subscribe_filter(filter.clone());
        let subscription = events.id();
        let bus = self.name();
        let (tx, rx) = mpsc::channel(HANDLED_BUFFER);

        let task = self.scheduler().spawn(async move {
            while let Some(event) = events.next().await {
                let outcome = AssertUnwindSafe(async { handler(event.clone()).await })
                    .catch_unwind()
                    .await;

                match outcome {
                    Ok(Ok(output)) => {
                        if tx.send(output).await.is_err() {
                            break;
                        }
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(
                            bus,
                            subscription = %subscription,
                            kind = %event.kind(),
                            shard = %event.shard(),
                            error = %err,
                            "Error while handling event"
                        );
                    }
                    Err(panic) => {
                        tracing::error!(
                            bus,
                            subscription = %subscription,
                            kind = %event.kind(),
                            shard = %event.shard(),
                            panic = %panic_message(panic.as_ref()),
                            "Handler panicked while handling event"
                        );
                    }
                }
            }
            tracing::debug!(bus, subscription = %subscription, "Handler subscription finished");
        });

        tracing::debug!(bus, subscription = %subscription, filter = %filter, "Handler subscription created");
        HandledStream::new(rx, task)
    }

    /// Route every event through an async listener, yielding each handled event
    fn subscribe_adapter<A>(&self, adapter: Arc<A>) -> HandledStream<Arc<DomainEvent>>
    where
        A: AsyncEventListener + ?Sized + 'static,
    {
        self.subscribe_with(EventFilter::All, move |event| {
            let adapter = adapter.clone();
            async move {
                adapter.hook_on_event(&event).await?;
                Ok(event)
            }
        })
    }

    /// Route every event through a blocking listener, yielding each handled event
    fn subscribe_listener<L>(&self, listener: Arc<L>) -> HandledStream<Arc<DomainEvent>>
    where
        L: EventListener + ?Sized + 'static,
    {
        self.subscribe_with(EventFilter::All, move |event| {
            listener.on_event(&event);
            std::future::ready(Ok(event))
        })
    }
}

impl<B: EventBus + ?Sized> EventBusExt for B {}

/// Outputs of a handler subscription
///
/// Dropping it aborts the handler task and cancels the subscription.
pub struct HandledStream<T> {
    inner: ReceiverStream<T>,
    task: JoinHandle<()>,
}

impl<T> HandledStream<T> {
    fn new(rx: mpsc::Receiver<T>, task: JoinHandle<()>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            task,
        }
    }

    /// Cancel the subscription without waiting for the stream to be dropped
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl<T> Stream for HandledStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl<T> Drop for HandledStream<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DirectBroadcastBus;
    use async_trait::async_trait;
    use herald_core::{ClientHandle, EventKind, EventPayload, ShardInfo};
    use parking_lot::Mutex;

    fn event(payload: EventPayload) -> DomainEvent {
        DomainEvent::new(ClientHandle::new("test"), ShardInfo::single(), payload)
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    impl EventListener for Recorder {
        fn on_connected(&self, event: &DomainEvent) {
            self.seen.lock().push(event.kind());
        }

        fn on_resumed(&self, event: &DomainEvent) {
            self.seen.lock().push(event.kind());
        }
    }

    struct RejectsConnected;

    #[async_trait]
    impl AsyncEventListener for RejectsConnected {
        async fn on_connected(&self, _event: &DomainEvent) -> anyhow::Result<()> {
            anyhow::bail!("not today")
        }
    }

    #[tokio::test]
    async fn test_subscribe_listener_routes_by_kind() {
        let bus = DirectBroadcastBus::with_defaults().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut handled = bus.subscribe_listener(recorder.clone());

        bus.publish(event(EventPayload::Connected)).unwrap();
        bus.publish(event(EventPayload::Resumed)).unwrap();

        assert_eq!(handled.next().await.unwrap().kind(), EventKind::Connected);
        assert_eq!(handled.next().await.unwrap().kind(), EventKind::Resumed);
        assert_eq!(
            *recorder.seen.lock(),
            vec![EventKind::Connected, EventKind::Resumed]
        );
    }

    #[tokio::test]
    async fn test_subscribe_adapter_suppresses_errors() {
        let bus = DirectBroadcastBus::with_defaults().unwrap();
        let handled = bus.subscribe_adapter(Arc::new(RejectsConnected));

        bus.publish(event(EventPayload::Connected)).unwrap();
        bus.publish(event(EventPayload::Resumed)).unwrap();
        bus.shutdown();

        let kinds: Vec<_> = handled.map(|event| event.kind()).collect().await;
        assert_eq!(kinds, vec![EventKind::Resumed]);
    }
}
