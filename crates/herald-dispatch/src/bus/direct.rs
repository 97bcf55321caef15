//! Direct broadcast bus
//!
//! One multicast sink, one overflow policy, no history. Events published
//! while nobody is subscribed are counted and discarded.

use std::sync::Arc;

use herald_core::{DomainEvent, EventFilter};

use super::error::BusResult;
use super::event_bus::EventBus;
use super::multicast::{LiveStart, Multicast};
use super::overflow::{Capacity, DiscardReason, OverflowPolicy};
use super::scheduler::Scheduler;
use super::stats::{BusStatsSnapshot, DiscardHook, Instrumentation};
use super::subscription::EventStream;

const NAME: &str = "direct";

pub struct DirectBroadcastBus {
    multicast: Arc<Multicast>,
    scheduler: Scheduler,
}

impl DirectBroadcastBus {
    pub fn new(
        scheduler: Scheduler,
        policy: OverflowPolicy,
        capacity: Capacity,
        hook: Option<DiscardHook>,
    ) -> Self {
        Self {
            multicast: Arc::new(Multicast::new(
                NAME,
                policy,
                capacity,
                Instrumentation::new(hook),
            )),
            scheduler,
        }
    }

    /// Unbounded buffering on the current runtime
    pub fn with_defaults() -> BusResult<Self> {
        Ok(Self::new(
            Scheduler::current()?,
            OverflowPolicy::Buffer,
            Capacity::Unbounded,
            None,
        ))
    }
}

impl EventBus for DirectBroadcastBus {
    fn publish(&self, event: DomainEvent) -> BusResult<()> {
        let Some(_emission) = self.multicast.begin_publish(&event)? else {
            return Ok(());
        };

        if self.multicast.is_empty() {
            tracing::trace!(bus = NAME, kind = %event.kind(), "No subscribers, event discarded");
            self.multicast
                .instrumentation()
                .discard(&event, DiscardReason::NoSubscriber);
            return Ok(());
        }

        let seq = self.multicast.next_sequence();
        self.multicast.fanout(seq, &Arc::new(event))?;
        Ok(())
    }

    fn subscribe_filter(&self, filter: EventFilter) -> EventStream {
        let subscriber = self.multicast.attach(filter, LiveStart::Immediate);
        let guard = self.multicast.detach_guard(subscriber.id, |_| {});
        EventStream::new(subscriber.id, subscriber.queue.clone().into_stream(), guard)
    }

    fn shutdown(&self) {
        if self.multicast.terminate() {
            tracing::info!(bus = NAME, "Event bus shut down");
        }
    }

    fn is_shutdown(&self) -> bool {
        !self.multicast.is_running()
    }

    fn subscriber_count(&self) -> usize {
        self.multicast.len()
    }

    fn stats(&self) -> BusStatsSnapshot {
        self.multicast.stats().snapshot()
    }

    fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

impl Drop for DirectBroadcastBus {
    fn drop(&mut self) {
        self.multicast.terminate();
    }
}

impl std::fmt::Debug for DirectBroadcastBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectBroadcastBus")
            .field("multicast", &self.multicast)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBusExt;
    use futures::StreamExt;
    use herald_core::{ClientHandle, EventKind, EventPayload, ShardInfo};

    fn event(payload: EventPayload) -> DomainEvent {
        DomainEvent::new(ClientHandle::new("test"), ShardInfo::single(), payload)
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_counted() {
        let bus = DirectBroadcastBus::with_defaults().unwrap();
        bus.publish(event(EventPayload::Connected)).unwrap();

        let stats = bus.stats();
        assert_eq!(stats.published, 1);
        assert_eq!(stats.no_subscriber, 1);
    }

    #[tokio::test]
    async fn test_filtered_delivery() {
        let bus = DirectBroadcastBus::with_defaults().unwrap();
        let mut resumed = bus.subscribe(EventKind::Resumed);
        let mut all = bus.subscribe(EventFilter::All);

        bus.publish(event(EventPayload::Connected)).unwrap();
        bus.publish(event(EventPayload::Resumed)).unwrap();

        assert_eq!(resumed.next().await.unwrap().kind(), EventKind::Resumed);
        assert_eq!(all.next().await.unwrap().kind(), EventKind::Connected);
        assert_eq!(all.next().await.unwrap().kind(), EventKind::Resumed);
    }

    #[tokio::test]
    async fn test_drop_stream_deregisters() {
        let bus = DirectBroadcastBus::with_defaults().unwrap();
        let stream = bus.subscribe(EventFilter::All);
        assert_eq!(bus.subscriber_count(), 1);
        drop(stream);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_completes_streams() {
        let bus = DirectBroadcastBus::with_defaults().unwrap();
        let mut stream = bus.subscribe(EventFilter::All);

        bus.shutdown();
        bus.shutdown();
        assert!(bus.is_shutdown());
        assert!(stream.next().await.is_none());

        bus.publish(event(EventPayload::Connected)).unwrap();
        assert_eq!(bus.stats().terminated, 1);
    }
}
