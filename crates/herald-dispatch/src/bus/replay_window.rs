//! Replay window bus
//!
//! Keeps a bounded history (newest `n` events, or events younger than a
//! maximum age). Every new subscription first receives that history, then
//! live events.

use std::sync::Arc;
use std::time::Duration;

use herald_core::{DomainEvent, EventFilter};

use super::error::BusResult;
use super::event_bus::EventBus;
use super::multicast::{LiveStart, Multicast};
use super::overflow::{Capacity, OverflowPolicy};
use super::replay_buffer::{replay_then_live, ReplayBuffer, ReplayLimit};
use super::scheduler::Scheduler;
use super::stats::{BusStatsSnapshot, DiscardHook, Instrumentation};
use super::subscription::EventStream;

const NAME: &str = "replay-window";

pub struct ReplayWindowBus {
    multicast: Arc<Multicast>,
    buffer: Arc<ReplayBuffer>,
    /// Events retained for replay; everything else is live-only
    replay_filter: EventFilter,
    quiescence: Duration,
    scheduler: Scheduler,
}

impl ReplayWindowBus {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scheduler: Scheduler,
        policy: OverflowPolicy,
        capacity: Capacity,
        limit: ReplayLimit,
        replay_filter: EventFilter,
        quiescence: Duration,
        hook: Option<DiscardHook>,
    ) -> Self {
        Self {
            multicast: Arc::new(Multicast::new(
                NAME,
                policy,
                capacity,
                Instrumentation::new(hook),
            )),
            buffer: Arc::new(ReplayBuffer::new(limit)),
            replay_filter,
            quiescence,
            scheduler,
        }
    }

    /// Replay the last `limit` of history on the current runtime
    pub fn with_limit(limit: ReplayLimit) -> BusResult<Self> {
        Ok(Self::new(
            Scheduler::current()?,
            OverflowPolicy::Buffer,
            Capacity::Unbounded,
            limit,
            EventFilter::All,
            Duration::from_millis(1),
            None,
        ))
    }

    /// Events currently held for replay
    pub fn replay_len(&self) -> usize {
        self.buffer.len()
    }
}

impl EventBus for ReplayWindowBus {
    fn publish(&self, event: DomainEvent) -> BusResult<()> {
        let Some(_emission) = self.multicast.begin_publish(&event)? else {
            return Ok(());
        };
        let event = Arc::new(event);
        let seq = self.multicast.next_sequence();

        if self.replay_filter.matches(event.kind()) {
            self.buffer.push(seq, event.clone());
        }
        self.buffer.mark_processed(seq);

        self.multicast.fanout(seq, &event)?;
        Ok(())
    }

    fn subscribe_filter(&self, filter: EventFilter) -> EventStream {
        let subscriber = self.multicast.attach(filter, LiveStart::Pending);
        let live_from = self
            .multicast
            .claim_live_from(&subscriber, self.multicast.peek_sequence());

        tracing::debug!(
            bus = NAME,
            subscription = %subscriber.id,
            filter = %subscriber.filter,
            live_from,
            "Replaying subscription created"
        );

        let guard = self.multicast.detach_guard(subscriber.id, |_| {});
        let stream = replay_then_live(
            self.buffer.clone(),
            live_from,
            subscriber.filter.clone(),
            subscriber.queue.clone(),
            self.quiescence,
        );
        EventStream::new(subscriber.id, stream, guard)
    }

    fn shutdown(&self) {
        if self.multicast.terminate() {
            self.buffer.clear();
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

impl Drop for ReplayWindowBus {
    fn drop(&mut self) {
        self.multicast.terminate();
    }
}

impl std::fmt::Debug for ReplayWindowBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayWindowBus")
            .field("multicast", &self.multicast)
            .field("replay_len", &self.buffer.len())
            .field("replay_filter", &self.replay_filter)
            .finish()
    }
}
