//! Buffered emitter bus
//!
//! Multicast tuned for several slow consumers: each subscription gets its
//! own bounded queue. Events published before anyone subscribes are kept in a
//! small warm-up backlog that the next subscriber receives first.

use std::collections::VecDeque;
use std::sync::Arc;

use herald_core::{DomainEvent, EventFilter};
use parking_lot::Mutex;

use super::error::BusResult;
use super::event_bus::EventBus;
use super::multicast::{LiveStart, Multicast};
use super::overflow::{Capacity, DiscardReason, OverflowPolicy};
use super::scheduler::Scheduler;
use super::stats::{BusStatsSnapshot, DiscardHook, Instrumentation};
use super::subscription::EventStream;

const NAME: &str = "buffered";

/// Events kept while nobody is subscribed
pub const DEFAULT_WARMUP_CAPACITY: usize = 256;

pub struct BufferedEmitterBus {
    multicast: Arc<Multicast>,
    scheduler: Scheduler,
    /// Only touched while the subscriber set is empty or being joined
    backlog: Mutex<VecDeque<Arc<DomainEvent>>>,
    warmup_capacity: usize,
}

impl BufferedEmitterBus {
    pub fn new(
        scheduler: Scheduler,
        policy: OverflowPolicy,
        capacity: Capacity,
        warmup_capacity: usize,
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
            backlog: Mutex::new(VecDeque::new()),
            warmup_capacity,
        }
    }

    /// Per-subscriber queues of 256 events on the current runtime
    pub fn with_defaults() -> BusResult<Self> {
        Ok(Self::new(
            Scheduler::current()?,
            OverflowPolicy::Buffer,
            Capacity::Bounded(DEFAULT_WARMUP_CAPACITY),
            DEFAULT_WARMUP_CAPACITY,
            None,
        ))
    }

    /// Events waiting for the first subscriber
    pub fn backlog_len(&self) -> usize {
        self.backlog.lock().len()
    }

    fn hold(&self, backlog: &mut VecDeque<Arc<DomainEvent>>, event: Arc<DomainEvent>) {
        let instrumentation = self.multicast.instrumentation();
        if self.warmup_capacity == 0 {
            instrumentation.discard(&event, DiscardReason::NoSubscriber);
            return;
        }
        if backlog.len() >= self.warmup_capacity {
            if let Some(evicted) = backlog.pop_front() {
                tracing::debug!(
                    bus = NAME,
                    kind = %evicted.kind(),
                    capacity = self.warmup_capacity,
                    "Warm-up backlog full, oldest event dropped"
                );
                instrumentation.discard(&evicted, DiscardReason::Overflow);
            }
        }
        backlog.push_back(event);
    }
}

impl EventBus for BufferedEmitterBus {
    fn publish(&self, event: DomainEvent) -> BusResult<()> {
        let Some(_emission) = self.multicast.begin_publish(&event)? else {
            return Ok(());
        };
        let event = Arc::new(event);

        {
            let mut backlog = self.backlog.lock();
            if self.multicast.is_empty() {
                self.hold(&mut backlog, event);
                return Ok(());
            }
        }

        let seq = self.multicast.next_sequence();
        self.multicast.fanout(seq, &event)?;
        Ok(())
    }

    fn subscribe_filter(&self, filter: EventFilter) -> EventStream {
        // Backlog must land in the queue before the lock lets a live event through
        let (subscriber, handed_over) = {
            let mut backlog = self.backlog.lock();
            let subscriber = self.multicast.attach(filter, LiveStart::Immediate);
            let mut handed_over = 0;
            for event in backlog.drain(..) {
                if subscriber.filter.matches(event.kind()) && subscriber.queue.push_unchecked(event)
                {
                    handed_over += 1;
                }
            }
            (subscriber, handed_over)
        };

        let id = subscriber.id;
        tracing::debug!(
            bus = NAME,
            subscription = %id,
            filter = %subscriber.filter,
            backlog = handed_over,
            "Subscription created"
        );

        let guard = self.multicast.detach_guard(id, move |remaining| {
            tracing::debug!(
                bus = NAME,
                subscription = %id,
                remaining,
                "Subscription cancelled"
            );
        });
        EventStream::new(id, subscriber.queue.clone().into_stream(), guard)
    }

    fn shutdown(&self) {
        if self.multicast.terminate() {
            self.backlog.lock().clear();
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

impl Drop for BufferedEmitterBus {
    fn drop(&mut self) {
        self.multicast.terminate();
    }
}

impl std::fmt::Debug for BufferedEmitterBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedEmitterBus")
            .field("multicast", &self.multicast)
            .field("warmup_capacity", &self.warmup_capacity)
            .finish()
    }
}
