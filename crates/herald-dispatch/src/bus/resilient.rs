//! Resilient sink bus
//!
//! Never stalls or fails the publisher on a runtime condition. Each emission
//! is classified as an [`EmitResult`]; overflow, cancellation and shutdown
//! are discarded and reported through the instrumentation hook. Only a
//! non-serialized publish is surfaced as an error.

use std::sync::Arc;

use herald_core::{DomainEvent, EventFilter};

use super::error::{BusError, BusResult};
use super::event_bus::EventBus;
use super::multicast::{Admission, LiveStart, Multicast};
use super::overflow::{Capacity, DiscardReason, EmitResult, OverflowPolicy, RetryPolicy};
use super::scheduler::Scheduler;
use super::stats::{BusStats, BusStatsSnapshot, DiscardHook, Instrumentation};
use super::subscription::EventStream;

const NAME: &str = "resilient";

/// Per-subscription queue size used by `with_defaults`
pub const DEFAULT_CAPACITY: usize = 256;

pub struct ResilientSinkBus {
    multicast: Arc<Multicast>,
    scheduler: Scheduler,
}

impl ResilientSinkBus {
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

    /// Bounded queues with fail-fast retry on the current runtime
    pub fn with_defaults() -> BusResult<Self> {
        Ok(Self::new(
            Scheduler::current()?,
            OverflowPolicy::FailFastRetry(RetryPolicy::default()),
            Capacity::Bounded(DEFAULT_CAPACITY),
            None,
        ))
    }

    /// Emit one event and classify the outcome
    pub fn emit(&self, event: DomainEvent) -> EmitResult {
        let Ok(_emission) = self.multicast.enter_emission() else {
            return EmitResult::FailNonSerialized;
        };

        match self.multicast.admit(&event) {
            Admission::Open => {}
            Admission::Closed | Admission::Failed(_) => return EmitResult::FailTerminated,
        }
        BusStats::incr(&self.multicast.stats().published);

        if self.multicast.is_empty() {
            tracing::trace!(bus = NAME, kind = %event.kind(), "No subscribers, event discarded");
            self.multicast
                .instrumentation()
                .discard(&event, DiscardReason::NoSubscriber);
            return EmitResult::FailZeroSubscriber;
        }

        let seq = self.multicast.next_sequence();
        match self.multicast.fanout(seq, &Arc::new(event)) {
            Ok(fanout) if fanout.overflowed > 0 => EmitResult::FailOverflow,
            Ok(fanout) if fanout.cancelled > 0 => EmitResult::FailCancelled,
            Ok(_) => EmitResult::Ok,
            Err(err) => {
                tracing::warn!(bus = NAME, error = %err, "Emission failed the bus");
                EmitResult::FailOverflow
            }
        }
    }
}

impl EventBus for ResilientSinkBus {
    fn publish(&self, event: DomainEvent) -> BusResult<()> {
        match self.emit(event) {
            EmitResult::FailNonSerialized => Err(BusError::NonSerializedEmission { bus: NAME }),
            _ => Ok(()),
        }
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

impl Drop for ResilientSinkBus {
    fn drop(&mut self) {
        self.multicast.terminate();
    }
}

impl std::fmt::Debug for ResilientSinkBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientSinkBus")
            .field("multicast", &self.multicast)
            .finish()
    }
}
