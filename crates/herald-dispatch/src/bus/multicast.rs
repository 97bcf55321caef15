//! Multicast core shared by every backend
//!
//! Holds the registered subscriptions, fans events out to them under the
//! configured overflow policy, and tracks whether the bus is still open.
//! Uses `DashMap` for concurrent access to subscription state.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use herald_core::{DomainEvent, EventFilter};
use parking_lot::Mutex;

use super::error::{BusError, BusResult};
use super::overflow::{Capacity, DiscardReason, OverflowPolicy, RetryPolicy};
use super::stats::{BusStats, Instrumentation};
use super::subscription::{PushError, SubscriberQueue, SubscriptionGuard, SubscriptionId};

/// `live_from` value of a subscription whose live start is not decided yet
const LIVE_PENDING: u64 = u64::MAX;

const RUNNING: u8 = 0;
const TERMINATED: u8 = 1;
const FAILED: u8 = 2;

/// Where a new subscription starts receiving live events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LiveStart {
    /// Every event fanned out after registration
    Immediate,
    /// Decided by `Multicast::claim_live_from`, for replaying backends
    Pending,
}

/// A registered subscription
#[derive(Debug)]
pub(crate) struct Subscriber {
    pub id: SubscriptionId,
    pub filter: EventFilter,
    pub queue: Arc<SubscriberQueue>,
    /// Lowest sequence delivered live
    live_from: AtomicU64,
}

impl Subscriber {
    /// Whether the live path should deliver `seq`, settling a pending start on first sight
    fn accepts(&self, seq: u64) -> bool {
        match self.live_from.load(Ordering::SeqCst) {
            LIVE_PENDING => match self.live_from.compare_exchange(
                LIVE_PENDING,
                seq,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => true,
                Err(from) => seq >= from,
            },
            from => seq >= from,
        }
    }
}

/// Outcome of fanning one event out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Fanout {
    /// Subscriptions whose filter matched
    pub matched: usize,
    pub delivered: usize,
    pub overflowed: usize,
    pub cancelled: usize,
}

/// Held while a publish is in progress
pub(crate) struct EmissionToken<'a>(&'a AtomicBool);

impl Drop for EmissionToken<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Status of the bus as seen by `publish`
pub(crate) enum Admission {
    Open,
    /// Shut down; the event was reported and discarded
    Closed,
    /// Failed earlier; the original failure is returned
    Failed(BusError),
}

pub(crate) struct Multicast {
    name: &'static str,
    subscribers: DashMap<SubscriptionId, Arc<Subscriber>>,
    next_id: AtomicU64,
    policy: OverflowPolicy,
    capacity: Capacity,
    instrumentation: Instrumentation,
    status: AtomicU8,
    /// Set once by the first `terminate`, whatever the status was
    shut_down: AtomicBool,
    failure: Mutex<Option<BusError>>,
    emitting: AtomicBool,
    /// Next sequence number to assign
    sequence: AtomicU64,
}

impl Multicast {
    pub fn new(
        name: &'static str,
        policy: OverflowPolicy,
        capacity: Capacity,
        instrumentation: Instrumentation,
    ) -> Self {
        Self {
            name,
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
            policy,
            capacity,
            instrumentation,
            status: AtomicU8::new(RUNNING),
            shut_down: AtomicBool::new(false),
            failure: Mutex::new(None),
            emitting: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        }
    }

    /// Assign the next sequence number
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Sequence number the next publish will get
    pub fn peek_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn instrumentation(&self) -> &Instrumentation {
        &self.instrumentation
    }

    pub fn stats(&self) -> &BusStats {
        &self.instrumentation.stats
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.status.load(Ordering::SeqCst) == RUNNING
    }

    /// Mark the start of a publish; fails if another publish is in progress
    pub fn enter_emission(&self) -> BusResult<EmissionToken<'_>> {
        if self
            .emitting
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            tracing::error!(bus = self.name, "Concurrent publish detected, emission must be serialized");
            return Err(BusError::NonSerializedEmission { bus: self.name });
        }
        Ok(EmissionToken(&self.emitting))
    }

    /// Check the bus is open before publishing `event`
    pub fn admit(&self, event: &DomainEvent) -> Admission {
        match self.status.load(Ordering::SeqCst) {
            RUNNING => Admission::Open,
            status => {
                self.instrumentation.discard(event, DiscardReason::Terminated);
                tracing::debug!(
                    bus = self.name,
                    kind = %event.kind(),
                    "Publish after shutdown, event discarded"
                );
                if status == FAILED {
                    if let Some(err) = self.failure.lock().clone() {
                        return Admission::Failed(err);
                    }
                }
                Admission::Closed
            }
        }
    }

    /// Serialize the publish and check the bus is open
    ///
    /// `Ok(None)` means the bus is shut down and the event was discarded.
    pub fn begin_publish(&self, event: &DomainEvent) -> BusResult<Option<EmissionToken<'_>>> {
        let token = self.enter_emission()?;
        match self.admit(event) {
            Admission::Open => {
                BusStats::incr(&self.stats().published);
                Ok(Some(token))
            }
            Admission::Closed => Ok(None),
            Admission::Failed(err) => Err(err),
        }
    }

    /// Register a new subscription
    pub fn attach(&self, filter: EventFilter, start: LiveStart) -> Arc<Subscriber> {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(Subscriber {
            id,
            filter,
            queue: Arc::new(SubscriberQueue::new(self.capacity)),
            live_from: AtomicU64::new(match start {
                LiveStart::Immediate => 0,
                LiveStart::Pending => LIVE_PENDING,
            }),
        });

        self.subscribers.insert(id, subscriber.clone());

        // A shutdown racing with this insert may have missed the new queue
        if !self.is_running() {
            self.subscribers.remove(&id);
            subscriber.queue.close();
        }

        subscriber
    }

    /// Settle where a pending subscription goes live
    ///
    /// Returns the first sequence delivered live; everything before it must
    /// come from replay.
    pub fn claim_live_from(&self, subscriber: &Subscriber, next_seq: u64) -> u64 {
        match subscriber.live_from.compare_exchange(
            LIVE_PENDING,
            next_seq,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => next_seq,
            Err(claimed) => claimed,
        }
    }

    /// Remove a subscription, returning how many remain if it was registered
    pub fn detach(&self, id: SubscriptionId) -> Option<usize> {
        let (_, subscriber) = self.subscribers.remove(&id)?;
        subscriber.queue.close();
        Some(self.subscribers.len())
    }

    /// Guard that detaches `id` when dropped, then runs `on_detached` with the remaining count
    pub fn detach_guard<F>(self: &Arc<Self>, id: SubscriptionId, on_detached: F) -> SubscriptionGuard
    where
        F: FnOnce(usize) + Send + 'static,
    {
        let multicast = Arc::downgrade(self);
        SubscriptionGuard::new(move || {
            if let Some(multicast) = multicast.upgrade() {
                if let Some(remaining) = multicast.detach(id) {
                    on_detached(remaining);
                }
            }
        })
    }

    /// Deliver one event to every matching subscription
    pub fn fanout(&self, seq: u64, event: &Arc<DomainEvent>) -> BusResult<Fanout> {
        let kind = event.kind();
        // Snapshot so no map shard lock is held while pushing or spinning
        let targets: Vec<Arc<Subscriber>> = self
            .subscribers
            .iter()
            .filter(|entry| entry.filter.matches(kind))
            .map(|entry| entry.value().clone())
            .collect();

        let mut fanout = Fanout {
            matched: targets.len(),
            ..Fanout::default()
        };

        for subscriber in targets {
            if !subscriber.accepts(seq) {
                continue;
            }

            match self.push(&subscriber, event.clone()) {
                Ok(()) => fanout.delivered += 1,
                Err(Discard::Overflow) => fanout.overflowed += 1,
                Err(Discard::Cancelled) => fanout.cancelled += 1,
                Err(Discard::Fatal(err)) => {
                    self.fail(err.clone());
                    return Err(err);
                }
            }
        }

        BusStats::add(&self.stats().delivered, fanout.delivered as u64);
        Ok(fanout)
    }

    fn push(&self, subscriber: &Subscriber, event: Arc<DomainEvent>) -> Result<(), Discard> {
        let result = match self.policy {
            OverflowPolicy::Buffer | OverflowPolicy::Error | OverflowPolicy::DropLatest => {
                subscriber.queue.try_push(event)
            }
            OverflowPolicy::DropOldest => match subscriber.queue.push_evicting(event) {
                Ok(Some(evicted)) => {
                    self.report(subscriber, &evicted, DiscardReason::Overflow);
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            },
            OverflowPolicy::FailFastRetry(retry) => self.push_with_retry(subscriber, event, retry),
        };

        match result {
            Ok(()) => Ok(()),
            Err(PushError::Closed(event)) => {
                self.report(subscriber, &event, DiscardReason::Cancelled);
                Err(Discard::Cancelled)
            }
            Err(PushError::Full(_)) if self.policy.is_fatal() => {
                tracing::error!(
                    bus = self.name,
                    subscription = %subscriber.id,
                    policy = %self.policy,
                    capacity = self.capacity.limit(),
                    "Subscription queue overflowed, failing bus"
                );
                Err(Discard::Fatal(BusError::Overflow {
                    bus: self.name,
                    subscription: subscriber.id,
                    capacity: self.capacity.limit(),
                }))
            }
            Err(PushError::Full(event)) => {
                self.report(subscriber, &event, DiscardReason::Overflow);
                Err(Discard::Overflow)
            }
        }
    }

    fn push_with_retry(
        &self,
        subscriber: &Subscriber,
        mut event: Arc<DomainEvent>,
        retry: RetryPolicy,
    ) -> Result<(), PushError> {
        let mut attempt = 0;
        loop {
            match subscriber.queue.try_push(event) {
                Err(PushError::Full(back)) if attempt < retry.max_attempts => {
                    attempt += 1;
                    BusStats::incr(&self.stats().retried);
                    retry.spin_once();
                    event = back;
                }
                other => return other,
            }
        }
    }

    fn report(&self, subscriber: &Subscriber, event: &DomainEvent, reason: DiscardReason) {
        tracing::debug!(
            bus = self.name,
            subscription = %subscriber.id,
            kind = %event.kind(),
            reason = %reason,
            "Event discarded for subscription"
        );
        self.instrumentation.discard(event, reason);
    }

    /// Shut down: close every queue and refuse later publishes.
    ///
    /// A failed bus keeps its failure status. Returns true only for the first
    /// call, so the caller releases its own resources exactly once.
    pub fn terminate(&self) -> bool {
        let _ = self.status.compare_exchange(
            RUNNING,
            TERMINATED,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        self.close_all();
        !self.shut_down.swap(true, Ordering::SeqCst)
    }

    fn fail(&self, err: BusError) {
        {
            let mut failure = self.failure.lock();
            if failure.is_none() {
                *failure = Some(err);
            }
        }
        self.status.store(FAILED, Ordering::SeqCst);
        self.close_all();
    }

    fn close_all(&self) {
        for entry in &self.subscribers {
            entry.queue.close();
        }
        self.subscribers.clear();
    }
}

impl std::fmt::Debug for Multicast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multicast")
            .field("name", &self.name)
            .field("subscribers", &self.subscribers.len())
            .field("policy", &self.policy)
            .field("capacity", &self.capacity)
            .finish()
    }
}

enum Discard {
    Overflow,
    Cancelled,
    Fatal(BusError),
}
