//! Bus instrumentation
//!
//! Counters every backend keeps, plus an optional callback invoked for each
//! discarded event.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use herald_core::DomainEvent;

use super::overflow::DiscardReason;

/// Counters for one bus
#[derive(Debug, Default)]
pub struct BusStats {
    /// Events accepted by `publish`
    pub published: AtomicU64,
    /// Event copies queued to a subscription
    pub delivered: AtomicU64,
    /// Event copies discarded for overflow or cancellation
    pub dropped: AtomicU64,
    /// Events published with nobody listening
    pub no_subscriber: AtomicU64,
    /// Events published after shutdown or failure
    pub terminated: AtomicU64,
    /// Fail-fast retry attempts
    pub retried: AtomicU64,
}

impl BusStats {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get a snapshot of current stats
    pub fn snapshot(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            no_subscriber: self.no_subscriber.load(Ordering::Relaxed),
            terminated: self.terminated.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.published.store(0, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.no_subscriber.store(0, Ordering::Relaxed);
        self.terminated.store(0, Ordering::Relaxed);
        self.retried.store(0, Ordering::Relaxed);
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        if n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of `BusStats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusStatsSnapshot {
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub no_subscriber: u64,
    pub terminated: u64,
    pub retried: u64,
}

/// Callback told about every discarded event
#[derive(Clone)]
pub struct DiscardHook(Arc<dyn Fn(&DomainEvent, DiscardReason) + Send + Sync>);

impl DiscardHook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&DomainEvent, DiscardReason) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, event: &DomainEvent, reason: DiscardReason) {
        (self.0)(event, reason);
    }
}

impl fmt::Debug for DiscardHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DiscardHook")
    }
}

/// Stats plus the optional hook, shared by a bus and its multicast core
#[derive(Debug, Clone, Default)]
pub(crate) struct Instrumentation {
    pub stats: Arc<BusStats>,
    pub hook: Option<DiscardHook>,
}

impl Instrumentation {
    pub fn new(hook: Option<DiscardHook>) -> Self {
        Self {
            stats: BusStats::new_shared(),
            hook,
        }
    }

    /// Count and report one discarded event
    pub fn discard(&self, event: &DomainEvent, reason: DiscardReason) {
        let counter = match reason {
            DiscardReason::NoSubscriber => &self.stats.no_subscriber,
            DiscardReason::Overflow | DiscardReason::Cancelled => &self.stats.dropped,
            DiscardReason::Terminated => &self.stats.terminated,
        };
        BusStats::incr(counter);

        // Nobody listening is expected, only counted
        if reason == DiscardReason::NoSubscriber {
            return;
        }
        if let Some(hook) = &self.hook {
            hook.call(event, reason);
        }
    }
}
