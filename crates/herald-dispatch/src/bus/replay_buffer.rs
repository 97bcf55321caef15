//! Replay buffer
//!
//! Bounded history of published events for late subscribers. Entries carry
//! the bus sequence number so the replay/live hand-off can be cut exactly at
//! the point a subscriber went live.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use herald_core::{DomainEvent, EventFilter};
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::Instant;

use super::subscription::SubscriberQueue;

/// Bound on retained history; oldest entries are evicted first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayLimit {
    /// Keep the newest `n` events
    Count(usize),
    /// Keep events younger than this
    MaxAge(Duration),
}

impl Default for ReplayLimit {
    fn default() -> Self {
        Self::MaxAge(Duration::from_secs(120))
    }
}

#[derive(Debug)]
struct ReplayEntry {
    seq: u64,
    inserted_at: Instant,
    event: Arc<DomainEvent>,
}

#[derive(Debug)]
pub(crate) struct ReplayBuffer {
    entries: RwLock<VecDeque<ReplayEntry>>,
    limit: ReplayLimit,
    /// One past the highest sequence whose replay admission is settled
    processed: watch::Sender<u64>,
}

impl ReplayBuffer {
    pub fn new(limit: ReplayLimit) -> Self {
        let (processed, _) = watch::channel(0);
        Self {
            entries: RwLock::new(VecDeque::new()),
            limit,
            processed,
        }
    }

    pub fn push(&self, seq: u64, event: Arc<DomainEvent>) {
        let mut entries = self.entries.write();
        entries.push_back(ReplayEntry {
            seq,
            inserted_at: Instant::now(),
            event,
        });
        self.evict(&mut entries);
    }

    /// Record that event `seq` will never be added later
    pub fn mark_processed(&self, seq: u64) {
        self.processed.send_replace(seq + 1);
    }

    /// Events older than `before` that pass `filter`, oldest first
    pub fn snapshot_before(&self, before: u64, filter: &EventFilter) -> Vec<Arc<DomainEvent>> {
        let mut entries = self.entries.write();
        self.evict(&mut entries);
        entries
            .iter()
            .filter(|entry| entry.seq < before && filter.matches(entry.event.kind()))
            .map(|entry| entry.event.clone())
            .collect()
    }

    /// Wait until every sequence below `before` is settled, or `quiescence` passes
    pub async fn settle(&self, before: u64, quiescence: Duration) {
        let mut processed = self.processed.subscribe();
        if *processed.borrow() >= before {
            return;
        }
        if tokio::time::timeout(quiescence, processed.wait_for(|seq| *seq >= before))
            .await
            .is_err()
        {
            tracing::trace!(before, "Replay boundary not settled within quiescence window");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn evict(&self, entries: &mut VecDeque<ReplayEntry>) {
        match self.limit {
            ReplayLimit::Count(n) => {
                while entries.len() > n {
                    entries.pop_front();
                }
            }
            ReplayLimit::MaxAge(max_age) => {
                let now = Instant::now();
                while entries
                    .front()
                    .is_some_and(|entry| now.duration_since(entry.inserted_at) > max_age)
                {
                    entries.pop_front();
                }
            }
        }
    }
}

/// Replayed history below `live_from`, then the live queue
pub(crate) fn replay_then_live(
    buffer: Arc<ReplayBuffer>,
    live_from: u64,
    filter: EventFilter,
    queue: Arc<SubscriberQueue>,
    quiescence: Duration,
) -> BoxStream<'static, Arc<DomainEvent>> {
    let replay = stream::once(async move {
        buffer.settle(live_from, quiescence).await;
        stream::iter(buffer.snapshot_before(live_from, &filter))
    })
    .flatten();

    replay.chain(queue.into_stream()).boxed()
}
