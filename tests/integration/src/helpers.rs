//! Stream and bus helpers for integration tests

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use herald_core::DomainEvent;
use herald_dispatch::bus::{DiscardHook, DiscardReason};
use parking_lot::Mutex;

/// Upper bound for anything a test waits on
pub const WAIT: Duration = Duration::from_secs(5);

/// Collect exactly `n` items, failing if they do not arrive within `WAIT`
pub async fn take_n<S, T>(stream: &mut S, n: usize) -> Result<Vec<T>>
where
    S: Stream<Item = T> + Unpin,
{
    let mut items = Vec::with_capacity(n);
    while items.len() < n {
        let item = tokio::time::timeout(WAIT, stream.next())
            .await
            .with_context(|| format!("Timed out after {} of {n} items", items.len()))?
            .with_context(|| format!("Stream ended after {} of {n} items", items.len()))?;
        items.push(item);
    }
    Ok(items)
}

/// Drain a stream that is expected to complete
pub async fn drain<S, T>(stream: S) -> Result<Vec<T>>
where
    S: Stream<Item = T>,
{
    tokio::time::timeout(WAIT, stream.collect::<Vec<_>>())
        .await
        .context("Stream did not complete")
}

/// True if nothing arrives within `within`
pub async fn stays_quiet<S, T>(stream: &mut S, within: Duration) -> bool
where
    S: Stream<Item = T> + Unpin,
{
    tokio::time::timeout(within, stream.next()).await.is_err()
}

/// Poll `check` until it holds or `WAIT` elapses
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// Discard hook that records every discarded event
#[derive(Clone, Default)]
pub struct DiscardLog {
    entries: Arc<Mutex<Vec<(Arc<DomainEvent>, DiscardReason)>>>,
}

impl DiscardLog {
    pub fn hook(&self) -> DiscardHook {
        let entries = self.entries.clone();
        DiscardHook::new(move |event, reason| {
            entries.lock().push((Arc::new(event.clone()), reason));
        })
    }

    pub fn count(&self, reason: DiscardReason) -> usize {
        self.entries.lock().iter().filter(|(_, r)| *r == reason).count()
    }

    pub fn events(&self) -> Vec<Arc<DomainEvent>> {
        self.entries.lock().iter().map(|(event, _)| event.clone()).collect()
    }
}
