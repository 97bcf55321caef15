//! Replay-until-subscribed bus
//!
//! Holds events in a replay buffer only while nobody is consuming them live.
//! The first subscriber receives the buffered history followed by live
//! events; a "stop replaying" trigger then ends buffering. When every
//! subscriber has gone the bus starts buffering again.
//!
//! ```text
//!  Replaying --(subscriber attached)--> ReplayingAndLive
//!      ^                                      |
//!      |                           (stop trigger ends)
//!      |                                      v
//!      +-------(no subscriber left)-------- Live
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use herald_core::{DomainEvent, EventFilter, EventKind};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::error::BusResult;
use super::event_bus::EventBus;
use super::multicast::{LiveStart, Multicast};
use super::overflow::{Capacity, OverflowPolicy};
use super::replay_buffer::{replay_then_live, ReplayBuffer, ReplayLimit};
use super::scheduler::Scheduler;
use super::stats::{BusStatsSnapshot, DiscardHook, Instrumentation};
use super::subscription::EventStream;

const NAME: &str = "replay-until-subscribed";

/// Default delay before a fresh subscription stops replay buffering
pub const DEFAULT_STOP_REPLAYING_AFTER: Duration = Duration::from_secs(5);

// ============================================================================
// Replay state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReplayState {
    /// Nobody attached; matching events are buffered
    Replaying = 0,
    /// Subscribers attached, events buffered and delivered live
    ReplayingAndLive = 1,
    /// Live delivery only
    Live = 2,
}

impl ReplayState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Replaying => "REPLAYING",
            Self::ReplayingAndLive => "REPLAYING_AND_LIVE",
            Self::Live => "LIVE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Replaying,
            1 => Self::ReplayingAndLive,
            _ => Self::Live,
        }
    }
}

impl fmt::Display for ReplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared by the bus, its stop-trigger task and subscription guards
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(ReplayState::Replaying as u8))
    }

    fn load(&self) -> ReplayState {
        ReplayState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn transition(&self, from: ReplayState, to: ReplayState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn store(&self, state: ReplayState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// `Live -> Replaying` once nobody consumes live events
    fn resume_replaying(&self) -> bool {
        let resumed = self.transition(ReplayState::Live, ReplayState::Replaying);
        if resumed {
            tracing::warn!(bus = NAME, "All subscribers have disconnected, replaying resumed");
        }
        resumed
    }
}

/// Sets the state to `Live` however the stop trigger ends, abort included
struct GoLive(Arc<StateCell>);

impl Drop for GoLive {
    fn drop(&mut self) {
        self.0.store(ReplayState::Live);
        tracing::debug!(bus = NAME, "Replay phase finished, bus is live");
    }
}

// ============================================================================
// Stop trigger
// ============================================================================

type SignalFn = dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// What ends the replay phase after the first subscriber attaches
#[derive(Clone)]
pub enum StopTrigger {
    /// Fixed delay after the subscriber attached
    Delay(Duration),
    /// Caller-supplied completion signal, started once per transition
    Signal(Arc<SignalFn>),
}

impl StopTrigger {
    pub fn signal<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Signal(Arc::new(move || f().boxed()))
    }

    /// Completes on the next `notify_one` of `notify`
    pub fn notified(notify: Arc<Notify>) -> Self {
        Self::signal(move || {
            let notify = notify.clone();
            async move {
                notify.notified().await;
                Ok(())
            }
        })
    }

    async fn wait(&self) -> anyhow::Result<()> {
        match self {
            Self::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            Self::Signal(signal) => signal().await,
        }
    }
}

impl Default for StopTrigger {
    fn default() -> Self {
        Self::Delay(DEFAULT_STOP_REPLAYING_AFTER)
    }
}

impl fmt::Debug for StopTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delay(delay) => f.debug_tuple("Delay").field(delay).finish(),
            Self::Signal(_) => f.write_str("Signal"),
        }
    }
}

/// Lifecycle events plus `GuildCreate`, the state a fresh consumer needs
pub fn default_replay_filter() -> EventFilter {
    EventFilter::kinds([
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::ReconnectStarted,
        EventKind::Reconnected,
        EventKind::ReconnectFailed,
        EventKind::Ready,
        EventKind::Resumed,
        EventKind::GuildCreate,
    ])
}

// ============================================================================
// Bus
// ============================================================================

pub struct ReplayUntilSubscribedBus {
    multicast: Arc<Multicast>,
    buffer: Arc<ReplayBuffer>,
    state: Arc<StateCell>,
    replay_filter: EventFilter,
    stop_trigger: StopTrigger,
    trigger_task: Mutex<Option<JoinHandle<()>>>,
    quiescence: Duration,
    scheduler: Scheduler,
}

impl ReplayUntilSubscribedBus {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scheduler: Scheduler,
        policy: OverflowPolicy,
        capacity: Capacity,
        limit: ReplayLimit,
        replay_filter: EventFilter,
        stop_trigger: StopTrigger,
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
            state: Arc::new(StateCell::new()),
            replay_filter,
            stop_trigger,
            trigger_task: Mutex::new(None),
            quiescence,
            scheduler,
        }
    }

    /// Lifecycle and guild-create replay for two minutes, stopping 5s after subscribe
    pub fn with_defaults() -> BusResult<Self> {
        Ok(Self::new(
            Scheduler::current()?,
            OverflowPolicy::Buffer,
            Capacity::Unbounded,
            ReplayLimit::default(),
            default_replay_filter(),
            StopTrigger::default(),
            Duration::from_millis(1),
            None,
        ))
    }

    pub fn state(&self) -> ReplayState {
        self.state.load()
    }

    /// Events currently held for replay
    pub fn replay_len(&self) -> usize {
        self.buffer.len()
    }

    /// `Replaying -> ReplayingAndLive`, starting the stop trigger exactly once per transition
    fn begin_live(&self) {
        if !self
            .state
            .transition(ReplayState::Replaying, ReplayState::ReplayingAndLive)
        {
            return;
        }

        tracing::debug!(bus = NAME, trigger = ?self.stop_trigger, "Subscriber attached, stop trigger started");
        let live = GoLive(self.state.clone());
        let trigger = self.stop_trigger.clone();
        let task = self.scheduler.spawn(async move {
            let _live = live;
            if let Err(err) = trigger.wait().await {
                tracing::warn!(bus = NAME, error = %err, "Stop-replaying trigger failed");
            }
        });

        if let Some(previous) = self.trigger_task.lock().replace(task) {
            previous.abort();
        }
    }

    fn abort_trigger(&self) {
        if let Some(task) = self.trigger_task.lock().take() {
            task.abort();
        }
    }
}

impl EventBus for ReplayUntilSubscribedBus {
    fn publish(&self, event: DomainEvent) -> BusResult<()> {
        let Some(_emission) = self.multicast.begin_publish(&event)? else {
            return Ok(());
        };
        let event = Arc::new(event);
        let seq = self.multicast.next_sequence();
        let admitted = self.replay_filter.matches(event.kind());

        if admitted && self.state.load() != ReplayState::Live {
            self.buffer.push(seq, event.clone());
        }

        let attached = !self.multicast.is_empty();
        if !attached && self.state.resume_replaying() && admitted {
            self.buffer.push(seq, event.clone());
        }
        self.buffer.mark_processed(seq);

        if attached {
            self.begin_live();
        }
        // A subscription registered since the check is pending and will replay `seq` or claim it
        self.multicast.fanout(seq, &event)?;
        Ok(())
    }

    fn subscribe_filter(&self, filter: EventFilter) -> EventStream {
        let subscriber = self.multicast.attach(filter, LiveStart::Pending);
        let live_from = self
            .multicast
            .claim_live_from(&subscriber, self.multicast.peek_sequence());
        if self.multicast.is_running() {
            self.begin_live();
        }

        tracing::debug!(
            bus = NAME,
            subscription = %subscriber.id,
            filter = %subscriber.filter,
            state = %self.state(),
            live_from,
            "Replaying subscription created"
        );

        let state = self.state.clone();
        let guard = self.multicast.detach_guard(subscriber.id, move |remaining| {
            if remaining == 0 {
                state.resume_replaying();
            }
        });
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
            self.abort_trigger();
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

impl Drop for ReplayUntilSubscribedBus {
    fn drop(&mut self) {
        self.multicast.terminate();
        self.abort_trigger();
    }
}

impl fmt::Debug for ReplayUntilSubscribedBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayUntilSubscribedBus")
            .field("multicast", &self.multicast)
            .field("state", &self.state())
            .field("replay_len", &self.buffer.len())
            .field("stop_trigger", &self.stop_trigger)
            .finish()
    }
}
