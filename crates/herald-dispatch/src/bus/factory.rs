//! Bus construction
//!
//! `EventBusBuilder` assembles any backend from `BusConfig` plus the options
//! that cannot come from the environment (scheduler, hook, replay filter,
//! stop trigger).

use std::sync::Arc;
use std::time::Duration;

use herald_common::{BusBackend, BusConfig, OverflowStrategy, ReplayLimitSetting};
use herald_core::EventFilter;

use super::buffered::{BufferedEmitterBus, DEFAULT_WARMUP_CAPACITY};
use super::direct::DirectBroadcastBus;
use super::error::BusResult;
use super::event_bus::EventBus;
use super::overflow::{Capacity, OverflowPolicy, RetryPolicy};
use super::replay_buffer::ReplayLimit;
use super::replay_until_subscribed::{default_replay_filter, ReplayUntilSubscribedBus, StopTrigger};
use super::replay_window::ReplayWindowBus;
use super::resilient::ResilientSinkBus;
use super::scheduler::Scheduler;
use super::stats::DiscardHook;

/// Thread name prefix of a dedicated scheduler
const SCHEDULER_NAME: &str = "herald-events";

/// Map the configured strategy onto a policy
pub fn overflow_policy(config: &BusConfig) -> OverflowPolicy {
    match config.overflow {
        OverflowStrategy::Buffer => OverflowPolicy::Buffer,
        OverflowStrategy::Drop => OverflowPolicy::DropLatest,
        OverflowStrategy::DropOldest => OverflowPolicy::DropOldest,
        OverflowStrategy::Error => OverflowPolicy::Error,
        OverflowStrategy::FailFastRetry => OverflowPolicy::FailFastRetry(RetryPolicy::new(
            config.retry_attempts,
            config.retry_spin,
        )),
    }
}

impl From<ReplayLimitSetting> for ReplayLimit {
    fn from(setting: ReplayLimitSetting) -> Self {
        match setting {
            ReplayLimitSetting::Count(n) => Self::Count(n),
            ReplayLimitSetting::MaxAge(age) => Self::MaxAge(age),
        }
    }
}

/// Builder for any bus backend
#[derive(Debug, Clone)]
pub struct EventBusBuilder {
    backend: BusBackend,
    policy: OverflowPolicy,
    capacity: Capacity,
    scheduler: Option<Scheduler>,
    scheduler_threads: usize,
    hook: Option<DiscardHook>,
    replay_filter: Option<EventFilter>,
    replay_limit: ReplayLimit,
    quiescence: Duration,
    stop_trigger: StopTrigger,
    warmup_capacity: usize,
}

impl EventBusBuilder {
    pub fn new(backend: BusBackend) -> Self {
        Self {
            backend,
            policy: OverflowPolicy::default(),
            capacity: Capacity::Unbounded,
            scheduler: None,
            scheduler_threads: 0,
            hook: None,
            replay_filter: None,
            replay_limit: ReplayLimit::default(),
            quiescence: Duration::from_millis(1),
            stop_trigger: StopTrigger::default(),
            warmup_capacity: DEFAULT_WARMUP_CAPACITY,
        }
    }

    /// Builder preloaded from environment-derived configuration
    pub fn from_config(config: &BusConfig) -> Self {
        Self::new(config.backend)
            .overflow(overflow_policy(config))
            .capacity(Capacity::from_option(config.capacity))
            .scheduler_threads(config.scheduler_threads)
            .replay_limit(config.replay_limit.into())
            .replay_quiescence(config.replay_quiescence)
            .stop_replaying(StopTrigger::Delay(config.stop_replaying_after))
    }

    #[must_use]
    pub fn overflow(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Run subscriptions on this scheduler instead of building one
    #[must_use]
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Worker threads of a dedicated scheduler, `0` for the current runtime
    #[must_use]
    pub fn scheduler_threads(mut self, threads: usize) -> Self {
        self.scheduler_threads = threads;
        self
    }

    #[must_use]
    pub fn discard_hook(mut self, hook: DiscardHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Events admitted to the replay buffer
    #[must_use]
    pub fn replay_filter(mut self, filter: impl Into<EventFilter>) -> Self {
        self.replay_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn replay_limit(mut self, limit: ReplayLimit) -> Self {
        self.replay_limit = limit;
        self
    }

    #[must_use]
    pub fn replay_quiescence(mut self, window: Duration) -> Self {
        self.quiescence = window;
        self
    }

    #[must_use]
    pub fn stop_replaying(mut self, trigger: StopTrigger) -> Self {
        self.stop_trigger = trigger;
        self
    }

    /// Events held by the buffered backend while nobody is subscribed
    #[must_use]
    pub fn warmup_capacity(mut self, capacity: usize) -> Self {
        self.warmup_capacity = capacity;
        self
    }

    fn resolve_scheduler(&self) -> BusResult<Scheduler> {
        match &self.scheduler {
            Some(scheduler) => Ok(scheduler.clone()),
            None if self.scheduler_threads > 0 => {
                Scheduler::dedicated(SCHEDULER_NAME, self.scheduler_threads)
            }
            None => Scheduler::current(),
        }
    }

    pub fn build(self) -> BusResult<Arc<dyn EventBus>> {
        let scheduler = self.resolve_scheduler()?;

        tracing::info!(
            backend = self.backend.as_str(),
            policy = %self.policy,
            capacity = self.capacity.limit(),
            scheduler = scheduler.name(),
            "Building event bus"
        );

        let bus: Arc<dyn EventBus> = match self.backend {
            BusBackend::Direct => Arc::new(DirectBroadcastBus::new(
                scheduler,
                self.policy,
                self.capacity,
                self.hook,
            )),
            BusBackend::Buffered => Arc::new(BufferedEmitterBus::new(
                scheduler,
                self.policy,
                self.capacity,
                self.warmup_capacity,
                self.hook,
            )),
            BusBackend::ReplayWindow => Arc::new(ReplayWindowBus::new(
                scheduler,
                self.policy,
                self.capacity,
                self.replay_limit,
                self.replay_filter.unwrap_or_default(),
                self.quiescence,
                self.hook,
            )),
            BusBackend::ReplayUntilSubscribed => Arc::new(ReplayUntilSubscribedBus::new(
                scheduler,
                self.policy,
                self.capacity,
                self.replay_limit,
                self.replay_filter.unwrap_or_else(default_replay_filter),
                self.stop_trigger,
                self.quiescence,
                self.hook,
            )),
            BusBackend::Resilient => Arc::new(ResilientSinkBus::new(
                scheduler,
                self.policy,
                self.capacity,
                self.hook,
            )),
        };
        Ok(bus)
    }
}

/// Build the bus described by `config` on the current runtime or a dedicated one
pub fn bus_from_config(config: &BusConfig) -> BusResult<Arc<dyn EventBus>> {
    EventBusBuilder::from_config(config).build()
}
