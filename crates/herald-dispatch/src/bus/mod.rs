//! Event buses
//!
//! Five interchangeable backends behind the [`EventBus`] contract:
//! - [`DirectBroadcastBus`]: plain multicast, no history
//! - [`BufferedEmitterBus`]: per-subscriber queues plus a warm-up backlog
//! - [`ReplayWindowBus`]: bounded history replayed to every subscriber
//! - [`ReplayUntilSubscribedBus`]: history held only until someone consumes live
//! - [`ResilientSinkBus`]: classified emission that never fails the publisher

mod buffered;
mod direct;
mod error;
mod event_bus;
mod factory;
mod multicast;
mod overflow;
mod replay_buffer;
mod replay_until_subscribed;
mod replay_window;
mod resilient;
mod scheduler;
mod stats;
mod subscription;

pub use buffered::{BufferedEmitterBus, DEFAULT_WARMUP_CAPACITY};
pub use direct::DirectBroadcastBus;
pub use error::{BusError, BusResult};
pub use event_bus::{EventBus, EventBusExt, HandledStream};
pub use factory::{bus_from_config, overflow_policy, EventBusBuilder};
pub use overflow::{Capacity, DiscardReason, EmitResult, OverflowPolicy, RetryPolicy};
pub use replay_buffer::ReplayLimit;
pub use replay_until_subscribed::{
    default_replay_filter, ReplayState, ReplayUntilSubscribedBus, StopTrigger,
    DEFAULT_STOP_REPLAYING_AFTER,
};
pub use replay_window::ReplayWindowBus;
pub use resilient::ResilientSinkBus;
pub use scheduler::Scheduler;
pub use stats::{BusStats, BusStatsSnapshot, DiscardHook};
pub use subscription::{EventStream, SubscriptionId};
