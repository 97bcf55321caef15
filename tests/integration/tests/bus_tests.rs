//! Event bus integration tests
//!
//! Exercises every backend through the public `EventBus` contract.
//!
//! Run with: cargo test -p integration-tests --test bus_tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use herald_common::BusBackend;
use herald_core::{EventFilter, EventKind};
use herald_dispatch::bus::{
    default_replay_filter, BusError, Capacity, DirectBroadcastBus, DiscardHook, DiscardReason,
    EmitResult, EventBus, EventBusBuilder, EventBusExt, OverflowPolicy, ReplayLimit,
    ReplayState, ReplayUntilSubscribedBus, ReplayWindowBus, ResilientSinkBus, Scheduler,
    StopTrigger,
};
use integration_tests::*;
use parking_lot::Mutex;
use tokio::sync::Notify;

fn until_notified(notify: &Arc<Notify>) -> ReplayUntilSubscribedBus {
    ReplayUntilSubscribedBus::new(
        Scheduler::current().unwrap(),
        OverflowPolicy::Buffer,
        Capacity::Unbounded,
        ReplayLimit::Count(100),
        default_replay_filter(),
        StopTrigger::notified(notify.clone()),
        Duration::from_millis(1),
        None,
    )
}

// ============================================================================
// Ordering and delivery
// ============================================================================

#[tokio::test]
async fn test_every_backend_preserves_order() {
    for backend in ALL_BACKENDS {
        let bus = EventBusBuilder::new(backend).build().unwrap();
        let mut stream = bus.subscribe(EventFilter::All);

        for n in 1..=200 {
            bus.publish(numbered(n)).unwrap();
        }

        let received: Vec<u32> = take_n(&mut stream, 200)
            .await
            .unwrap()
            .iter()
            .filter_map(|event| number_of(event))
            .collect();
        assert_eq!(received, (1..=200).collect::<Vec<_>>(), "backend {}", backend.as_str());
        bus.shutdown();
    }
}

#[tokio::test]
async fn test_no_loss_while_subscribed() {
    let bus = Arc::new(DirectBroadcastBus::with_defaults().unwrap());
    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let mut stream = bus.subscribe(EventFilter::All);
            tokio::spawn(async move { take_n(&mut stream, 5_000).await })
        })
        .collect();

    for n in 1..=5_000 {
        bus.publish(numbered(n)).unwrap();
        if n % 250 == 0 {
            tokio::task::yield_now().await;
        }
    }

    for consumer in consumers {
        let events = consumer.await.unwrap().unwrap();
        let numbers: Vec<u32> = events.iter().filter_map(|e| number_of(e)).collect();
        assert_eq!(numbers, (1..=5_000).collect::<Vec<_>>());
    }
    let stats = bus.stats();
    assert_eq!(stats.published, 5_000);
    assert_eq!(stats.delivered, 15_000);
    assert_eq!(stats.dropped, 0);
}

#[tokio::test]
async fn test_filtered_subscriptions_are_independent() {
    let bus = DirectBroadcastBus::with_defaults().unwrap();
    let mut lifecycle = bus.subscribe(EventKind::Reconnected);
    let mut channel = bus.subscribe(EventKind::TypingStart);

    bus.publish(numbered(1)).unwrap();
    bus.publish(typing(2)).unwrap();
    bus.publish(numbered(3)).unwrap();

    let numbers: Vec<u32> = take_n(&mut lifecycle, 2)
        .await
        .unwrap()
        .iter()
        .filter_map(|e| number_of(e))
        .collect();
    assert_eq!(numbers, vec![1, 3]);
    assert_eq!(take_n(&mut channel, 1).await.unwrap()[0].kind(), EventKind::TypingStart);
    assert!(stays_quiet(&mut channel, Duration::from_millis(50)).await);
}

// ============================================================================
// Replay
// ============================================================================

#[tokio::test]
async fn test_late_subscriber_gets_replay_then_live() {
    let bus = EventBusBuilder::new(BusBackend::ReplayUntilSubscribed)
        .build()
        .unwrap();

    for n in 1..=5 {
        bus.publish(numbered(n)).unwrap();
        bus.publish(typing(u64::from(n))).unwrap();
    }

    let mut stream = bus.subscribe(EventFilter::All);
    let replayed: Vec<u32> = take_n(&mut stream, 5)
        .await
        .unwrap()
        .iter()
        .filter_map(|e| number_of(e))
        .collect();
    assert_eq!(replayed, vec![1, 2, 3, 4, 5]);

    bus.publish(typing(9)).unwrap();
    bus.publish(numbered(6)).unwrap();
    let live = take_n(&mut stream, 2).await.unwrap();
    assert_eq!(live[0].kind(), EventKind::TypingStart);
    assert_eq!(number_of(&live[1]), Some(6));
}

#[tokio::test]
async fn test_replay_window_keeps_most_recent() {
    let bus = ReplayWindowBus::with_limit(ReplayLimit::Count(10)).unwrap();
    for n in 1..=25 {
        bus.publish(numbered(n)).unwrap();
    }
    assert_eq!(bus.replay_len(), 10);

    let mut first = bus.subscribe(EventFilter::All);
    let mut second = bus.subscribe(EventFilter::All);
    bus.publish(numbered(26)).unwrap();

    for stream in [&mut first, &mut second] {
        let numbers: Vec<u32> = take_n(stream, 11)
            .await
            .unwrap()
            .iter()
            .filter_map(|e| number_of(e))
            .collect();
        assert_eq!(numbers, (16..=26).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_replay_window_age_limit() {
    let bus = ReplayWindowBus::with_limit(ReplayLimit::MaxAge(Duration::from_millis(50))).unwrap();
    bus.publish(numbered(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    bus.publish(numbered(2)).unwrap();

    let mut stream = bus.subscribe(EventFilter::All);
    let replayed = take_n(&mut stream, 1).await.unwrap();
    assert_eq!(number_of(&replayed[0]), Some(2));
    assert!(stays_quiet(&mut stream, Duration::from_millis(50)).await);
}

#[tokio::test]
async fn test_buffered_backlog_goes_to_first_subscriber_only() {
    let bus = EventBusBuilder::new(BusBackend::Buffered).build().unwrap();
    for n in 1..=3 {
        bus.publish(numbered(n)).unwrap();
    }

    let mut first = bus.subscribe(EventFilter::All);
    let mut second = bus.subscribe(EventFilter::All);
    bus.publish(numbered(4)).unwrap();

    let numbers: Vec<u32> = take_n(&mut first, 4)
        .await
        .unwrap()
        .iter()
        .filter_map(|e| number_of(e))
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert_eq!(number_of(&take_n(&mut second, 1).await.unwrap()[0]), Some(4));
}

// ============================================================================
// Replay state machine
// ============================================================================

#[tokio::test]
async fn test_replay_state_machine() {
    let notify = Arc::new(Notify::new());
    let bus = until_notified(&notify);
    assert_eq!(bus.state(), ReplayState::Replaying);

    bus.publish(numbered(1)).unwrap();
    assert_eq!(bus.replay_len(), 1);

    let mut stream = bus.subscribe(EventFilter::All);
    assert_eq!(bus.state(), ReplayState::ReplayingAndLive);
    assert_eq!(number_of(&take_n(&mut stream, 1).await.unwrap()[0]), Some(1));

    notify.notify_one();
    assert!(eventually(|| bus.state() == ReplayState::Live).await);

    // Live: delivered but not retained
    bus.publish(numbered(2)).unwrap();
    assert_eq!(number_of(&take_n(&mut stream, 1).await.unwrap()[0]), Some(2));
    let retained = bus.replay_len();

    drop(stream);
    assert_eq!(bus.subscriber_count(), 0);
    assert_eq!(bus.state(), ReplayState::Replaying);

    bus.publish(numbered(3)).unwrap();
    assert_eq!(bus.replay_len(), retained + 1);

    let mut again = bus.subscribe(EventFilter::All);
    assert_eq!(bus.state(), ReplayState::ReplayingAndLive);
    let numbers: Vec<u32> = take_n(&mut again, retained + 1)
        .await
        .unwrap()
        .iter()
        .filter_map(|e| number_of(e))
        .collect();
    assert_eq!(numbers.last(), Some(&3));
    assert!(!numbers.contains(&2));
}

#[tokio::test]
async fn test_delay_trigger_goes_live() {
    let bus = EventBusBuilder::new(BusBackend::ReplayUntilSubscribed)
        .stop_replaying(StopTrigger::Delay(Duration::from_millis(20)))
        .build()
        .unwrap();
    let _stream = bus.subscribe(EventFilter::All);
    assert_eq!(bus.subscriber_count(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    bus.publish(numbered(1)).unwrap();

    // Live events are not kept for the next subscriber
    let mut late = bus.subscribe(EventFilter::All);
    assert!(stays_quiet(&mut late, Duration::from_millis(50)).await);
}

// ============================================================================
// Fault isolation
// ============================================================================

#[tokio::test]
async fn test_failing_handlers_do_not_affect_others() {
    let bus = DirectBroadcastBus::with_defaults().unwrap();
    let failures = Arc::new(AtomicUsize::new(0));

    let failing = {
        let failures = failures.clone();
        bus.subscribe_with(EventFilter::All, move |_event| {
            failures.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(anyhow::anyhow!("handler always fails")) }
        })
    };
    let panicking = bus.subscribe_with(EventFilter::All, |event| async move {
        if number_of(&event).is_some() {
            panic!("handler always panics");
        }
        Ok(())
    });
    let mut healthy = bus.subscribe_with(EventFilter::All, |event| async move {
        Ok(number_of(&event))
    });

    for n in 1..=1_000 {
        bus.publish(numbered(n)).unwrap();
    }

    let numbers: Vec<u32> = take_n(&mut healthy, 1_000)
        .await
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(numbers, (1..=1_000).collect::<Vec<_>>());
    assert!(eventually(|| failures.load(Ordering::SeqCst) == 1_000).await);
    assert_eq!(bus.subscriber_count(), 3);

    drop(failing);
    drop(panicking);
}

// ============================================================================
// Overflow
// ============================================================================

#[tokio::test]
async fn test_drop_latest_keeps_capacity_and_reports_rest() {
    const CAPACITY: usize = 3;
    let log = DiscardLog::default();
    let bus = DirectBroadcastBus::new(
        Scheduler::current().unwrap(),
        OverflowPolicy::DropLatest,
        Capacity::Bounded(CAPACITY),
        Some(log.hook()),
    );
    let stream = bus.subscribe(EventFilter::All);

    for n in 1..=u32::try_from(CAPACITY + 5).unwrap() {
        bus.publish(numbered(n)).unwrap();
    }
    assert_eq!(log.count(DiscardReason::Overflow), 5);
    assert_eq!(bus.stats().dropped, 5);
    let dropped: Vec<u32> = log.events().iter().filter_map(|e| number_of(e)).collect();
    assert_eq!(dropped, vec![4, 5, 6, 7, 8]);

    bus.shutdown();
    let retained: Vec<u32> = drain(stream)
        .await
        .unwrap()
        .iter()
        .filter_map(|e| number_of(e))
        .collect();
    assert_eq!(retained, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_drop_oldest_keeps_newest() {
    let bus = DirectBroadcastBus::new(
        Scheduler::current().unwrap(),
        OverflowPolicy::DropOldest,
        Capacity::Bounded(2),
        None,
    );
    let stream = bus.subscribe(EventFilter::All);
    for n in 1..=5 {
        bus.publish(numbered(n)).unwrap();
    }
    bus.shutdown();

    let retained: Vec<u32> = drain(stream)
        .await
        .unwrap()
        .iter()
        .filter_map(|e| number_of(e))
        .collect();
    assert_eq!(retained, vec![4, 5]);
    assert_eq!(bus.stats().dropped, 3);
}

#[tokio::test]
async fn test_error_policy_fails_the_bus() {
    let bus = DirectBroadcastBus::new(
        Scheduler::current().unwrap(),
        OverflowPolicy::Error,
        Capacity::Bounded(1),
        None,
    );
    let stream = bus.subscribe(EventFilter::All);

    bus.publish(numbered(1)).unwrap();
    let err = bus.publish(numbered(2)).unwrap_err();
    assert!(matches!(err, BusError::Overflow { capacity: 1, .. }));
    assert!(bus.is_shutdown());
    assert!(bus.publish(numbered(3)).is_err());

    // Queued events still reach the subscriber before it completes
    let delivered: Vec<u32> = drain(stream)
        .await
        .unwrap()
        .iter()
        .filter_map(|e| number_of(e))
        .collect();
    assert_eq!(delivered, vec![1]);
}

#[tokio::test]
async fn test_resilient_classifies_emissions() {
    let bus = ResilientSinkBus::new(
        Scheduler::current().unwrap(),
        OverflowPolicy::DropLatest,
        Capacity::Bounded(1),
        None,
    );
    assert_eq!(bus.emit(numbered(1)), EmitResult::FailZeroSubscriber);

    let _stream = bus.subscribe(EventFilter::All);
    assert_eq!(bus.emit(numbered(2)), EmitResult::Ok);
    assert_eq!(bus.emit(numbered(3)), EmitResult::FailOverflow);
    assert!(bus.publish(numbered(4)).is_ok());

    bus.shutdown();
    assert_eq!(bus.emit(numbered(5)), EmitResult::FailTerminated);
}

// ============================================================================
// Emission and shutdown
// ============================================================================

#[tokio::test]
async fn test_reentrant_publish_is_rejected() {
    let bus: Arc<OnceLock<Arc<dyn EventBus>>> = Arc::new(OnceLock::new());
    let nested = Arc::new(Mutex::new(None));

    let hook = {
        let bus = bus.clone();
        let nested = nested.clone();
        DiscardHook::new(move |_event, reason| {
            if reason == DiscardReason::NoSubscriber {
                if let Some(bus) = bus.get() {
                    *nested.lock() = Some(bus.publish(numbered(99)));
                }
            }
        })
    };
    let built = EventBusBuilder::new(BusBackend::Direct)
        .discard_hook(hook)
        .build()
        .unwrap();
    let _ = bus.set(built.clone());

    assert!(built.publish(numbered(1)).is_ok());
    let nested = nested.lock().take().unwrap();
    assert!(matches!(nested, Err(BusError::NonSerializedEmission { bus: "direct" })));

    // The rejected emission leaves the bus usable
    let mut stream = built.subscribe(EventFilter::All);
    built.publish(numbered(2)).unwrap();
    assert_eq!(number_of(&take_n(&mut stream, 1).await.unwrap()[0]), Some(2));
}

#[tokio::test]
async fn test_shutdown_completes_every_backend() {
    for backend in ALL_BACKENDS {
        let log = DiscardLog::default();
        let bus = EventBusBuilder::new(backend)
            .discard_hook(log.hook())
            .build()
            .unwrap();
        let first = bus.subscribe(EventFilter::All);
        let second = bus.subscribe(EventKind::Reconnected);

        bus.publish(numbered(1)).unwrap();
        bus.shutdown();
        bus.shutdown();
        assert!(bus.is_shutdown(), "backend {}", backend.as_str());

        assert_eq!(drain(first).await.unwrap().len(), 1);
        assert_eq!(drain(second).await.unwrap().len(), 1);

        bus.publish(numbered(2)).unwrap();
        assert_eq!(log.count(DiscardReason::Terminated), 1, "backend {}", backend.as_str());

        let late = bus.subscribe(EventFilter::All);
        assert!(drain(late).await.unwrap().is_empty());
    }
}
