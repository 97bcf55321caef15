//! Cross-thread event bus tests
//!
//! Publishers run on plain OS threads, the way a gateway connection thread
//! feeds the bus, while subscribers are polled on a multi-thread runtime.
//!
//! Run with: cargo test -p integration-tests --test concurrency_tests

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use herald_common::BusBackend;
use herald_core::EventFilter;
use herald_dispatch::bus::{
    default_replay_filter, BusError, Capacity, DirectBroadcastBus, EventBus, EventBusBuilder,
    EventBusExt, OverflowPolicy, ReplayLimit, ReplayUntilSubscribedBus, Scheduler, StopTrigger,
};
use integration_tests::*;

fn numbers(events: &[Arc<herald_core::DomainEvent>]) -> Vec<u32> {
    events.iter().filter_map(|event| number_of(event)).collect()
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_publisher_thread_preserves_order_on_every_backend() {
    const COUNT: u32 = 5_000;

    for backend in ALL_BACKENDS {
        let bus = EventBusBuilder::new(backend).build().unwrap();
        let mut stream = bus.subscribe(EventFilter::All);

        let publisher = {
            let bus = bus.clone();
            thread::spawn(move || {
                for n in 1..=COUNT {
                    bus.publish(numbered(n)).unwrap();
                }
            })
        };

        let received = take_n(&mut stream, COUNT as usize).await.unwrap();
        publisher.join().unwrap();

        assert_eq!(
            numbers(&received),
            (1..=COUNT).collect::<Vec<_>>(),
            "backend {}",
            backend.as_str()
        );
        bus.shutdown();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_buffered_backlog_stays_ahead_of_live_events() {
    const BACKLOG: u32 = 20_000;
    const LIVE: u32 = 200;

    for _ in 0..10 {
        let bus = EventBusBuilder::new(BusBackend::Buffered)
            .warmup_capacity(BACKLOG as usize)
            .build()
            .unwrap();
        for n in 1..=BACKLOG {
            bus.publish(numbered(n)).unwrap();
        }

        let publisher = {
            let bus = bus.clone();
            thread::spawn(move || {
                while bus.subscriber_count() == 0 {
                    std::hint::spin_loop();
                }
                for n in BACKLOG + 1..=BACKLOG + LIVE {
                    bus.publish(numbered(n)).unwrap();
                }
            })
        };

        let mut stream = bus.subscribe(EventFilter::All);
        let received = take_n(&mut stream, (BACKLOG + LIVE) as usize).await.unwrap();
        publisher.join().unwrap();

        assert_eq!(numbers(&received), (1..=BACKLOG + LIVE).collect::<Vec<_>>());
        bus.shutdown();
    }
}

// ============================================================================
// Replay hand-off
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replay_is_contiguous_with_live_under_concurrent_subscribe() {
    const COUNT: u32 = 20_000;

    for _ in 0..5 {
        let bus = Arc::new(ReplayUntilSubscribedBus::new(
            Scheduler::current().unwrap(),
            OverflowPolicy::Buffer,
            Capacity::Unbounded,
            ReplayLimit::Count(COUNT as usize),
            default_replay_filter(),
            StopTrigger::Delay(Duration::from_millis(5)),
            Duration::from_millis(1),
            None,
        ));
        let started = Arc::new(Barrier::new(2));

        let publisher = {
            let bus = bus.clone();
            let started = started.clone();
            thread::spawn(move || {
                started.wait();
                for n in 1..=COUNT {
                    bus.publish(numbered(n)).unwrap();
                }
            })
        };

        started.wait();
        tokio::task::yield_now().await;
        let mut stream = bus.subscribe(EventFilter::All);
        let received = take_n(&mut stream, COUNT as usize).await.unwrap();
        publisher.join().unwrap();

        assert_eq!(numbers(&received), (1..=COUNT).collect::<Vec<_>>());
        assert!(stays_quiet(&mut stream, Duration::from_millis(20)).await);
        bus.shutdown();
    }
}

// ============================================================================
// Serialized emission
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_publishers_are_rejected_or_delivered() {
    const PER_THREAD: u32 = 10_000;

    let bus = Arc::new(DirectBroadcastBus::with_defaults().unwrap());
    let mut stream = bus.subscribe(EventFilter::All);
    let start = Arc::new(Barrier::new(2));

    let publishers: Vec<_> = (0..2)
        .map(|_| {
            let bus = bus.clone();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                let mut accepted = 0usize;
                let mut rejected = 0usize;
                for n in 1..=PER_THREAD {
                    match bus.publish(numbered(n)) {
                        Ok(()) => accepted += 1,
                        Err(BusError::NonSerializedEmission { bus: "direct" }) => rejected += 1,
                        Err(other) => panic!("unexpected publish error {other}"),
                    }
                }
                (accepted, rejected)
            })
        })
        .collect();

    let (mut accepted, mut rejected) = (0, 0);
    for publisher in publishers {
        let (a, r) = publisher.join().unwrap();
        accepted += a;
        rejected += r;
    }

    assert_eq!(accepted + rejected, 2 * PER_THREAD as usize);
    let received = take_n(&mut stream, accepted).await.unwrap();
    assert_eq!(received.len(), accepted);
    assert!(stays_quiet(&mut stream, Duration::from_millis(20)).await);
    assert_eq!(bus.stats().published, accepted as u64);
}

// ============================================================================
// Dedicated scheduler
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_handlers_run_on_dedicated_scheduler() {
    const COUNT: u32 = 500;

    let bus = EventBusBuilder::new(BusBackend::Direct)
        .scheduler(Scheduler::dedicated("herald-handlers", 2).unwrap())
        .build()
        .unwrap();
    let mut handled = bus.subscribe_with(EventFilter::All, |event| async move {
        let worker = thread::current().name().map(str::to_string);
        Ok::<_, anyhow::Error>((number_of(&event), worker))
    });

    let publisher = {
        let bus = bus.clone();
        thread::spawn(move || {
            for n in 1..=COUNT {
                bus.publish(numbered(n)).unwrap();
            }
        })
    };

    let outputs = take_n(&mut handled, COUNT as usize).await.unwrap();
    publisher.join().unwrap();

    let order: Vec<u32> = outputs.iter().filter_map(|(n, _)| *n).collect();
    assert_eq!(order, (1..=COUNT).collect::<Vec<_>>());
    assert!(outputs
        .iter()
        .all(|(_, worker)| worker.as_deref() == Some("herald-handlers")));
    bus.shutdown();
}
