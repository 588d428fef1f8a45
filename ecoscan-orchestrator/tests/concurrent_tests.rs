//! Fan-out concurrency, timeout and cancellation tests
//!
//! Run on a paused clock: sleeps and timeouts complete instantly, in order.

mod helpers;

use ecoscan_orchestrator::coordinator::FetchCoordinator;
use ecoscan_orchestrator::types::{ProductQuery, ScoreRole, SourceStatus};
use helpers::{registry, source, Behavior, ScriptedSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn query() -> ProductQuery {
    ProductQuery::from_name("Organic Oat Milk").unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_cap_is_shared_across_concurrent_queries() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max = Arc::new(AtomicUsize::new(0));
    let sources = (0..4)
        .map(|i| {
            let name = format!("source_{}", i);
            let adapter = ScriptedSource::new(&name, ScoreRole::Secondary, Behavior::Slow(Duration::from_millis(100), 60.0))
                .with_gauge(in_flight.clone(), max.clone());
            (source(&name, 5, 24.0), Arc::new(adapter))
        })
        .collect();
    let coordinator = FetchCoordinator::new(Arc::new(registry(sources)), 2, Duration::from_secs(10));

    let (q1, q2) = (query(), query());
    let (a, b) = tokio::join!(coordinator.fetch_all(&q1), coordinator.fetch_all(&q2));

    assert_eq!(a.len(), 4);
    assert_eq!(b.len(), 4);
    assert!(a.iter().chain(b.iter()).all(|r| r.status == SourceStatus::Success));
    assert_eq!(max.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_source_does_not_delay_fast_ones_past_its_timeout() {
    let mut slow_config = source("slow", 5, 24.0);
    slow_config.timeout_ms = 500;
    let slow = Arc::new(ScriptedSource::new("slow", ScoreRole::Carbon, Behavior::Hang).with_estimate(40.0));
    let fast = ScriptedSource::arc("fast", ScoreRole::SupplyChain, Behavior::Score(80.0));
    let coordinator = FetchCoordinator::new(
        Arc::new(registry(vec![(slow_config, slow), (source("fast", 9, 24.0), fast)])),
        6,
        Duration::from_secs(10),
    );

    let started = Instant::now();
    let results = coordinator.fetch_all(&query()).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    let fast = results.iter().find(|r| r.source_name == "fast").unwrap();
    assert_eq!(fast.status, SourceStatus::Success);
    let slow = results.iter().find(|r| r.source_name == "slow").unwrap();
    assert_eq!(slow.status, SourceStatus::FellBack);
    assert_eq!(slow.partial_score, Some(40.0));
}

#[tokio::test(start_paused = true)]
async fn test_external_cancel_settles_through_fallbacks() {
    let hanging = Arc::new(ScriptedSource::new("hanging", ScoreRole::Carbon, Behavior::Hang).with_estimate(55.0));
    let bare = ScriptedSource::arc("bare", ScoreRole::SupplyChain, Behavior::Hang);
    let mut hanging_config = source("hanging", 5, 24.0);
    hanging_config.timeout_ms = 60_000;
    let mut bare_config = source("bare", 5, 24.0);
    bare_config.timeout_ms = 60_000;
    let coordinator = FetchCoordinator::new(
        Arc::new(registry(vec![(hanging_config, hanging), (bare_config, bare)])),
        6,
        Duration::from_secs(120),
    );

    let cancel = CancellationToken::new();
    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            cancel.cancel();
        })
    };

    let started = Instant::now();
    let results = coordinator.fetch_all_with_cancel(&query(), &cancel).await;
    trigger.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(results.len(), 2);
    let bare = results.iter().find(|r| r.source_name == "bare").unwrap();
    assert_eq!(bare.status, SourceStatus::TimedOut);
    let hanging = results.iter().find(|r| r.source_name == "hanging").unwrap();
    assert_eq!(hanging.status, SourceStatus::FellBack);
}

#[tokio::test(start_paused = true)]
async fn test_queued_sources_fall_back_when_deadline_hits_before_permit() {
    // One permit, three sources that each hold it for 2s; 3s deadline
    let sources = (0..3)
        .map(|i| {
            let name = format!("queued_{}", i);
            let mut config = source(&name, 9 - i as u8, 24.0);
            config.timeout_ms = 5_000;
            let adapter = ScriptedSource::new(&name, ScoreRole::Secondary, Behavior::Slow(Duration::from_secs(2), 70.0))
                .with_estimate(30.0);
            (config, Arc::new(adapter))
        })
        .collect();
    let coordinator = FetchCoordinator::new(Arc::new(registry(sources)), 1, Duration::from_secs(3));

    let started = Instant::now();
    let results = coordinator.fetch_all(&query()).await;

    assert!(started.elapsed() <= Duration::from_secs(3) + Duration::from_millis(10));
    let live = results.iter().filter(|r| r.status == SourceStatus::Success).count();
    let fell_back = results.iter().filter(|r| r.status == SourceStatus::FellBack).count();
    assert_eq!(live, 1);
    assert_eq!(fell_back, 2);
}
