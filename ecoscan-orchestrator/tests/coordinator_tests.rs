//! Fan-out settlement, fallback chain and planning tests

mod helpers;

use ecoscan_common::config::SourceConfig;
use ecoscan_orchestrator::adapters::SourceRegistry;
use ecoscan_orchestrator::coordinator::FetchCoordinator;
use ecoscan_orchestrator::types::{ProductQuery, ScoreRole, SourceStatus};
use helpers::{registry, Behavior, ScriptedSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn source(name: &str, priority: u8) -> SourceConfig {
    SourceConfig::new(name, priority)
}

fn query() -> ProductQuery {
    ProductQuery::from_name("test product").unwrap()
}

fn coordinator(registry: SourceRegistry, cap: usize, deadline_ms: u64) -> FetchCoordinator {
    FetchCoordinator::new(Arc::new(registry), cap, Duration::from_millis(deadline_ms))
}

#[tokio::test]
async fn test_failure_isolation() {
    let registry = registry(vec![
        (source("good", 5), ScriptedSource::arc("good", ScoreRole::SupplyChain, Behavior::Score(80.0))),
        (
            source("bad", 5),
            Arc::new(ScriptedSource::new("bad", ScoreRole::Carbon, Behavior::Fail).with_estimate(40.0)),
        ),
        (source("dead", 5), ScriptedSource::arc("dead", ScoreRole::Certification, Behavior::Fail)),
    ]);

    let results = coordinator(registry, 6, 5_000).fetch_all(&query()).await;
    let statuses: Vec<(&str, SourceStatus)> = results.iter().map(|r| (r.source_name.as_str(), r.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("bad", SourceStatus::FellBack),
            ("dead", SourceStatus::Failed),
            ("good", SourceStatus::Success),
        ]
    );
}

#[tokio::test]
async fn test_disabled_sources_skipped() {
    let mut off = source("off", 5);
    off.enabled = false;
    let adapter = ScriptedSource::arc("off", ScoreRole::Carbon, Behavior::Score(70.0));

    let results = coordinator(registry(vec![(off, adapter.clone())]), 6, 5_000)
        .fetch_all(&query())
        .await;
    assert!(results.is_empty());
    assert_eq!(adapter.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_per_source_timeout() {
    let mut slow = source("slow", 5);
    slow.timeout_ms = 100;
    let registry = registry(vec![(slow, ScriptedSource::arc("slow", ScoreRole::Carbon, Behavior::Hang))]);

    let results = coordinator(registry, 6, 10_000).fetch_all(&query()).await;
    assert_eq!(results[0].status, SourceStatus::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_outer_deadline_resolves_everything() {
    let sources = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            let mut config = source(name, 5);
            config.timeout_ms = 60_000;
            let adapter = ScriptedSource::new(name, ScoreRole::Secondary, Behavior::Hang).with_estimate(55.0);
            (config, Arc::new(adapter))
        })
        .collect();

    let started = Instant::now();
    let results = coordinator(registry(sources), 1, 500).fetch_all(&query()).await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.status == SourceStatus::FellBack));
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_cap_respected() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max = Arc::new(AtomicUsize::new(0));
    let sources = (0..8)
        .map(|i| {
            let name = format!("s{}", i);
            let adapter = ScriptedSource::new(&name, ScoreRole::Secondary, Behavior::Slow(Duration::from_millis(50), 60.0))
                .with_gauge(in_flight.clone(), max.clone());
            (source(&name, 5), Arc::new(adapter))
        })
        .collect();

    let results = coordinator(registry(sources), 3, 10_000).fetch_all(&query()).await;
    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|r| r.is_live()));
    assert_eq!(max.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_fallback_chain_served_by_standby() {
    let mut primary = source("carbon", 8);
    primary.fallback_chain = vec!["carbon_backup".to_string()];
    let mut backup = source("carbon_backup", 6);
    backup.enabled = false;
    let backup_adapter = ScriptedSource::arc("carbon_backup", ScoreRole::Carbon, Behavior::Score(72.0));
    let registry = registry(vec![
        (
            primary,
            Arc::new(ScriptedSource::new("carbon", ScoreRole::Carbon, Behavior::Fail).with_estimate(30.0)),
        ),
        (backup, backup_adapter.clone()),
    ]);

    let results = coordinator(registry, 6, 5_000).fetch_all(&query()).await;
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.source_name, "carbon");
    assert_eq!(result.status, SourceStatus::Success);
    assert_eq!(result.served_by.as_deref(), Some("carbon_backup"));
    assert_eq!(result.partial_score, Some(72.0));
    assert_eq!(backup_adapter.call_count(), 1);
}

#[tokio::test]
async fn test_exhausted_chain_uses_primary_estimate() {
    let mut primary = source("a", 8);
    primary.fallback_chain = vec!["b".to_string(), "a".to_string(), "b".to_string()];
    let a = Arc::new(ScriptedSource::new("a", ScoreRole::Carbon, Behavior::Fail).with_estimate(33.0));
    let b = ScriptedSource::arc("b", ScoreRole::Carbon, Behavior::Fail);
    let registry = registry(vec![(primary, a.clone()), (source("b", 5), b.clone())]);

    let results = coordinator(registry, 6, 5_000).fetch_all(&query()).await;
    let result = results.iter().find(|r| r.source_name == "a").unwrap();
    assert_eq!(result.status, SourceStatus::FellBack);
    assert_eq!(result.partial_score, Some(33.0));
    // b's own failed call is reused as a's alternate
    assert_eq!(a.call_count(), 1);
    assert_eq!(b.call_count(), 1);
}

#[tokio::test]
async fn test_enabled_alternate_called_once_for_both_slots() {
    let mut primary = source("carbon", 8);
    primary.fallback_chain = vec!["carbon_backup".to_string()];
    let backup = ScriptedSource::arc("carbon_backup", ScoreRole::Carbon, Behavior::Score(64.0));
    let registry = registry(vec![
        (primary, ScriptedSource::arc("carbon", ScoreRole::Carbon, Behavior::Fail)),
        (source("carbon_backup", 6), backup.clone()),
    ]);

    let results = coordinator(registry, 6, 5_000).fetch_all(&query()).await;
    assert_eq!(results.len(), 2);
    let carbon = results.iter().find(|r| r.source_name == "carbon").unwrap();
    assert_eq!(carbon.status, SourceStatus::Success);
    assert_eq!(carbon.served_by.as_deref(), Some("carbon_backup"));
    assert_eq!(carbon.partial_score, Some(64.0));
    let own = results.iter().find(|r| r.source_name == "carbon_backup").unwrap();
    assert_eq!(own.status, SourceStatus::Success);
    assert_eq!(backup.call_count(), 1);
}

#[tokio::test]
async fn test_shared_standby_called_once_for_two_primaries() {
    let mut first = source("carbon", 8);
    first.fallback_chain = vec!["standby".to_string()];
    let mut second = source("certifications", 7);
    second.fallback_chain = vec!["standby".to_string()];
    let mut standby = source("standby", 4);
    standby.enabled = false;
    let standby_adapter = ScriptedSource::arc("standby", ScoreRole::Secondary, Behavior::Score(58.0));
    let registry = registry(vec![
        (first, ScriptedSource::arc("carbon", ScoreRole::Carbon, Behavior::Fail)),
        (second, ScriptedSource::arc("certifications", ScoreRole::Certification, Behavior::Fail)),
        (standby, standby_adapter.clone()),
    ]);

    let results = coordinator(registry, 6, 5_000).fetch_all(&query()).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.served_by.as_deref() == Some("standby")));
    assert_eq!(standby_adapter.call_count(), 1);
}

#[test]
fn test_plan_orders_by_priority() {
    let sources = [("low", 2), ("high", 9), ("mid_b", 5), ("mid_a", 5)]
        .into_iter()
        .map(|(name, priority)| (source(name, priority), ScriptedSource::arc(name, ScoreRole::Secondary, Behavior::Fail)))
        .collect();
    let coordinator = coordinator(registry(sources), 6, 1_000);
    let query = query();
    let order: Vec<&str> = coordinator
        .plan(&query)
        .into_iter()
        .map(|s| s.config.source_name.as_str())
        .collect();
    assert_eq!(order, vec!["high", "mid_a", "mid_b", "low"]);
}
