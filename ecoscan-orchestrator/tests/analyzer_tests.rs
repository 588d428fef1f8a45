//! Analyzer cache lifetime and discovery bounds
//!
//! Discovery runs under the same call gate and deadline as the fan-out.

mod helpers;

use chrono::{Duration as ChronoDuration, Utc};
use ecoscan_common::config::EcoScanConfig;
use ecoscan_orchestrator::cache::ManualClock;
use ecoscan_orchestrator::types::{DiscoveryStrategy, ProductQuery, ScoreRole, SourceStatus};
use ecoscan_orchestrator::Analyzer;
use helpers::mock_catalog::product;
use helpers::{registry, scripted_analyzer, source, Behavior, MockAi, MockCatalog, ScriptedSource, StalledCatalog};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test]
async fn test_expired_entry_refetches() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let adapter = ScriptedSource::arc("pricing", ScoreRole::Informational, Behavior::Score(1.0));
    let analyzer = scripted_analyzer(vec![(source("pricing", 3, 6.0), adapter.clone())]).with_clock(clock.clone());
    let query = ProductQuery::from_name("oat milk").unwrap();

    analyzer.analyze(&query).await;
    clock.advance(ChronoDuration::hours(5));
    assert!(analyzer.analyze(&query).await.cached);
    clock.advance(ChronoDuration::hours(2));
    assert!(!analyzer.analyze(&query).await.cached);
    assert_eq!(adapter.call_count(), 2);
}

#[tokio::test]
async fn test_chain_alternate_ttl_bounds_the_entry() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let mut carbon = source("carbon", 8, 72.0);
    carbon.fallback_chain = vec!["carbon_backup".to_string()];
    let mut backup = source("carbon_backup", 6, 6.0);
    backup.enabled = false;
    let analyzer = scripted_analyzer(vec![
        (carbon, ScriptedSource::arc("carbon", ScoreRole::Carbon, Behavior::Fail)),
        (backup, ScriptedSource::arc("carbon_backup", ScoreRole::Carbon, Behavior::Score(70.0))),
        (
            source("supply_chain", 9, 72.0),
            ScriptedSource::arc("supply_chain", ScoreRole::SupplyChain, Behavior::Score(80.0)),
        ),
    ])
    .with_clock(clock.clone());
    let query = ProductQuery::from_name("oat milk").unwrap();

    let report = analyzer.analyze(&query).await;
    let carbon = report.outcomes.iter().find(|o| o.source_name == "carbon").unwrap();
    assert_eq!(carbon.served_by.as_deref(), Some("carbon_backup"));

    clock.advance(ChronoDuration::hours(5));
    assert!(analyzer.analyze(&query).await.cached);
    clock.advance(ChronoDuration::hours(2));
    assert!(!analyzer.analyze(&query).await.cached);
}

#[tokio::test]
async fn test_unconsulted_standby_ttl_ignored() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let mut standby = source("carbon_backup", 6, 6.0);
    standby.enabled = false;
    let analyzer = scripted_analyzer(vec![
        (
            source("supply_chain", 9, 72.0),
            ScriptedSource::arc("supply_chain", ScoreRole::SupplyChain, Behavior::Score(80.0)),
        ),
        (standby, ScriptedSource::arc("carbon_backup", ScoreRole::Carbon, Behavior::Score(70.0))),
    ])
    .with_clock(clock.clone());
    let query = ProductQuery::from_name("oat milk").unwrap();

    analyzer.analyze(&query).await;
    clock.advance(ChronoDuration::hours(48));
    assert!(analyzer.analyze(&query).await.cached);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_catalog_bounded_by_discovery_timeout() {
    let config = EcoScanConfig::default();
    let catalog = Arc::new(StalledCatalog::new());
    let analyzer = Analyzer::with_registry(
        &config,
        registry(vec![(
            source("supply_chain", 9, 24.0),
            ScriptedSource::arc("supply_chain", ScoreRole::SupplyChain, Behavior::Score(80.0)),
        )]),
        catalog.clone(),
        None,
    );
    let query = ProductQuery::from_name("Zorblax Quantum Gizmo").unwrap();

    let started = Instant::now();
    let report = analyzer.analyze(&query).await;

    assert!(started.elapsed() <= Duration::from_millis(config.orchestrator.discovery_timeout_ms + 10));
    assert!(catalog.searches.load(Ordering::SeqCst) >= 1);
    assert_eq!(report.outcomes[0].status, SourceStatus::Success);
    assert_eq!(report.alternatives.len(), 3);
    assert!(report.alternatives.iter().all(|a| a.strategy == DiscoveryStrategy::Synthetic));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_catalog_bounded_by_query_deadline() {
    let mut config = EcoScanConfig::default();
    config.orchestrator.discovery_timeout_ms = 600_000;
    config.orchestrator.query_deadline_ms = 2_000;
    let analyzer = Analyzer::with_registry(
        &config,
        registry(vec![(
            source("supply_chain", 9, 24.0),
            ScriptedSource::arc("supply_chain", ScoreRole::SupplyChain, Behavior::Score(80.0)),
        )]),
        Arc::new(StalledCatalog::new()),
        None,
    );
    let query = ProductQuery::from_name("Cola Soda").unwrap().with_category("beverages");

    let started = Instant::now();
    let report = analyzer.analyze(&query).await;

    assert!(started.elapsed() <= Duration::from_millis(2_010));
    assert_eq!(report.score.overall_score, 80.0);
    assert_eq!(report.alternatives.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_discovery_calls_share_the_concurrency_cap() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max = Arc::new(AtomicUsize::new(0));
    let mut config = EcoScanConfig::default();
    config.orchestrator.concurrency_cap = 1;

    let catalog = Arc::new(
        MockCatalog::new(vec![
            product("1", "Oat Drink", "Oatly", "beverages", 85.0),
            product("2", "Fair Cocoa", "Equal Exchange", "beverages", 88.0),
            product("3", "Sparkling Water", "Spring Valley", "beverages", 80.0),
        ])
        .with_delay(Duration::from_millis(100))
        .with_gauge(in_flight.clone(), max.clone()),
    );
    let ai = Arc::new(MockAi {
        suggestions: vec![
            "Oat Drink".to_string(),
            "Fair Cocoa".to_string(),
            "Sparkling Water".to_string(),
        ],
    });
    let supply_chain = ScriptedSource::new("supply_chain", ScoreRole::SupplyChain, Behavior::Slow(Duration::from_millis(100), 40.0))
        .with_gauge(in_flight.clone(), max.clone());
    let analyzer = Analyzer::with_registry(
        &config,
        registry(vec![(source("supply_chain", 9, 24.0), Arc::new(supply_chain))]),
        catalog.clone(),
        Some(ai),
    );
    let query = ProductQuery::from_name("Cola Soda").unwrap().with_category("beverages");

    let report = analyzer.analyze(&query).await;

    // category + name + three verifications + two eco brands
    assert_eq!(catalog.search_count(), 7);
    assert_eq!(max.load(Ordering::SeqCst), 1);
    assert_eq!(report.outcomes[0].status, SourceStatus::Success);
    assert!(report.alternatives.iter().any(|a| a.real_data));
}
