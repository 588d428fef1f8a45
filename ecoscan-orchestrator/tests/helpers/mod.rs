//! Test Helper Utilities
//!
//! Shared utilities for testing ecoscan-orchestrator

#![allow(dead_code)]

pub mod mock_catalog;
pub mod mock_sources;

pub use mock_catalog::{MockAi, MockCatalog, StalledCatalog};
pub use mock_sources::{Behavior, ScriptedSource};

use ecoscan_common::config::{EcoScanConfig, SourceConfig};
use ecoscan_orchestrator::adapters::{AiAnalyzer, SourceRegistry};
use ecoscan_orchestrator::catalog::{OfflineCatalog, ProductCatalog};
use ecoscan_orchestrator::Analyzer;
use std::sync::Arc;

/// Source config with a given priority and TTL
pub fn source(name: &str, priority: u8, ttl_hours: f64) -> SourceConfig {
    let mut config = SourceConfig::new(name, priority);
    config.cache_ttl_hours = ttl_hours;
    config
}

/// Registry over scripted sources
pub fn registry(sources: Vec<(SourceConfig, Arc<ScriptedSource>)>) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    for (config, adapter) in sources {
        registry.register(config, adapter);
    }
    registry
}

/// Analyzer over scripted sources and an offline catalog
pub fn scripted_analyzer(sources: Vec<(SourceConfig, Arc<ScriptedSource>)>) -> Analyzer {
    analyzer_with_catalog(sources, Arc::new(OfflineCatalog), None)
}

pub fn analyzer_with_catalog(
    sources: Vec<(SourceConfig, Arc<ScriptedSource>)>,
    catalog: Arc<dyn ProductCatalog>,
    ai: Option<Arc<dyn AiAnalyzer>>,
) -> Analyzer {
    Analyzer::with_registry(&EcoScanConfig::default(), registry(sources), catalog, ai)
}

/// Built-in configuration with every network endpoint removed
pub fn offline_config() -> EcoScanConfig {
    let mut config = EcoScanConfig::default();
    config.orchestrator.catalog_endpoint = None;
    for source in &mut config.sources {
        source.endpoint = None;
    }
    config
}
