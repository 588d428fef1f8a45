//! Analysis entry point
//!
//! `analyze` = cache check → (fan-out ∥ alternatives discovery) → synthesis →
//! alternatives ranking → cache store. The cache is only touched before the
//! fan-out and after everything has settled.
//!
//! Fan-out and discovery share one call gate and one query deadline.

use crate::adapters::{
    build_client, build_registry, ExternalHelpers, HttpAiAnalyzer, HttpProvider, AiAnalyzer,
    SourceRegistry,
};
use crate::alternatives::AlternativesEngine;
use crate::cache::{CacheStats, Clock, ResultCache};
use crate::catalog::{HttpCatalog, OfflineCatalog, ProductCatalog};
use crate::coordinator::FetchCoordinator;
use crate::synthesis::ScoreSynthesizer;
use crate::types::{AnalysisReport, ProductQuery, ProviderResult, SourceOutcome};
use ecoscan_common::config::{EcoScanConfig, SourceConfig};
use ecoscan_common::time::millis_to_duration;
use ecoscan_common::Error;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Catalog requests per second against the public catalog
const CATALOG_RATE_LIMIT: u32 = 1;

pub struct Analyzer {
    coordinator: FetchCoordinator,
    synthesizer: ScoreSynthesizer,
    alternatives: AlternativesEngine,
    cache: ResultCache<AnalysisReport>,
    default_ttl_hours: f64,
}

impl Analyzer {
    /// Build the full pipeline from configuration
    ///
    /// Helpers left `None` get their default HTTP implementations.
    pub fn from_config(config: &EcoScanConfig, helpers: ExternalHelpers) -> ecoscan_common::Result<Self> {
        let client =
            build_client().map_err(|e| Error::Config(format!("Build HTTP client failed: {}", e)))?;
        let registry = build_registry(&config.sources, &client, &helpers)?;

        let catalog: Arc<dyn ProductCatalog> = match (&helpers.catalog, &config.orchestrator.catalog_endpoint) {
            (Some(catalog), _) => catalog.clone(),
            (None, Some(endpoint)) => {
                let mut source = SourceConfig::new("catalog", 5);
                source.endpoint = Some(endpoint.clone());
                source.rate_limit_per_second = CATALOG_RATE_LIMIT;
                Arc::new(HttpCatalog::new(HttpProvider::new(client.clone(), &source)))
            }
            (None, None) => Arc::new(OfflineCatalog),
        };

        let ai: Option<Arc<dyn AiAnalyzer>> = helpers.ai.clone().or_else(|| {
            config
                .sources
                .iter()
                .find(|s| s.kind() == "ai_analysis")
                .map(|s| Arc::new(HttpAiAnalyzer::new(HttpProvider::new(client.clone(), s))) as Arc<dyn AiAnalyzer>)
        });

        Ok(Self::with_registry(config, registry, catalog, ai))
    }

    /// Build the pipeline around an already populated registry
    pub fn with_registry(
        config: &EcoScanConfig,
        registry: SourceRegistry,
        catalog: Arc<dyn ProductCatalog>,
        ai: Option<Arc<dyn AiAnalyzer>>,
    ) -> Self {
        let priorities = registry.priorities();
        let coordinator = FetchCoordinator::new(
            Arc::new(registry),
            config.orchestrator.concurrency_cap,
            millis_to_duration(config.orchestrator.query_deadline_ms),
        );
        let alternatives = AlternativesEngine::new(
            catalog,
            ai,
            coordinator.gate().clone(),
            millis_to_duration(config.orchestrator.discovery_timeout_ms),
            &config.scoring,
        );

        Self {
            coordinator,
            synthesizer: ScoreSynthesizer::new(config.scoring.clone(), priorities),
            alternatives,
            cache: ResultCache::new(),
            default_ttl_hours: config.orchestrator.default_cache_ttl_hours,
        }
    }

    /// Replace the cache clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = ResultCache::with_clock(clock);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        self.coordinator.registry()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Score a product and find better alternatives
    ///
    /// Never fails: provider problems end up as fallbacks, and an empty
    /// discovery is padded with synthetic alternatives.
    pub async fn analyze(&self, query: &ProductQuery) -> AnalysisReport {
        let key = query.cache_key();
        if let Some(mut report) = self.cache.get(&key) {
            info!(query = %key, request_id = %report.request_id, "Served from cache");
            report.cached = true;
            return report;
        }

        let request_id = Uuid::new_v4();
        let span = info_span!("analyze", %request_id, query = %key);

        async move {
            let started = Instant::now();
            let deadline = self.coordinator.arm_deadline(&CancellationToken::new());

            let (results, raw_alternatives) = tokio::join!(
                self.coordinator.fetch_within(query, deadline.token()),
                self.alternatives.discover(query, deadline.token()),
            );
            let deadline_hit = deadline.is_hit();
            drop(deadline);

            let score = self.synthesizer.synthesize(&results);
            let alternatives = self.alternatives.rank(query, raw_alternatives, score.overall_score);
            let ttl_hours = self.ttl_for(&results);

            let report = AnalysisReport {
                request_id,
                query: query.clone(),
                outcomes: results.iter().map(SourceOutcome::from).collect(),
                score,
                alternatives,
                cached: false,
                generated_at: ecoscan_common::time::now(),
            };
            self.cache.put(key, report.clone(), ttl_hours);

            info!(
                overall = report.score.overall_score,
                grade = %report.score.grade,
                confidence = report.score.confidence,
                alternatives = report.alternatives.len(),
                ttl_hours,
                deadline_hit,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Analysis complete"
            );
            report
        }
        .instrument(span)
        .await
    }

    /// Shortest TTL among the sources consulted (including chain alternates)
    fn ttl_for(&self, results: &[ProviderResult]) -> f64 {
        let registry = self.coordinator.registry();
        results
            .iter()
            .flat_map(|r| std::iter::once(r.source_name.as_str()).chain(r.served_by.as_deref()))
            .filter_map(|name| registry.get(name))
            .map(|source| source.config.cache_ttl_hours)
            .fold(None, |min: Option<f64>, ttl| Some(min.map_or(ttl, |m| m.min(ttl))))
            .unwrap_or(self.default_ttl_hours)
    }
}
