//! Source adapters and the startup registry
//!
//! Each configured `[[sources]]` entry is paired with one adapter instance,
//! chosen by the entry's `kind` (defaulting to its name). Several sources may
//! share a kind, e.g. `carbon` and `carbon_backup` pointing at different
//! providers.

pub mod ai_analysis;
pub mod barcode;
pub mod carbon;
pub mod certifications;
pub mod http;
pub mod image_search;
pub mod pricing;
pub mod supply_chain;

pub use ai_analysis::{AiAnalysisAdapter, AiAnalyzer, HttpAiAnalyzer};
pub use barcode::BarcodeAdapter;
pub use carbon::CarbonAdapter;
pub use certifications::CertificationsAdapter;
pub use http::{build_client, HttpProvider};
pub use image_search::{HttpImageLookup, ImageLookup, ImageSearchAdapter};
pub use pricing::PricingAdapter;
pub use supply_chain::SupplyChainAdapter;

use crate::catalog::ProductCatalog;
use crate::types::SourceAdapter;
use ecoscan_common::config::SourceConfig;
use ecoscan_common::Error;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Adapter kinds understood by [`build_registry`]
pub const KNOWN_KINDS: &[&str] = &[
    "supply_chain",
    "carbon",
    "certifications",
    "barcode",
    "pricing",
    "image_search",
    "ai_analysis",
];

/// Configured source paired with its adapter
#[derive(Clone)]
pub struct RegisteredSource {
    pub config: SourceConfig,
    pub adapter: Arc<dyn SourceAdapter>,
}

/// All sources known to the process, keyed by source name
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, RegisteredSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a source. The registry key is
    /// `config.source_name`.
    pub fn register(&mut self, config: SourceConfig, adapter: Arc<dyn SourceAdapter>) {
        self.sources
            .insert(config.source_name.clone(), RegisteredSource { config, adapter });
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredSource> {
        self.sources.get(name)
    }

    /// Sources in name order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredSource> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn priority_of(&self, name: &str) -> Option<u8> {
        self.sources.get(name).map(|s| s.config.priority)
    }

    /// Source name → priority, used for confidence weighting
    pub fn priorities(&self) -> BTreeMap<String, u8> {
        self.sources
            .iter()
            .map(|(name, source)| (name.clone(), source.config.priority))
            .collect()
    }
}

/// Caller-supplied implementations of the outbound helper interfaces
///
/// Anything left `None` gets the default HTTP implementation.
#[derive(Clone, Default)]
pub struct ExternalHelpers {
    pub image: Option<Arc<dyn ImageLookup>>,
    pub ai: Option<Arc<dyn AiAnalyzer>>,
    pub catalog: Option<Arc<dyn ProductCatalog>>,
}

/// Instantiate one adapter per configured source
///
/// Fails on an unknown `kind`.
pub fn build_registry(
    sources: &[SourceConfig],
    client: &Client,
    helpers: &ExternalHelpers,
) -> ecoscan_common::Result<SourceRegistry> {
    let mut registry = SourceRegistry::new();

    for config in sources {
        let name = config.source_name.clone();
        let http = || HttpProvider::new(client.clone(), config);

        let adapter: Arc<dyn SourceAdapter> = match config.kind() {
            "supply_chain" => Arc::new(SupplyChainAdapter::new(name, http())),
            "carbon" => Arc::new(CarbonAdapter::new(name, http())),
            "certifications" => Arc::new(CertificationsAdapter::new(name, http())),
            "barcode" => Arc::new(BarcodeAdapter::new(name, http())),
            "pricing" => Arc::new(PricingAdapter::new(name, http())),
            "image_search" => {
                let lookup = helpers
                    .image
                    .clone()
                    .unwrap_or_else(|| Arc::new(HttpImageLookup::new(http())));
                Arc::new(ImageSearchAdapter::new(name, lookup))
            }
            "ai_analysis" => {
                let analyzer = helpers
                    .ai
                    .clone()
                    .unwrap_or_else(|| Arc::new(HttpAiAnalyzer::new(http())));
                Arc::new(AiAnalysisAdapter::new(name, analyzer))
            }
            other => {
                return Err(Error::Config(format!(
                    "source {}: unknown adapter kind '{}' (expected one of {})",
                    config.source_name,
                    other,
                    KNOWN_KINDS.join(", ")
                )));
            }
        };

        debug!(
            source = %config.source_name,
            kind = config.kind(),
            enabled = config.enabled,
            "Registered source"
        );
        registry.register(config.clone(), adapter);
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScoreRole;
    use ecoscan_common::config::default_sources;

    #[test]
    fn test_default_sources_build() {
        let registry =
            build_registry(&default_sources(), &Client::new(), &ExternalHelpers::default()).unwrap();

        assert_eq!(registry.len(), default_sources().len());
        let backup = registry.get("carbon_backup").unwrap();
        assert_eq!(backup.adapter.name(), "carbon_backup");
        assert_eq!(backup.adapter.role(), ScoreRole::Carbon);
        assert_eq!(registry.priority_of("supply_chain"), Some(9));
        assert_eq!(
            registry.get("pricing").unwrap().adapter.role(),
            ScoreRole::Informational
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut source = SourceConfig::new("weather", 5);
        source.kind = Some("weather".to_string());
        let result = build_registry(&[source], &Client::new(), &ExternalHelpers::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_iteration_is_name_ordered() {
        let registry =
            build_registry(&default_sources(), &Client::new(), &ExternalHelpers::default()).unwrap();
        let names: Vec<&str> = registry.iter().map(|s| s.config.source_name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
