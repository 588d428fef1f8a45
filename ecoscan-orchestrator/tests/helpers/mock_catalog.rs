//! In-memory catalog and AI analyzer

use async_trait::async_trait;
use ecoscan_orchestrator::adapters::AiAnalyzer;
use ecoscan_orchestrator::catalog::{CatalogProduct, ProductCatalog};
use ecoscan_orchestrator::types::{AiAssessment, ProductQuery, ProviderError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Catalog product with the given score
pub fn product(id: &str, name: &str, brand: &str, category: &str, eco_score: f64) -> CatalogProduct {
    CatalogProduct {
        id: id.to_string(),
        name: name.to_string(),
        brand: brand.to_string(),
        category: Some(category.to_string()),
        eco_score: Some(eco_score),
        co2e_kg: None,
        certifications: Vec::new(),
    }
}

/// Returns the same product list for every search, filtered by category
pub struct MockCatalog {
    products: Vec<CatalogProduct>,
    searches: AtomicUsize,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockCatalog {
    pub fn new(products: Vec<CatalogProduct>) -> Self {
        Self {
            products,
            searches: AtomicUsize::new(0),
            delay: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every search answers after `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Share an in-flight gauge with scripted sources
    pub fn with_gauge(mut self, in_flight: Arc<AtomicUsize>, max: Arc<AtomicUsize>) -> Self {
        self.in_flight = in_flight;
        self.max_in_flight = max;
        self
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductCatalog for MockCatalog {
    async fn search(
        &self,
        _text: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogProduct>, ProviderError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self
            .products
            .iter()
            .filter(|p| category.is_none() || p.category.as_deref() == category)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Catalog whose searches never answer
pub struct StalledCatalog {
    pub searches: AtomicUsize,
}

impl StalledCatalog {
    pub fn new() -> Self {
        Self {
            searches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProductCatalog for StalledCatalog {
    async fn search(
        &self,
        _text: &str,
        _category: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<CatalogProduct>, ProviderError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// AI analyzer with canned suggestions
pub struct MockAi {
    pub suggestions: Vec<String>,
}

#[async_trait]
impl AiAnalyzer for MockAi {
    async fn assess(&self, _query: &ProductQuery) -> Result<AiAssessment, ProviderError> {
        Err(ProviderError::Unavailable("assessment not scripted".to_string()))
    }

    async fn suggest_alternatives(
        &self,
        _query: &ProductQuery,
        _category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(self.suggestions.iter().take(limit).cloned().collect())
    }
}
