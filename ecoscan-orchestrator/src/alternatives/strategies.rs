//! Discovery strategies
//!
//! Each strategy turns catalog hits into raw candidates tagged with the
//! strategy that found them. Failures are logged and yield nothing.

use super::AlternativesEngine;
use crate::catalog::CatalogProduct;
use crate::types::ProviderError;
use crate::tables::{self, CategoryProfile};
use crate::types::{normalize_text, AlternativeCandidate, DiscoveryStrategy, ProductQuery};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Catalog hits requested per search
pub(super) const SEARCH_LIMIT: usize = 10;

/// AI suggestions requested per query
pub(super) const SUGGESTION_LIMIT: usize = 5;

/// Minimum Jaro-Winkler similarity for the similar-name strategy
pub const SIMILARITY_THRESHOLD: f64 = 0.5;

/// Normalized name similarity in `[0, 1]`
pub fn name_similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&normalize_text(a), &normalize_text(b))
}

impl AlternativesEngine {
    /// One catalog search through the call gate
    async fn gated_search(
        &self,
        text: &str,
        category: Option<&str>,
        limit: usize,
        deadline: &CancellationToken,
    ) -> Result<Vec<CatalogProduct>, ProviderError> {
        self.gate
            .run(self.call_timeout, deadline, self.catalog.search(text, category, limit))
            .await
    }

    /// Catalog search restricted to the product's category
    pub(super) async fn category_search(
        &self,
        query: &ProductQuery,
        category: Option<&'static CategoryProfile>,
        deadline: &CancellationToken,
    ) -> Vec<AlternativeCandidate> {
        let Some(category) = category else {
            debug!(query = %query.cache_key(), "No category, skipping category search");
            return Vec::new();
        };

        match self.gated_search(category.id, Some(category.id), SEARCH_LIMIT, deadline).await {
            Ok(products) => self.candidates(query, products, DiscoveryStrategy::CategorySearch),
            Err(err) => {
                warn!(strategy = "category_search", error = %err, "Discovery strategy failed");
                Vec::new()
            }
        }
    }

    /// Catalog search by name, keeping records similar to the original
    pub(super) async fn similar_name_search(
        &self,
        query: &ProductQuery,
        deadline: &CancellationToken,
    ) -> Vec<AlternativeCandidate> {
        let products = match self.gated_search(&query.display_name, None, SEARCH_LIMIT, deadline).await {
            Ok(products) => products,
            Err(err) => {
                warn!(strategy = "similar_name", error = %err, "Discovery strategy failed");
                return Vec::new();
            }
        };

        let similar: Vec<CatalogProduct> = products
            .into_iter()
            .filter(|p| name_similarity(&p.name, &query.display_name) >= SIMILARITY_THRESHOLD)
            .collect();
        self.candidates(query, similar, DiscoveryStrategy::SimilarName)
    }

    /// AI suggestions, each verified against the catalog
    pub(super) async fn ai_suggested(
        &self,
        query: &ProductQuery,
        category: Option<&'static CategoryProfile>,
        deadline: &CancellationToken,
    ) -> Vec<AlternativeCandidate> {
        let Some(ai) = &self.ai else {
            return Vec::new();
        };

        let suggest = ai.suggest_alternatives(query, category.map(|c| c.id), SUGGESTION_LIMIT);
        let suggestions = match self.gate.run(self.call_timeout, deadline, suggest).await {
            Ok(suggestions) => suggestions,
            Err(err) => {
                warn!(strategy = "ai_suggested", error = %err, "Discovery strategy failed");
                return Vec::new();
            }
        };

        let lookups = suggestions.iter().map(|suggestion| async move {
            match self.gated_search(suggestion, None, 3, deadline).await {
                Ok(products) => products
                    .into_iter()
                    .find(|p| name_similarity(&p.name, suggestion) >= SIMILARITY_THRESHOLD),
                Err(err) => {
                    debug!(suggestion = %suggestion, error = %err, "Suggestion lookup failed");
                    None
                }
            }
        });
        let verified: Vec<CatalogProduct> = join_all(lookups).await.into_iter().flatten().collect();

        debug!(
            suggested = suggestions.len(),
            verified = verified.len(),
            "AI suggestions verified"
        );
        self.candidates(query, verified, DiscoveryStrategy::AiSuggested)
    }

    /// Catalog search for each known eco brand of the category
    pub(super) async fn eco_brand_search(
        &self,
        query: &ProductQuery,
        category: Option<&'static CategoryProfile>,
        deadline: &CancellationToken,
    ) -> Vec<AlternativeCandidate> {
        let Some(category) = category else {
            return Vec::new();
        };

        let searches = tables::eco_brands_in(category.id).map(|brand| async move {
            match self.gated_search(brand.name, Some(category.id), 3, deadline).await {
                Ok(products) => products
                    .into_iter()
                    .filter(|p| tables::contains_phrase(&p.brand, brand.name))
                    .collect::<Vec<CatalogProduct>>(),
                Err(err) => {
                    warn!(strategy = "eco_brand", brand = brand.name, error = %err, "Discovery strategy failed");
                    Vec::new()
                }
            }
        });
        let products: Vec<CatalogProduct> = join_all(searches).await.into_iter().flatten().collect();
        self.candidates(query, products, DiscoveryStrategy::EcoBrand)
    }
}
