//! Alternatives Engine
//!
//! **Discovery** (four strategies, run concurrently):
//! 1. Category search
//! 2. Similar-name search (Jaro-Winkler ≥ 0.5)
//! 3. AI-suggested, verified against the catalog
//! 4. Known eco brands of the category
//!
//! Every catalog and AI call goes through the shared [`CallGate`] with the
//! discovery timeout and the query deadline.
//!
//! **Ranking** (after the product's own score is known):
//! dedup by normalized `(name, brand)` in strategy order, drop the original
//! product, keep only strictly better scores, rank, keep the top 5, then pad
//! with synthetic candidates up to 3.

mod strategies;
pub mod synthetic;

pub use strategies::{name_similarity, SIMILARITY_THRESHOLD};

use crate::adapters::AiAnalyzer;
use crate::catalog::{CatalogProduct, ProductCatalog};
use crate::fallback::round1;
use crate::gate::CallGate;
use crate::tables::{self, CategoryProfile, GENERAL};
use crate::types::{normalize_text, AlternativeCandidate, DiscoveryStrategy, ProductQuery};
use ecoscan_common::config::ScoringConfig;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Most alternatives returned
pub const MAX_ALTERNATIVES: usize = 5;

/// Fewest alternatives returned (padded with synthetic ones)
pub const MIN_ALTERNATIVES: usize = 3;

const REAL_DATA_BONUS: f64 = 30.0;
const BIG_GAIN_THRESHOLD: f64 = 20.0;
const BIG_GAIN_BONUS: f64 = 20.0;

pub struct AlternativesEngine {
    catalog: Arc<dyn ProductCatalog>,
    ai: Option<Arc<dyn AiAnalyzer>>,
    gate: CallGate,
    /// Per-call timeout for catalog and AI lookups
    call_timeout: Duration,
    /// Used to estimate eco scores of catalog records that lack one
    certification_bonuses: BTreeMap<String, f64>,
}

impl AlternativesEngine {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        ai: Option<Arc<dyn AiAnalyzer>>,
        gate: CallGate,
        call_timeout: Duration,
        scoring: &ScoringConfig,
    ) -> Self {
        Self {
            catalog,
            ai,
            gate,
            call_timeout,
            certification_bonuses: scoring.certification_bonuses.clone(),
        }
    }

    /// Raw candidates from all strategies, in strategy order
    ///
    /// Never fails; a failing, timed out or cut-off strategy contributes
    /// nothing.
    pub async fn discover(&self, query: &ProductQuery, deadline: &CancellationToken) -> Vec<AlternativeCandidate> {
        let category = tables::detect_category(query);

        let (by_category, by_name, by_ai, by_brand) = tokio::join!(
            self.category_search(query, category, deadline),
            self.similar_name_search(query, deadline),
            self.ai_suggested(query, category, deadline),
            self.eco_brand_search(query, category, deadline),
        );

        debug!(
            query = %query.cache_key(),
            category = category.map(|c| c.id).unwrap_or("-"),
            category_search = by_category.len(),
            similar_name = by_name.len(),
            ai_suggested = by_ai.len(),
            eco_brand = by_brand.len(),
            "Discovery finished"
        );

        [by_category, by_name, by_ai, by_brand].into_iter().flatten().collect()
    }

    /// Filter, rank and pad raw candidates against the product's own score
    pub fn rank(
        &self,
        query: &ProductQuery,
        raw: Vec<AlternativeCandidate>,
        original_score: f64,
    ) -> Vec<AlternativeCandidate> {
        if original_score >= 100.0 {
            return Vec::new();
        }

        let mut taken: HashSet<(String, String)> = HashSet::new();
        let mut ranked: Vec<AlternativeCandidate> = Vec::new();
        for mut candidate in raw {
            if is_original(&candidate, query) || !taken.insert(candidate.dedup_key()) {
                continue;
            }
            if candidate.eco_score <= original_score {
                continue;
            }
            candidate.rank_score = rank_score(&candidate, original_score);
            ranked.push(candidate);
        }

        sort_ranked(&mut ranked);
        ranked.truncate(MAX_ALTERNATIVES);

        if ranked.len() < MIN_ALTERNATIVES {
            let missing = MIN_ALTERNATIVES - ranked.len();
            let padded = synthetic::synthetic_candidates(
                tables::detect_category(query),
                original_score,
                missing,
                &mut taken,
            );
            debug!(real = ranked.len(), synthetic = padded.len(), "Padding alternatives");
            ranked.extend(padded);
            sort_ranked(&mut ranked);
        }
        ranked
    }

    /// Convert catalog records into candidates for one strategy
    fn candidates(
        &self,
        query: &ProductQuery,
        products: Vec<CatalogProduct>,
        strategy: DiscoveryStrategy,
    ) -> Vec<AlternativeCandidate> {
        let fallback_category = tables::detect_category(query);
        products
            .into_iter()
            .map(|product| self.candidate(product, fallback_category, strategy))
            .collect()
    }

    fn candidate(
        &self,
        product: CatalogProduct,
        fallback_category: Option<&'static CategoryProfile>,
        strategy: DiscoveryStrategy,
    ) -> AlternativeCandidate {
        let profile = product
            .category
            .as_deref()
            .and_then(tables::category_by_id)
            .or(fallback_category)
            .unwrap_or(&GENERAL);

        let eco_score = product
            .eco_score
            .unwrap_or_else(|| self.estimate_eco_score(profile, &product.certifications));

        AlternativeCandidate {
            id: product.id,
            name: product.name,
            brand: product.brand,
            category: profile.id.to_string(),
            eco_score: round1(eco_score.clamp(0.0, 100.0)),
            co2_impact: product.co2e_kg.unwrap_or(profile.co2e_kg),
            certifications: product.certifications,
            real_data: true,
            rank_score: 0.0,
            strategy,
        }
    }

    /// Category baseline plus certification bonuses
    fn estimate_eco_score(&self, profile: &CategoryProfile, certifications: &[String]) -> f64 {
        let bonus: f64 = certifications
            .iter()
            .filter_map(|c| self.certification_bonuses.get(c))
            .sum();
        (profile.supply_chain_baseline + bonus).min(100.0)
    }
}

/// `30 if real_data` + `eco_score` + `20 if eco_score beats the original by
/// more than 20`
pub fn rank_score(candidate: &AlternativeCandidate, original_score: f64) -> f64 {
    let mut score = candidate.eco_score;
    if candidate.real_data {
        score += REAL_DATA_BONUS;
    }
    if candidate.eco_score - original_score > BIG_GAIN_THRESHOLD {
        score += BIG_GAIN_BONUS;
    }
    score
}

/// Descending rank, ties by name
fn sort_ranked(candidates: &mut [AlternativeCandidate]) {
    candidates.sort_by(|a, b| {
        b.rank_score
            .partial_cmp(&a.rank_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Whether a candidate is the queried product itself
fn is_original(candidate: &AlternativeCandidate, query: &ProductQuery) -> bool {
    if let Some(code) = query.canonical_id.barcode() {
        if candidate.id == code {
            return true;
        }
    }
    let name = normalize_text(&candidate.name);
    if name != normalize_text(&query.display_name) {
        return false;
    }
    match &query.brand {
        Some(brand) => normalize_text(brand) == normalize_text(&candidate.brand),
        None => true,
    }
}
