//! Supply-chain transparency adapter
//!
//! Live: `GET {endpoint}/products/score?q=<name>[&barcode=<digits>][&brand=]`
//! returning `{score, labor_rating?, transparency?}`.
//!
//! Fallback: known eco brand score (±2), else category baseline (±4), else
//! nothing.

use super::http::HttpProvider;
use crate::fallback::{jitter, round1, seeded_rng};
use crate::tables;
use crate::types::{
    ProductQuery, ProviderError, ProviderPayload, ScoreRole, SourceAdapter, SupplyChainReport,
};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: Option<f64>,
    #[serde(default)]
    labor_rating: Option<String>,
    #[serde(default)]
    transparency: Option<f64>,
}

pub struct SupplyChainAdapter {
    name: String,
    http: HttpProvider,
}

impl SupplyChainAdapter {
    pub fn new(name: impl Into<String>, http: HttpProvider) -> Self {
        Self {
            name: name.into(),
            http,
        }
    }
}

#[async_trait]
impl SourceAdapter for SupplyChainAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> ScoreRole {
        ScoreRole::SupplyChain
    }

    async fn fetch_live(&self, query: &ProductQuery) -> Result<ProviderPayload, ProviderError> {
        let mut params = vec![("q", query.display_name.as_str())];
        if let Some(code) = query.canonical_id.barcode() {
            params.push(("barcode", code));
        }
        if let Some(brand) = &query.brand {
            params.push(("brand", brand.as_str()));
        }

        let response: ScoreResponse = self.http.get_json("/products/score", &params).await?;
        let score = response
            .score
            .filter(|s| s.is_finite())
            .ok_or_else(|| ProviderError::MalformedResponse("missing score".to_string()))?;

        Ok(ProviderPayload::SupplyChain(SupplyChainReport {
            score,
            labor_rating: response.labor_rating,
            transparency: response.transparency,
        }))
    }

    fn estimate(&self, query: &ProductQuery) -> Option<ProviderPayload> {
        let mut rng = seeded_rng(query, &self.name);

        let (base, spread, rating) = if let Some(brand) = tables::eco_brand_for(query) {
            (brand.supply_chain_score, 2.0, "known_brand")
        } else if let Some(category) = tables::detect_category(query) {
            (category.supply_chain_baseline, 4.0, "category_baseline")
        } else {
            return None;
        };

        let score = round1((base + jitter(&mut rng, spread)).clamp(0.0, 100.0));
        Some(ProviderPayload::SupplyChain(SupplyChainReport {
            score,
            labor_rating: Some(rating.to_string()),
            transparency: None,
        }))
    }
}
