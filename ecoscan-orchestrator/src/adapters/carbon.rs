//! Carbon footprint adapter
//!
//! Live: `GET {endpoint}/estimate?category=&name=` returning `{co2e_kg}`.
//! Fallback: category emission factor (±10%).

use super::http::HttpProvider;
use crate::fallback::{jitter, seeded_rng};
use crate::tables;
use crate::types::{
    CarbonEstimate, ProductQuery, ProviderError, ProviderPayload, ScoreRole, SourceAdapter,
};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EstimateResponse {
    co2e_kg: Option<f64>,
}

pub struct CarbonAdapter {
    name: String,
    http: HttpProvider,
}

impl CarbonAdapter {
    pub fn new(name: impl Into<String>, http: HttpProvider) -> Self {
        Self {
            name: name.into(),
            http,
        }
    }
}

#[async_trait]
impl SourceAdapter for CarbonAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> ScoreRole {
        ScoreRole::Carbon
    }

    async fn fetch_live(&self, query: &ProductQuery) -> Result<ProviderPayload, ProviderError> {
        let category = tables::detect_category(query)
            .map(|c| c.id)
            .or(query.category.as_deref())
            .unwrap_or("");
        let params = [("category", category), ("name", query.display_name.as_str())];

        let response: EstimateResponse = self.http.get_json("/estimate", &params).await?;
        let co2e_kg = response
            .co2e_kg
            .filter(|c| c.is_finite() && *c >= 0.0)
            .ok_or_else(|| ProviderError::MalformedResponse("missing co2e_kg".to_string()))?;

        Ok(ProviderPayload::Carbon(CarbonEstimate {
            co2e_kg,
            method: "provider".to_string(),
        }))
    }

    fn estimate(&self, query: &ProductQuery) -> Option<ProviderPayload> {
        let category = tables::detect_category(query)?;
        let mut rng = seeded_rng(query, &self.name);
        let factor = 1.0 + jitter(&mut rng, 0.1);
        let co2e_kg = (category.co2e_kg * factor * 100.0).round() / 100.0;

        Some(ProviderPayload::Carbon(CarbonEstimate {
            co2e_kg,
            method: "emission_factor_table".to_string(),
        }))
    }
}
