//! Retail pricing adapter (informational only)
//!
//! Live: `GET {endpoint}/offers?q=[&barcode=]` returning
//! `{offers: [{retailer, price, currency}]}`.
//! Fallback: one seeded price inside the category's typical range.

use super::http::HttpProvider;
use crate::fallback::seeded_rng;
use crate::tables;
use crate::types::{
    PriceOffer, PriceReport, ProductQuery, ProviderError, ProviderPayload, ScoreRole,
    SourceAdapter,
};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct OffersResponse {
    offers: Vec<PriceOffer>,
}

pub struct PricingAdapter {
    name: String,
    http: HttpProvider,
}

impl PricingAdapter {
    pub fn new(name: impl Into<String>, http: HttpProvider) -> Self {
        Self {
            name: name.into(),
            http,
        }
    }
}

#[async_trait]
impl SourceAdapter for PricingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> ScoreRole {
        ScoreRole::Informational
    }

    async fn fetch_live(&self, query: &ProductQuery) -> Result<ProviderPayload, ProviderError> {
        let mut params = vec![("q", query.display_name.as_str())];
        if let Some(code) = query.canonical_id.barcode() {
            params.push(("barcode", code));
        }

        let response: OffersResponse = self.http.get_json("/offers", &params).await?;
        let offers: Vec<PriceOffer> = response
            .offers
            .into_iter()
            .filter(|offer| offer.price.is_finite() && offer.price >= 0.0)
            .collect();

        Ok(ProviderPayload::Pricing(PriceReport { offers }))
    }

    fn estimate(&self, query: &ProductQuery) -> Option<ProviderPayload> {
        let category = tables::detect_category(query)?;
        let (low, high) = category.price_range;
        let mut rng = seeded_rng(query, &self.name);
        let price = (rng.gen_range(low..=high) * 100.0).round() / 100.0;

        Some(ProviderPayload::Pricing(PriceReport {
            offers: vec![PriceOffer {
                retailer: "estimated".to_string(),
                price,
                currency: "USD".to_string(),
            }],
        }))
    }
}
