//! Barcode database adapter (Open Food Facts product API)
//!
//! Only applies to barcode queries. The live record contributes its eco score
//! (when present) to the secondary bucket and its labels to certifications.
//! The fallback infers a category from the query text and carries no score.

use super::http::HttpProvider;
use crate::catalog::OffProduct;
use crate::tables;
use crate::types::{
    BarcodeRecord, ProductQuery, ProviderError, ProviderPayload, ScoreRole, SourceAdapter,
};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProductResponse {
    /// 1 = found, 0 = unknown barcode
    #[serde(default)]
    status: i64,
    #[serde(default)]
    product: Option<OffProduct>,
}

pub struct BarcodeAdapter {
    name: String,
    http: HttpProvider,
}

impl BarcodeAdapter {
    pub fn new(name: impl Into<String>, http: HttpProvider) -> Self {
        Self {
            name: name.into(),
            http,
        }
    }
}

#[async_trait]
impl SourceAdapter for BarcodeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> ScoreRole {
        ScoreRole::Secondary
    }

    fn applies_to(&self, query: &ProductQuery) -> bool {
        query.canonical_id.barcode().is_some()
    }

    async fn fetch_live(&self, query: &ProductQuery) -> Result<ProviderPayload, ProviderError> {
        let code = query
            .canonical_id
            .barcode()
            .ok_or_else(|| ProviderError::Unavailable("not a barcode query".to_string()))?;

        let path = format!("/api/v2/product/{}.json", code);
        let response: ProductResponse = self.http.get_json(&path, &[]).await?;
        let product = match (response.status, response.product) {
            (1, Some(product)) => product,
            _ => return Err(ProviderError::Http(404)),
        };

        Ok(ProviderPayload::Barcode(BarcodeRecord {
            brand: product.primary_brand(),
            category: product.category_id(),
            eco_score: product.ecoscore_score,
            certifications: product.certifications(),
            product_name: product.product_name.filter(|n| !n.trim().is_empty()),
        }))
    }

    fn estimate(&self, query: &ProductQuery) -> Option<ProviderPayload> {
        let category = tables::detect_category(query)?;
        Some(ProviderPayload::Barcode(BarcodeRecord {
            category: Some(category.id.to_string()),
            brand: query.brand.clone(),
            ..Default::default()
        }))
    }
}
