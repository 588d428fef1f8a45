//! Product catalog access for alternatives discovery
//!
//! The default catalog speaks the Open Food Facts product/search JSON
//! format; the barcode adapter reuses the same product record.

use crate::adapters::http::HttpProvider;
use crate::tables;
use crate::types::{normalize_text, ProviderError};
use async_trait::async_trait;
use serde::Deserialize;

/// Product as returned by the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    pub brand: String,
    /// Canonical category id, if recognized
    pub category: Option<String>,
    pub eco_score: Option<f64>,
    pub co2e_kg: Option<f64>,
    /// Canonical certification ids
    pub certifications: Vec<String>,
}

/// Searchable product catalog
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Full-text search, optionally restricted to a canonical category id
    async fn search(
        &self,
        text: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogProduct>, ProviderError>;
}

/// Open Food Facts style product record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OffProduct {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    /// Comma-separated brand list
    #[serde(default)]
    pub brands: Option<String>,
    #[serde(default)]
    pub categories_tags: Vec<String>,
    #[serde(default)]
    pub ecoscore_score: Option<f64>,
    #[serde(default)]
    pub labels_tags: Vec<String>,
    /// Agribalyse carbon footprint, kg CO2e per kg of product
    #[serde(default)]
    pub carbon_footprint_kg: Option<f64>,
}

impl OffProduct {
    /// First listed brand
    pub fn primary_brand(&self) -> Option<String> {
        self.brands
            .as_deref()?
            .split(',')
            .map(str::trim)
            .find(|b| !b.is_empty())
            .map(str::to_string)
    }

    pub fn category_id(&self) -> Option<String> {
        tables::category_from_tags(&self.categories_tags).map(|c| c.id.to_string())
    }

    pub fn certifications(&self) -> Vec<String> {
        tables::canonical_certifications(&self.labels_tags)
    }

    /// Convert to a catalog product; records without a name are dropped
    pub fn into_catalog_product(self) -> Option<CatalogProduct> {
        let name = self.product_name.as_deref().map(str::trim).filter(|n| !n.is_empty())?.to_string();
        let brand = self.primary_brand().unwrap_or_default();
        let id = self
            .code
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| format!("catalog:{}|{}", normalize_text(&name), normalize_text(&brand)));
        Some(CatalogProduct {
            id,
            category: self.category_id(),
            eco_score: self.ecoscore_score.filter(|s| s.is_finite()).map(|s| s.clamp(0.0, 100.0)),
            co2e_kg: self.carbon_footprint_kg.filter(|c| c.is_finite() && *c >= 0.0),
            certifications: self.certifications(),
            name,
            brand,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OffSearchResponse {
    #[serde(default)]
    products: Vec<OffProduct>,
}

/// Catalog backed by an Open Food Facts compatible search API
pub struct HttpCatalog {
    http: HttpProvider,
}

impl HttpCatalog {
    pub fn new(http: HttpProvider) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ProductCatalog for HttpCatalog {
    async fn search(
        &self,
        text: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogProduct>, ProviderError> {
        let page_size = limit.max(1).to_string();
        let mut params = vec![
            ("search_terms", text),
            ("json", "1"),
            ("page_size", page_size.as_str()),
            ("sort_by", "ecoscore_score"),
        ];
        if let Some(category) = category {
            params.push(("tagtype_0", "categories"));
            params.push(("tag_contains_0", "contains"));
            params.push(("tag_0", category));
        }

        let response: OffSearchResponse = self.http.get_json("/cgi/search.pl", &params).await?;
        Ok(response
            .products
            .into_iter()
            .filter_map(OffProduct::into_catalog_product)
            .take(limit)
            .collect())
    }
}

/// Catalog used when no catalog endpoint is configured
pub struct OfflineCatalog;

#[async_trait]
impl ProductCatalog for OfflineCatalog {
    async fn search(
        &self,
        _text: &str,
        _category: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<CatalogProduct>, ProviderError> {
        Err(ProviderError::Unavailable("no catalog configured".to_string()))
    }
}
