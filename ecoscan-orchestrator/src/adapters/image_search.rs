//! Product image adapter (informational only)
//!
//! Wraps an externally supplied [`ImageLookup`]. The fallback always produces
//! a category placeholder, so this source never ends up `Failed`.

use super::http::HttpProvider;
use crate::tables;
use crate::types::{
    ImageReport, ProductQuery, ProviderError, ProviderPayload, ScoreRole, SourceAdapter,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Base for placeholder images served by the UI bundle
const PLACEHOLDER_BASE: &str = "/static/placeholders";

/// Best-image lookup for a product
#[async_trait]
pub trait ImageLookup: Send + Sync {
    /// URL of the best matching image
    async fn best_image(&self, query: &ProductQuery) -> Result<String, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct ImageHit {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ImageSearchResponse {
    #[serde(default)]
    results: Vec<ImageHit>,
}

/// `GET {endpoint}/images/search?q=` returning `{results: [{url}]}`
pub struct HttpImageLookup {
    http: HttpProvider,
}

impl HttpImageLookup {
    pub fn new(http: HttpProvider) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageLookup for HttpImageLookup {
    async fn best_image(&self, query: &ProductQuery) -> Result<String, ProviderError> {
        let text = match &query.brand {
            Some(brand) => format!("{} {}", brand, query.display_name),
            None => query.display_name.clone(),
        };
        let response: ImageSearchResponse =
            self.http.get_json("/images/search", &[("q", text.as_str())]).await?;

        response
            .results
            .into_iter()
            .map(|hit| hit.url)
            .find(|url| !url.trim().is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("no image results".to_string()))
    }
}

pub struct ImageSearchAdapter {
    name: String,
    lookup: Arc<dyn ImageLookup>,
}

impl ImageSearchAdapter {
    pub fn new(name: impl Into<String>, lookup: Arc<dyn ImageLookup>) -> Self {
        Self {
            name: name.into(),
            lookup,
        }
    }
}

#[async_trait]
impl SourceAdapter for ImageSearchAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> ScoreRole {
        ScoreRole::Informational
    }

    async fn fetch_live(&self, query: &ProductQuery) -> Result<ProviderPayload, ProviderError> {
        let url = self.lookup.best_image(query).await?;
        Ok(ProviderPayload::Image(ImageReport {
            url,
            placeholder: false,
        }))
    }

    fn estimate(&self, query: &ProductQuery) -> Option<ProviderPayload> {
        let category = tables::detect_category(query).map(|c| c.id).unwrap_or(tables::GENERAL.id);
        Some(ProviderPayload::Image(ImageReport {
            url: format!("{}/{}.svg", PLACEHOLDER_BASE, category),
            placeholder: true,
        }))
    }
}
