//! Product analysis endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::types::{AnalysisReport, ProductQuery};
use crate::AppState;

/// POST /analyze request body
///
/// Exactly one of `barcode` or `name` identifies the product. When both are
/// given the barcode wins and `name` becomes the display name.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    pub barcode: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
}

impl AnalyzeRequest {
    /// Validate and normalize into a query
    pub fn into_query(self) -> ApiResult<ProductQuery> {
        let mut query = match (self.barcode.as_deref(), self.name.as_deref()) {
            (Some(barcode), name) => ProductQuery::from_barcode(barcode, name)?,
            (None, Some(name)) => ProductQuery::from_name(name)?,
            (None, None) => {
                return Err(ApiError::BadRequest(
                    "either barcode or name is required".to_string(),
                ))
            }
        };
        if let Some(category) = self.category {
            query = query.with_category(category);
        }
        if let Some(brand) = self.brand {
            query = query.with_brand(brand);
        }
        Ok(query)
    }
}

/// POST /analyze
pub async fn analyze_product(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalysisReport>> {
    let query = request.into_query()?;
    debug!(query = %query.cache_key(), "Analyze request");
    Ok(Json(state.analyzer.analyze(&query).await))
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze_product))
}
