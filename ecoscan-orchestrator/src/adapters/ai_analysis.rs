//! AI text analysis adapter
//!
//! Wraps an externally supplied [`AiAnalyzer`]. The same analyzer also feeds
//! the AI-suggested alternatives strategy.
//!
//! Fallback: sustainability keyword heuristic,
//! `50 + 8 × positive − 10 × negative` (±3), nothing when no keyword matches.

use super::http::HttpProvider;
use crate::fallback::{jitter, round1, seeded_rng};
use crate::tables;
use crate::types::{
    AiAssessment, ProductQuery, ProviderError, ProviderPayload, ScoreRole, SourceAdapter,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Text/image analysis provider
#[async_trait]
pub trait AiAnalyzer: Send + Sync {
    /// Sustainability assessment of the product
    async fn assess(&self, query: &ProductQuery) -> Result<AiAssessment, ProviderError>;

    /// Names of more sustainable products to look up in the catalog
    async fn suggest_alternatives(
        &self,
        query: &ProductQuery,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, ProviderError>;
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    name: &'a str,
    brand: Option<&'a str>,
    category: Option<&'a str>,
    barcode: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SuggestRequest<'a> {
    name: &'a str,
    category: Option<&'a str>,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    suggestions: Vec<String>,
}

/// `POST {endpoint}/analyze` and `POST {endpoint}/suggest`
pub struct HttpAiAnalyzer {
    http: HttpProvider,
}

impl HttpAiAnalyzer {
    pub fn new(http: HttpProvider) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AiAnalyzer for HttpAiAnalyzer {
    async fn assess(&self, query: &ProductQuery) -> Result<AiAssessment, ProviderError> {
        let request = AnalyzeRequest {
            name: &query.display_name,
            brand: query.brand.as_deref(),
            category: query.category.as_deref(),
            barcode: query.canonical_id.barcode(),
        };
        let mut assessment: AiAssessment = self.http.post_json("/analyze", &request).await?;
        assessment.certifications = tables::canonical_certifications(&assessment.certifications);
        Ok(assessment)
    }

    async fn suggest_alternatives(
        &self,
        query: &ProductQuery,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, ProviderError> {
        let request = SuggestRequest {
            name: &query.display_name,
            category,
            limit,
        };
        let response: SuggestResponse = self.http.post_json("/suggest", &request).await?;
        Ok(response
            .suggestions
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(limit)
            .collect())
    }
}

pub struct AiAnalysisAdapter {
    name: String,
    analyzer: Arc<dyn AiAnalyzer>,
}

impl AiAnalysisAdapter {
    pub fn new(name: impl Into<String>, analyzer: Arc<dyn AiAnalyzer>) -> Self {
        Self {
            name: name.into(),
            analyzer,
        }
    }
}

#[async_trait]
impl SourceAdapter for AiAnalysisAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> ScoreRole {
        ScoreRole::Secondary
    }

    async fn fetch_live(&self, query: &ProductQuery) -> Result<ProviderPayload, ProviderError> {
        let assessment = self.analyzer.assess(query).await?;
        Ok(ProviderPayload::Ai(assessment))
    }

    fn estimate(&self, query: &ProductQuery) -> Option<ProviderPayload> {
        let (positive, negative) = tables::keyword_signals(&query.search_text());
        if positive == 0 && negative == 0 {
            return None;
        }

        let mut rng = seeded_rng(query, &self.name);
        let raw = 50.0 + 8.0 * positive as f64 - 10.0 * negative as f64 + jitter(&mut rng, 3.0);
        Some(ProviderPayload::Ai(AiAssessment {
            score: Some(round1(raw.clamp(0.0, 100.0))),
            summary: format!(
                "Keyword heuristic: {} positive, {} negative signals",
                positive, negative
            ),
            certifications: Vec::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    #[async_trait]
    impl AiAnalyzer for Offline {
        async fn assess(&self, _query: &ProductQuery) -> Result<AiAssessment, ProviderError> {
            Err(ProviderError::Unavailable("offline".to_string()))
        }

        async fn suggest_alternatives(
            &self,
            _query: &ProductQuery,
            _category: Option<&str>,
            _limit: usize,
        ) -> Result<Vec<String>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn adapter() -> AiAnalysisAdapter {
        AiAnalysisAdapter::new("ai_analysis", Arc::new(Offline))
    }

    fn estimated_score(name: &str) -> Option<f64> {
        let query = ProductQuery::from_name(name).unwrap();
        adapter().estimate(&query).and_then(|p| p.partial_score())
    }

    #[test]
    fn test_positive_keywords_raise_score() {
        let score = estimated_score("Reusable Bamboo Cup").unwrap();
        assert!((63.0..=69.0).contains(&score), "score {}", score);
    }

    #[test]
    fn test_negative_keywords_lower_score() {
        let score = estimated_score("Disposable Plastic Cups").unwrap();
        assert!((27.0..=33.0).contains(&score), "score {}", score);
    }

    #[test]
    fn test_no_signals_no_estimate() {
        assert_eq!(estimated_score("zzqx widget"), None);
    }
}
