//! Core Types and Trait Definitions for the EcoScan orchestrator
//!
//! Defines the per-provider adapter contract and the data that flows through
//! the pipeline:
//! - **ProductQuery:** normalized request, one per analysis
//! - **SourceAdapter:** one implementation per provider
//! - **ProviderResult:** one per adapter invocation, discarded after synthesis
//! - **CompositeScore / AlternativeCandidate / AnalysisReport:** outputs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Product Query
// ============================================================================

/// Canonical product identity, also the cache fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CanonicalId {
    /// 8-14 ASCII digits (EAN-8, UPC-A, EAN-13, GTIN-14)
    Barcode(String),
    /// Lowercased name with collapsed whitespace
    Name(String),
}

impl CanonicalId {
    /// Stable cache key (`"barcode:<digits>"` or `"name:<normalized>"`)
    pub fn fingerprint(&self) -> String {
        match self {
            CanonicalId::Barcode(code) => format!("barcode:{}", code),
            CanonicalId::Name(name) => format!("name:{}", name),
        }
    }

    pub fn barcode(&self) -> Option<&str> {
        match self {
            CanonicalId::Barcode(code) => Some(code),
            CanonicalId::Name(_) => None,
        }
    }
}

/// Malformed query, rejected before the coordinator is invoked
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Product query is empty")]
    Empty,

    #[error("Invalid barcode: {0} (expected 8-14 digits)")]
    InvalidBarcode(String),
}

/// Normalized product query
///
/// Immutable once built; passed unchanged to every adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub canonical_id: CanonicalId,
    pub display_name: String,
    pub category: Option<String>,
    pub brand: Option<String>,
}

impl ProductQuery {
    /// Build a query from a scanned barcode
    ///
    /// Spaces and dashes are stripped. `display_name` defaults to the barcode.
    pub fn from_barcode(barcode: &str, display_name: Option<&str>) -> Result<Self, QueryError> {
        let digits: String = barcode
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if digits.is_empty() {
            return Err(QueryError::Empty);
        }
        if !is_barcode(&digits) {
            return Err(QueryError::InvalidBarcode(barcode.to_string()));
        }

        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| digits.clone());

        Ok(Self {
            canonical_id: CanonicalId::Barcode(digits),
            display_name,
            category: None,
            brand: None,
        })
    }

    /// Build a query from a free-text or image-derived product name
    pub fn from_name(name: &str) -> Result<Self, QueryError> {
        let normalized = normalize_text(name);
        if normalized.is_empty() {
            return Err(QueryError::Empty);
        }
        Ok(Self {
            canonical_id: CanonicalId::Name(normalized),
            display_name: collapse_whitespace(name),
            category: None,
            brand: None,
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = normalize_text(&category.into());
        self.category = (!category.is_empty()).then_some(category);
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        let brand = collapse_whitespace(&brand.into());
        self.brand = (!brand.is_empty()).then_some(brand);
        self
    }

    /// Cache key for this query
    pub fn cache_key(&self) -> String {
        self.canonical_id.fingerprint()
    }

    /// Normalized name + brand + category text used for keyword matching
    pub fn search_text(&self) -> String {
        let mut parts = vec![self.display_name.as_str()];
        if let Some(brand) = &self.brand {
            parts.push(brand);
        }
        if let Some(category) = &self.category {
            parts.push(category);
        }
        normalize_text(&parts.join(" "))
    }
}

/// True for 8-14 ASCII digits
pub fn is_barcode(candidate: &str) -> bool {
    (8..=14).contains(&candidate.len()) && candidate.chars().all(|c| c.is_ascii_digit())
}

/// Lowercase and collapse internal whitespace
pub fn normalize_text(text: &str) -> String {
    collapse_whitespace(&text.to_lowercase())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Provider Results
// ============================================================================

/// Which bucket of the composite score a source feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRole {
    SupplyChain,
    Carbon,
    Certification,
    Secondary,
    /// Metadata only (pricing, imagery); never scored
    Informational,
}

impl ScoreRole {
    /// Breakdown key, `None` for roles that never contribute a score
    pub fn breakdown_key(&self) -> Option<&'static str> {
        match self {
            ScoreRole::SupplyChain => Some("supply_chain"),
            ScoreRole::Carbon => Some("carbon"),
            ScoreRole::Certification => Some("certification"),
            ScoreRole::Secondary => Some("secondary"),
            ScoreRole::Informational => None,
        }
    }
}

/// Settlement status of one adapter invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Live data (from the source itself or a fallback-chain alternate)
    Success,
    /// Live call failed and the fallback estimator had nothing to offer
    Failed,
    /// Live call timed out and the fallback estimator had nothing to offer
    TimedOut,
    /// The fallback estimator produced the result
    FellBack,
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceStatus::Success => write!(f, "success"),
            SourceStatus::Failed => write!(f, "failed"),
            SourceStatus::TimedOut => write!(f, "timed_out"),
            SourceStatus::FellBack => write!(f, "fell_back"),
        }
    }
}

/// Live provider failure
///
/// Never surfaced to callers of `analyze`; always resolved through a
/// fallback-chain alternate or the adapter's fallback estimator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Credentials missing, no endpoint configured, or network down
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Per-source timeout elapsed
    #[error("Provider timed out after {0} ms")]
    Timeout(u64),

    /// Outer query deadline reached while waiting
    #[error("Query deadline exceeded")]
    DeadlineExceeded,

    /// Non-2xx HTTP status
    #[error("Provider returned HTTP {0}")]
    Http(u16),

    /// Unparseable or structurally invalid payload
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Status reported when no fallback estimate is available
    pub fn status(&self) -> SourceStatus {
        match self {
            ProviderError::Timeout(_) | ProviderError::DeadlineExceeded => SourceStatus::TimedOut,
            _ => SourceStatus::Failed,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::MalformedResponse(err.to_string())
        } else if err.is_timeout() {
            ProviderError::Timeout(0)
        } else if let Some(status) = err.status() {
            ProviderError::Http(status.as_u16())
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}

/// Supply-chain transparency report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyChainReport {
    pub score: f64,
    pub labor_rating: Option<String>,
    pub transparency: Option<f64>,
}

/// Carbon footprint estimate per unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonEstimate {
    pub co2e_kg: f64,
    /// `"provider"` or `"emission_factor_table"`
    pub method: String,
}

/// Canonical certification ids found for the product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationReport {
    pub certifications: Vec<String>,
    /// Registry-verified (live) vs. keyword-detected (fallback)
    pub verified: bool,
}

/// Barcode database record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BarcodeRecord {
    pub product_name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub eco_score: Option<f64>,
    pub certifications: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOffer {
    pub retailer: String,
    pub price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReport {
    pub offers: Vec<PriceOffer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    pub url: String,
    pub placeholder: bool,
}

/// AI text/image analysis output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AiAssessment {
    pub score: Option<f64>,
    pub summary: String,
    #[serde(default)]
    pub certifications: Vec<String>,
}

/// Typed per-provider payload, normalized into `ProviderResult` by
/// [`ProviderPayload::partial_score`] and [`ProviderPayload::metadata`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderPayload {
    SupplyChain(SupplyChainReport),
    Carbon(CarbonEstimate),
    Certifications(CertificationReport),
    Barcode(BarcodeRecord),
    Pricing(PriceReport),
    Image(ImageReport),
    Ai(AiAssessment),
}

impl ProviderPayload {
    /// 0-100 sustainability contribution, if this payload carries one
    pub fn partial_score(&self) -> Option<f64> {
        let score = match self {
            ProviderPayload::SupplyChain(report) => Some(report.score),
            ProviderPayload::Carbon(estimate) => Some(carbon_score(estimate.co2e_kg)),
            ProviderPayload::Certifications(report) => {
                Some(certification_score(report.certifications.len()))
            }
            ProviderPayload::Barcode(record) => record.eco_score,
            ProviderPayload::Pricing(_) | ProviderPayload::Image(_) => None,
            ProviderPayload::Ai(assessment) => assessment.score,
        };
        score.filter(|s| s.is_finite()).map(|s| s.clamp(0.0, 100.0))
    }

    /// Canonical certification ids carried by this payload
    pub fn certifications(&self) -> &[String] {
        match self {
            ProviderPayload::Certifications(report) => &report.certifications,
            ProviderPayload::Barcode(record) => &record.certifications,
            ProviderPayload::Ai(assessment) => &assessment.certifications,
            _ => &[],
        }
    }

    /// Flattened metadata for downstream consumers
    pub fn metadata(&self) -> BTreeMap<String, serde_json::Value> {
        use serde_json::json;

        let mut meta = BTreeMap::new();
        match self {
            ProviderPayload::SupplyChain(report) => {
                if let Some(rating) = &report.labor_rating {
                    meta.insert("labor_rating".to_string(), json!(rating));
                }
                if let Some(transparency) = report.transparency {
                    meta.insert("transparency".to_string(), json!(transparency));
                }
            }
            ProviderPayload::Carbon(estimate) => {
                meta.insert("co2e_kg".to_string(), json!(estimate.co2e_kg));
                meta.insert("method".to_string(), json!(estimate.method));
            }
            ProviderPayload::Certifications(report) => {
                meta.insert("verified".to_string(), json!(report.verified));
            }
            ProviderPayload::Barcode(record) => {
                if let Some(name) = &record.product_name {
                    meta.insert("product_name".to_string(), json!(name));
                }
                if let Some(brand) = &record.brand {
                    meta.insert("brand".to_string(), json!(brand));
                }
                if let Some(category) = &record.category {
                    meta.insert("category".to_string(), json!(category));
                }
            }
            ProviderPayload::Pricing(report) => {
                meta.insert("offers".to_string(), json!(report.offers));
                if let Some(lowest) = report
                    .offers
                    .iter()
                    .map(|offer| offer.price)
                    .min_by(|a, b| a.total_cmp(b))
                {
                    meta.insert("lowest_price".to_string(), json!(lowest));
                }
            }
            ProviderPayload::Image(report) => {
                meta.insert("image_url".to_string(), json!(report.url));
                meta.insert("placeholder".to_string(), json!(report.placeholder));
            }
            ProviderPayload::Ai(assessment) => {
                meta.insert("summary".to_string(), json!(assessment.summary));
            }
        }

        let certifications = self.certifications();
        if !certifications.is_empty() {
            meta.insert("certifications".to_string(), json!(certifications));
        }
        meta
    }
}

/// Carbon score: exponential decay over kg CO2e per unit
///
/// 1 kg → ~90, 5 kg → ~61, 10 kg → ~37, 20 kg → ~14.
pub fn carbon_score(co2e_kg: f64) -> f64 {
    if !co2e_kg.is_finite() || co2e_kg <= 0.0 {
        return 100.0;
    }
    (100.0 * (-co2e_kg / 10.0).exp()).clamp(0.0, 100.0)
}

/// Certification score: 30 with none found, then 40 + 15 per certification
pub fn certification_score(count: usize) -> f64 {
    if count == 0 {
        30.0
    } else {
        (40.0 + 15.0 * count as f64).min(100.0)
    }
}

/// Outcome of one adapter invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    pub source_name: String,
    pub role: ScoreRole,
    pub status: SourceStatus,
    pub partial_score: Option<f64>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Fallback-chain alternate that answered in this source's place
    pub served_by: Option<String>,
    pub payload: Option<ProviderPayload>,
    pub fetched_at: DateTime<Utc>,
}

impl ProviderResult {
    /// Live result from a provider payload
    pub fn live(source_name: impl Into<String>, role: ScoreRole, payload: ProviderPayload) -> Self {
        Self::from_payload(source_name, role, SourceStatus::Success, payload)
    }

    /// Fallback-estimated result
    pub fn estimated(
        source_name: impl Into<String>,
        role: ScoreRole,
        payload: ProviderPayload,
    ) -> Self {
        let mut result = Self::from_payload(source_name, role, SourceStatus::FellBack, payload);
        result
            .metadata
            .insert("estimated".to_string(), serde_json::Value::Bool(true));
        result
    }

    /// No live data and no estimate
    pub fn unavailable(source_name: impl Into<String>, role: ScoreRole, status: SourceStatus) -> Self {
        Self {
            source_name: source_name.into(),
            role,
            status,
            partial_score: None,
            metadata: BTreeMap::new(),
            served_by: None,
            payload: None,
            fetched_at: Utc::now(),
        }
    }

    fn from_payload(
        source_name: impl Into<String>,
        role: ScoreRole,
        status: SourceStatus,
        payload: ProviderPayload,
    ) -> Self {
        let partial_score = if role.breakdown_key().is_some() {
            payload.partial_score()
        } else {
            None
        };
        Self {
            source_name: source_name.into(),
            role,
            status,
            partial_score,
            metadata: payload.metadata(),
            served_by: None,
            payload: Some(payload),
            fetched_at: Utc::now(),
        }
    }

    /// Mark the fallback-chain alternate that produced this result
    pub fn served_by(mut self, alternate: impl Into<String>) -> Self {
        let alternate = alternate.into();
        self.metadata.insert(
            "served_by".to_string(),
            serde_json::Value::String(alternate.clone()),
        );
        self.served_by = Some(alternate);
        self
    }

    pub fn is_live(&self) -> bool {
        self.status == SourceStatus::Success
    }

    pub fn certifications(&self) -> &[String] {
        self.payload
            .as_ref()
            .map(ProviderPayload::certifications)
            .unwrap_or(&[])
    }
}

// ============================================================================
// Source Adapter Trait
// ============================================================================

/// One external data provider
///
/// The public contract is [`fetch`](SourceAdapter::fetch), which never fails:
/// a live failure becomes either a fallback estimate or a `Failed`/`TimedOut`
/// result. The coordinator drives [`fetch_live`](SourceAdapter::fetch_live)
/// and [`fallback`](SourceAdapter::fallback) separately so it can race
/// timeouts and walk fallback chains in between.
///
/// # Example
/// ```rust,ignore
/// use ecoscan_orchestrator::types::*;
///
/// struct StaticAdapter;
///
/// #[async_trait::async_trait]
/// impl SourceAdapter for StaticAdapter {
///     fn name(&self) -> &str { "static" }
///     fn role(&self) -> ScoreRole { ScoreRole::Secondary }
///
///     async fn fetch_live(&self, _q: &ProductQuery) -> Result<ProviderPayload, ProviderError> {
///         Err(ProviderError::Unavailable("offline".into()))
///     }
///
///     fn estimate(&self, _q: &ProductQuery) -> Option<ProviderPayload> { None }
/// }
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Configured source name
    fn name(&self) -> &str;

    /// Scoring bucket this source feeds
    fn role(&self) -> ScoreRole;

    /// Whether this source has anything to say about the query
    fn applies_to(&self, _query: &ProductQuery) -> bool {
        true
    }

    /// Live provider call; may fail
    async fn fetch_live(&self, query: &ProductQuery) -> Result<ProviderPayload, ProviderError>;

    /// Pure fallback estimator: a function of the query and static tables
    /// only, no I/O
    fn estimate(&self, query: &ProductQuery) -> Option<ProviderPayload>;

    /// Fallback result after a live failure with status `failure`
    fn fallback(&self, query: &ProductQuery, failure: SourceStatus) -> ProviderResult {
        match self.estimate(query) {
            Some(payload) => ProviderResult::estimated(self.name(), self.role(), payload),
            None => ProviderResult::unavailable(self.name(), self.role(), failure),
        }
    }

    /// Live call with built-in fallback; never fails
    async fn fetch(&self, query: &ProductQuery) -> ProviderResult {
        match self.fetch_live(query).await {
            Ok(payload) => ProviderResult::live(self.name(), self.role(), payload),
            Err(err) => {
                tracing::debug!(source = self.name(), error = %err, "Live fetch failed, estimating");
                self.fallback(query, err.status())
            }
        }
    }
}

// ============================================================================
// Composite Score
// ============================================================================

/// Letter grade, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    F,
    D,
    C,
    B,
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{}", label)
    }
}

/// Merged sustainability score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    /// 0-100
    pub overall_score: f64,
    /// 0-100
    pub confidence: f64,
    /// Per-role averages (`supply_chain`, `carbon`, `certification`, `secondary`)
    pub breakdown: BTreeMap<String, f64>,
    pub certifications: BTreeSet<String>,
    pub grade: Grade,
    /// Sources that returned live data
    pub sources_used: BTreeSet<String>,
    /// Sources that fell back, failed or timed out
    pub sources_fallback: BTreeSet<String>,
}

// ============================================================================
// Alternatives
// ============================================================================

/// Discovery strategy that produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    CategorySearch,
    SimilarName,
    AiSuggested,
    EcoBrand,
    Synthetic,
}

/// Better-scoring alternative product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeCandidate {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub eco_score: f64,
    /// kg CO2e per unit
    pub co2_impact: f64,
    pub certifications: Vec<String>,
    /// Corroborated by a live provider result rather than synthesized
    pub real_data: bool,
    pub rank_score: f64,
    pub strategy: DiscoveryStrategy,
}

impl AlternativeCandidate {
    /// Dedup key: normalized `(name, brand)`
    pub fn dedup_key(&self) -> (String, String) {
        (normalize_text(&self.name), normalize_text(&self.brand))
    }
}

// ============================================================================
// Analysis Report
// ============================================================================

/// Per-source settlement summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source_name: String,
    pub status: SourceStatus,
    pub served_by: Option<String>,
    pub partial_score: Option<f64>,
}

impl From<&ProviderResult> for SourceOutcome {
    fn from(result: &ProviderResult) -> Self {
        Self {
            source_name: result.source_name.clone(),
            status: result.status,
            served_by: result.served_by.clone(),
            partial_score: result.partial_score,
        }
    }
}

/// Output of `analyze`: score plus ranked alternatives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub request_id: Uuid,
    pub query: ProductQuery,
    pub score: CompositeScore,
    pub alternatives: Vec<AlternativeCandidate>,
    pub outcomes: Vec<SourceOutcome>,
    /// Served from the result cache
    pub cached: bool,
    pub generated_at: DateTime<Utc>,
}

// ============================================================================
// Tests
// ============================================================================
