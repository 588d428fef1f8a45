//! Source listing endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::types::ScoreRole;
use crate::AppState;

/// One configured source as seen by the orchestrator
#[derive(Debug, Serialize)]
pub struct SourceInfo {
    pub source_name: String,
    pub kind: String,
    pub role: ScoreRole,
    pub enabled: bool,
    pub priority: u8,
    pub timeout_ms: u64,
    pub cache_ttl_hours: f64,
    pub fallback_chain: Vec<String>,
    /// Live endpoint and credentials present
    pub live: bool,
}

/// GET /sources response
#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    /// Outbound calls in flight at once, across all queries
    pub concurrency_cap: usize,
    pub query_deadline_ms: u64,
    pub discovery_timeout_ms: u64,
    pub sources: Vec<SourceInfo>,
}

/// GET /sources
///
/// Fan-out settings plus the sources in descending priority order.
pub async fn list_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    let mut sources: Vec<SourceInfo> = state
        .analyzer
        .registry()
        .iter()
        .map(|source| {
            let config = &source.config;
            SourceInfo {
                source_name: config.source_name.clone(),
                kind: config.kind().to_string(),
                role: source.adapter.role(),
                enabled: config.enabled,
                priority: config.priority,
                timeout_ms: config.timeout_ms,
                cache_ttl_hours: config.cache_ttl_hours,
                fallback_chain: config.fallback_chain.clone(),
                live: config.endpoint.is_some()
                    && (config.api_key_env.is_none() || config.api_key().is_some()),
            }
        })
        .collect();
    sources.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.source_name.cmp(&b.source_name)));

    let orchestrator = &state.config.orchestrator;
    Json(SourcesResponse {
        concurrency_cap: orchestrator.concurrency_cap,
        query_deadline_ms: orchestrator.query_deadline_ms,
        discovery_timeout_ms: orchestrator.discovery_timeout_ms,
        sources,
    })
}

pub fn source_routes() -> Router<AppState> {
    Router::new().route("/sources", get(list_sources))
}
