//! ecoscan-orchestrator library interface
//!
//! Multi-source sustainability scoring: parallel provider fan-out with
//! deterministic fallback, score synthesis, TTL result caching, and
//! alternatives discovery. Exposes public APIs for integration testing.

pub mod adapters;
pub mod alternatives;
pub mod analyzer;
pub mod api;
pub mod cache;
pub mod catalog;
pub mod coordinator;
pub mod error;
pub mod fallback;
pub mod gate;
pub mod synthesis;
pub mod tables;
pub mod types;

pub use crate::analyzer::Analyzer;
pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use ecoscan_common::config::EcoScanConfig;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Analysis pipeline (registry, coordinator, cache)
    pub analyzer: Arc<Analyzer>,
    /// Loaded configuration, read-only after startup
    pub config: Arc<EcoScanConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(analyzer: Analyzer, config: EcoScanConfig) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analyze_routes())
        .merge(api::source_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
