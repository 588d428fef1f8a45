//! HTTP API handlers for ecoscan

pub mod analyze;
pub mod health;
pub mod sources;

pub use analyze::analyze_routes;
pub use health::health_routes;
pub use sources::source_routes;
