//! # EcoScan Common Library
//!
//! Shared code for the EcoScan orchestrator crates:
//! - Error type
//! - TOML configuration (logging, orchestrator, scoring, sources, server)
//! - Configuration file resolution
//! - Time helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
