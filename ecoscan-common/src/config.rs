//! Configuration loading and config file resolution
//!
//! One TOML file drives the whole orchestrator. It is read once at startup
//! and never hot-reloaded.
//!
//! # Config file resolution priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`ECOSCAN_CONFIG`)
//! 3. Platform config directory (`<config_dir>/ecoscan/config.toml`)
//! 4. Built-in defaults (no file)
//!
//! Every section is optional; missing fields take the built-in defaults below.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ECOSCAN_CONFIG";

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcoScanConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Coordinator and cache tuning
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Score synthesis parameters
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// HTTP server bind address
    #[serde(default)]
    pub server: ServerConfig,

    /// Provider sources, in no particular order
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for EcoScanConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            scoring: ScoringConfig::default(),
            server: ServerConfig::default(),
            sources: default_sources(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Fetch coordinator and result cache tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of live provider calls in flight at once
    #[serde(default = "default_concurrency_cap")]
    pub concurrency_cap: usize,

    /// Outer deadline for one query's whole fan-out (milliseconds)
    #[serde(default = "default_query_deadline_ms")]
    pub query_deadline_ms: u64,

    /// Cache TTL used when no consulted source declares one (hours)
    #[serde(default = "default_cache_ttl_hours")]
    pub default_cache_ttl_hours: f64,

    /// Base URL of the product catalog used for alternatives discovery.
    /// `None` disables live discovery (synthetic padding only).
    #[serde(default = "default_catalog_endpoint")]
    pub catalog_endpoint: Option<String>,

    /// Per-call timeout for catalog and AI suggestion lookups made during
    /// alternatives discovery (milliseconds)
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency_cap: default_concurrency_cap(),
            query_deadline_ms: default_query_deadline_ms(),
            default_cache_ttl_hours: default_cache_ttl_hours(),
            catalog_endpoint: default_catalog_endpoint(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
        }
    }
}

/// Weight applied to each scoring role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleWeights {
    #[serde(default = "default_supply_chain_weight")]
    pub supply_chain: f64,
    #[serde(default = "default_carbon_weight")]
    pub carbon: f64,
    #[serde(default = "default_certification_weight")]
    pub certification: f64,
    #[serde(default = "default_secondary_weight")]
    pub secondary: f64,
}

impl Default for RoleWeights {
    fn default() -> Self {
        Self {
            supply_chain: default_supply_chain_weight(),
            carbon: default_carbon_weight(),
            certification: default_certification_weight(),
            secondary: default_secondary_weight(),
        }
    }
}

/// Lower bounds of each letter grade (score ≥ bound)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeBreakpoints {
    pub a_plus: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for GradeBreakpoints {
    fn default() -> Self {
        Self {
            a_plus: 95.0,
            a: 85.0,
            b: 70.0,
            c: 55.0,
            d: 40.0,
        }
    }
}

/// Score synthesis parameters
///
/// The reference values are hand-picked. They shape the output but no
/// correctness property depends on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: RoleWeights,

    /// Flat bonus per canonical certification id (e.g. `fair_trade = 10.0`)
    #[serde(default = "default_certification_bonuses")]
    pub certification_bonuses: BTreeMap<String, f64>,

    /// Score returned when no source produced a partial score
    #[serde(default = "default_neutral_score")]
    pub neutral_score: f64,

    /// Confidence before any source contributes
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,

    /// Confidence added per priority point of each live source
    #[serde(default = "default_confidence_per_priority")]
    pub confidence_per_priority: f64,

    /// Confidence added per fallback-estimated source; must stay below
    /// `confidence_per_priority`
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,

    #[serde(default)]
    pub grade_breakpoints: GradeBreakpoints,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: RoleWeights::default(),
            certification_bonuses: default_certification_bonuses(),
            neutral_score: default_neutral_score(),
            confidence_floor: default_confidence_floor(),
            confidence_per_priority: default_confidence_per_priority(),
            fallback_confidence: default_fallback_confidence(),
            grade_breakpoints: GradeBreakpoints::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Static configuration of one provider source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique source name (`"carbon"`, `"carbon_backup"`, ...)
    pub source_name: String,

    /// Adapter implementation to instantiate. Defaults to `source_name`,
    /// so two sources may share one adapter kind with different endpoints.
    #[serde(default)]
    pub kind: Option<String>,

    /// Whether the source takes part in the fan-out. A disabled source can
    /// still answer as a fallback-chain alternate.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 1 (lowest) to 10 (highest)
    #[serde(default = "default_priority")]
    pub priority: u8,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: f64,

    /// Alternate sources tried in order when this source fails live
    #[serde(default)]
    pub fallback_chain: Vec<String>,

    /// Base URL of the live provider. `None` means fallback-only.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the provider API key, if one is needed
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Live request quota
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,
}

impl SourceConfig {
    /// Minimal enabled source with default tuning
    pub fn new(source_name: impl Into<String>, priority: u8) -> Self {
        Self {
            source_name: source_name.into(),
            kind: None,
            enabled: true,
            priority: priority.clamp(1, 10),
            timeout_ms: default_timeout_ms(),
            cache_ttl_hours: default_cache_ttl_hours(),
            fallback_chain: Vec::new(),
            endpoint: None,
            api_key_env: None,
            rate_limit_per_second: default_rate_limit(),
        }
    }

    /// Adapter kind this source instantiates
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(&self.source_name)
    }

    /// Resolve the API key from the configured environment variable
    ///
    /// Returns `None` when no variable is configured, or when it is unset or
    /// blank.
    pub fn api_key(&self) -> Option<String> {
        let var = self.api_key_env.as_ref()?;
        std::env::var(var).ok().filter(|key| is_valid_key(key))
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

impl EcoScanConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: EcoScanConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the config file (CLI → env → platform dir) and load it,
    /// falling back to built-in defaults when no file exists
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path, CONFIG_ENV_VAR) {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No configuration file found, using built-in defaults");
                let mut config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Normalize and sanity-check loaded values
    ///
    /// Priorities are clamped to 1-10. Duplicate source names, a zero
    /// concurrency cap, negative weights, a fallback confidence not below the
    /// per-priority confidence and out-of-order grade breakpoints are
    /// rejected. Chain entries that name unknown sources are dropped with a
    /// warning.
    pub fn validate(&mut self) -> Result<()> {
        if self.orchestrator.concurrency_cap == 0 {
            return Err(Error::Config("concurrency_cap must be at least 1".to_string()));
        }

        let w = &self.scoring.weights;
        if [w.supply_chain, w.carbon, w.certification, w.secondary]
            .iter()
            .any(|weight| !weight.is_finite() || *weight < 0.0)
        {
            return Err(Error::Config("scoring weights must be non-negative".to_string()));
        }

        let s = &self.scoring;
        if !(s.fallback_confidence >= 0.0 && s.fallback_confidence < s.confidence_per_priority) {
            return Err(Error::Config(
                "fallback_confidence must be non-negative and below confidence_per_priority"
                    .to_string(),
            ));
        }

        let g = &self.scoring.grade_breakpoints;
        if !(g.a_plus >= g.a && g.a >= g.b && g.b >= g.c && g.c >= g.d) {
            return Err(Error::Config(
                "grade_breakpoints must be descending from a_plus to d".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.source_name.trim().is_empty() {
                return Err(Error::Config("source_name must not be empty".to_string()));
            }
            if !seen.insert(source.source_name.clone()) {
                return Err(Error::Config(format!(
                    "duplicate source_name: {}",
                    source.source_name
                )));
            }
        }

        for source in &mut self.sources {
            if !(1..=10).contains(&source.priority) {
                warn!(
                    source = %source.source_name,
                    priority = source.priority,
                    "Source priority outside 1-10, clamping"
                );
                source.priority = source.priority.clamp(1, 10);
            }
            if source.rate_limit_per_second == 0 {
                source.rate_limit_per_second = 1;
            }

            let own_name = source.source_name.clone();
            source.fallback_chain.retain(|alt| {
                let known = seen.contains(alt) && *alt != own_name;
                if !known {
                    warn!(
                        source = %own_name,
                        alternate = %alt,
                        "Dropping unknown fallback chain entry"
                    );
                }
                known
            });
        }

        Ok(())
    }

    /// Look up a source by name
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.source_name == name)
    }
}

/// Config file resolution
///
/// Returns the first existing file among: CLI argument, env var, platform
/// config dir. An explicit CLI path is returned even if missing so the
/// caller gets a read error rather than silent defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|path| path.exists())
}

/// Platform config file location (`~/.config/ecoscan/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ecoscan").join("config.toml"))
}

/// Write configuration to a TOML file atomically (temp file + rename)
pub fn write_config(config: &EcoScanConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

// ============================================================================
// Built-in defaults
// ============================================================================

fn default_log_level() -> String {
    "info".to_string()
}

fn default_concurrency_cap() -> usize {
    6
}

fn default_query_deadline_ms() -> u64 {
    12_000
}

fn default_discovery_timeout_ms() -> u64 {
    4_000
}

fn default_cache_ttl_hours() -> f64 {
    24.0
}

fn default_catalog_endpoint() -> Option<String> {
    Some("https://world.openfoodfacts.org".to_string())
}

fn default_supply_chain_weight() -> f64 {
    0.4
}

fn default_carbon_weight() -> f64 {
    0.3
}

fn default_certification_weight() -> f64 {
    0.2
}

fn default_secondary_weight() -> f64 {
    0.1
}

fn default_certification_bonuses() -> BTreeMap<String, f64> {
    [
        ("fair_trade", 10.0),
        ("carbon_neutral", 15.0),
        ("organic", 8.0),
        ("rainforest_alliance", 6.0),
        ("b_corp", 5.0),
        ("fsc", 5.0),
        ("cradle_to_cradle", 7.0),
        ("energy_star", 4.0),
    ]
    .into_iter()
    .map(|(name, bonus)| (name.to_string(), bonus))
    .collect()
}

fn default_neutral_score() -> f64 {
    50.0
}

fn default_confidence_floor() -> f64 {
    10.0
}

fn default_confidence_per_priority() -> f64 {
    5.0
}

fn default_fallback_confidence() -> f64 {
    3.0
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u8 {
    5
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_rate_limit() -> u32 {
    5
}

/// The built-in provider sources
///
/// Only `barcode` has a public endpoint by default. The others run on their
/// fallback estimators until an endpoint (and key) is configured.
pub fn default_sources() -> Vec<SourceConfig> {
    let mut supply_chain = SourceConfig::new("supply_chain", 9);
    supply_chain.api_key_env = Some("ECOSCAN_SUPPLY_CHAIN_KEY".to_string());

    let mut carbon = SourceConfig::new("carbon", 8);
    carbon.api_key_env = Some("ECOSCAN_CARBON_KEY".to_string());
    carbon.fallback_chain = vec!["carbon_backup".to_string()];

    let mut carbon_backup = SourceConfig::new("carbon_backup", 6);
    carbon_backup.kind = Some("carbon".to_string());
    carbon_backup.enabled = false;
    carbon_backup.api_key_env = Some("ECOSCAN_CARBON_BACKUP_KEY".to_string());

    let mut certifications = SourceConfig::new("certifications", 7);
    certifications.api_key_env = Some("ECOSCAN_CERTIFICATIONS_KEY".to_string());
    certifications.cache_ttl_hours = 72.0;

    let mut barcode = SourceConfig::new("barcode", 6);
    barcode.endpoint = Some("https://world.openfoodfacts.org".to_string());
    barcode.rate_limit_per_second = 1;
    barcode.cache_ttl_hours = 168.0;

    let mut ai_analysis = SourceConfig::new("ai_analysis", 5);
    ai_analysis.api_key_env = Some("ECOSCAN_AI_KEY".to_string());
    ai_analysis.timeout_ms = 8_000;
    ai_analysis.rate_limit_per_second = 2;

    let mut pricing = SourceConfig::new("pricing", 3);
    pricing.api_key_env = Some("ECOSCAN_PRICING_KEY".to_string());
    pricing.cache_ttl_hours = 6.0;

    let mut image_search = SourceConfig::new("image_search", 2);
    image_search.api_key_env = Some("ECOSCAN_IMAGE_KEY".to_string());

    vec![
        supply_chain,
        carbon,
        carbon_backup,
        certifications,
        barcode,
        ai_analysis,
        pricing,
        image_search,
    ]
}
