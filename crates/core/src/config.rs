//! Engine configuration.
//!
//! Values resolve in layers: compiled defaults, then an optional
//! `macromatch.toml` patch, then `MACROMATCH_*` environment variables, then
//! programmatic overrides. The merged result is validated before use.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::DEFAULT_FRESHNESS_DAYS;
use crate::matching::{ScoringWeights, SearchConfig, DEFAULT_RANK_MIN_CONFIDENCE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:macromatch.db".to_string(),
            max_connections: 5,
            connect_timeout_secs: 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Trailing observation window applied to snapshot reads.
    pub freshness_days: u32,
    /// Confidence floor applied when ranking items.
    pub min_confidence: f64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            freshness_days: DEFAULT_FRESHNESS_DAYS,
            min_confidence: DEFAULT_RANK_MIN_CONFIDENCE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Fully merged engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub scoring: ScoringWeights,
    pub search: SearchConfig,
    pub cache: CacheConfig,
}

/// Programmatic overrides, applied after file and environment layers.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub freshness_days: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Explicit config file path. When unset, `macromatch.toml` in the
    /// working directory is used if present.
    pub config_path: Option<PathBuf>,
    /// Fail when the explicit path does not exist instead of falling back
    /// to defaults.
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

impl EngineConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = options
            .config_path
            .clone()
            .or_else(|| Some(PathBuf::from("macromatch.toml")).filter(|p| p.exists()));
        if let Some(path) = path {
            if path.exists() {
                config.apply_file(&path)?;
            } else if options.require_file {
                return Err(ConfigError::Read {
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                    path,
                });
            }
        }

        config.apply_env()?;
        config.apply_overrides(&options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let patch: ConfigPatch = toml::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        patch.apply(self);
        debug!(event_name = "config_file_applied", path = %path.display(), "config file applied");
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("MACROMATCH_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(value) = parse_env("MACROMATCH_DATABASE_MAX_CONNECTIONS")? {
            self.database.max_connections = value;
        }
        if let Some(value) = parse_env("MACROMATCH_CACHE_TTL_SECS")? {
            self.cache.ttl_secs = value;
        }
        if let Some(value) = parse_env("MACROMATCH_CATALOG_FRESHNESS_DAYS")? {
            self.catalog.freshness_days = value;
        }
        if let Some(value) = parse_env("MACROMATCH_CATALOG_MIN_CONFIDENCE")? {
            self.catalog.min_confidence = value;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.database_url {
            self.database.url = url.clone();
        }
        if let Some(ttl) = overrides.cache_ttl_secs {
            self.cache.ttl_secs = ttl;
        }
        if let Some(days) = overrides.freshness_days {
            self.catalog.freshness_days = days;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(invalid("database.url", "must be a sqlite: URL"));
        }
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections", "must be at least 1"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "must be at least 1"));
        }
        if self.catalog.freshness_days == 0 {
            return Err(invalid("catalog.freshness_days", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.catalog.min_confidence) {
            return Err(invalid("catalog.min_confidence", "must be within [0, 1]"));
        }
        if self.search.protein_pool_min_grams <= 0.0 || self.search.carb_pool_min_grams <= 0.0 {
            return Err(invalid("search", "pool thresholds must be positive"));
        }
        if self.search.attempt_multiplier == 0 || self.search.pool_scan_limit == 0 {
            return Err(invalid("search", "attempt_multiplier and pool_scan_limit must be at least 1"));
        }
        if self.search.acceptance_band < 1.0 {
            return Err(invalid("search.acceptance_band", "must be at least 1.0"));
        }
        if self.search.overshoot_band < self.search.acceptance_band {
            return Err(invalid("search.overshoot_band", "must not be below acceptance_band"));
        }
        if self.scoring.confidence < 0.0
            || self.scoring.popularity_per_selection < 0.0
            || self.scoring.popularity_cap < 0.0
        {
            return Err(invalid("scoring", "weights must be non-negative"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid { name, reason: reason.to_string() }
}

fn parse_env<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|err: T::Err| ConfigError::Invalid { name, reason: err.to_string() }),
        Err(_) => Ok(None),
    }
}

/// Optional-field mirror of [`EngineConfig`] for TOML patches.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigPatch {
    database: DatabasePatch,
    catalog: CatalogPatch,
    scoring: Option<ScoringWeights>,
    search: Option<SearchConfig>,
    cache: CachePatch,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogPatch {
    freshness_days: Option<u32>,
    min_confidence: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CachePatch {
    ttl_secs: Option<u64>,
}

impl ConfigPatch {
    fn apply(self, config: &mut EngineConfig) {
        if let Some(url) = self.database.url {
            config.database.url = url;
        }
        if let Some(max) = self.database.max_connections {
            config.database.max_connections = max;
        }
        if let Some(timeout) = self.database.connect_timeout_secs {
            config.database.connect_timeout_secs = timeout;
        }
        if let Some(days) = self.catalog.freshness_days {
            config.catalog.freshness_days = days;
        }
        if let Some(min) = self.catalog.min_confidence {
            config.catalog.min_confidence = min;
        }
        if let Some(scoring) = self.scoring {
            config.scoring = scoring;
        }
        if let Some(search) = self.search {
            config.search = search;
        }
        if let Some(ttl) = self.cache.ttl_secs {
            config.cache.ttl_secs = ttl;
        }
    }
}
