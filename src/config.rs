//! Server configuration loaded from `hub.toml`.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//! A few values can be overridden from the environment so containers do not
//! need a config file at all.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "hub.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub cors_max_age_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            cors_max_age_secs: 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub replay_dir: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("hub.db"),
            replay_dir: PathBuf::from("data/r"),
            max_connections: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_days: i64,
    /// SHA-256 iterations applied to salted passwords.
    pub hash_rounds: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: 30,
            hash_rounds: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Weight `C` of the prior in the Bayesian level rating.
    pub prior_weight: f64,
    /// Prior mean used while nobody has rated anything yet.
    pub default_prior_mean: f64,
    /// Number of best records averaged into a player's rating.
    pub rating_top_n: usize,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub page_size: u32,
    pub max_page_size: u32,
    pub around_default: u32,
    pub around_max: u32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            prior_weight: 5.0,
            default_prior_mean: 5.5,
            rating_top_n: 30,
            cache_ttl_secs: 60,
            cache_max_entries: 1024,
            page_size: 20,
            max_page_size: 100,
            around_default: 3,
            around_max: 25,
        }
    }
}

impl HubConfig {
    /// Loads the config file (if any), applies env overrides and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str::<HubConfig>(&content).map_err(|e| {
                log::error!("Failed to parse TOML file {:?}: {}", path, e);
                AppError::Config(format!("{}: {}", path.display(), e))
            })?
        } else {
            log::warn!("CONFIG: {:?} not found, using defaults", path);
            HubConfig::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(bind) = var("HUB_BIND") {
            self.server.bind = bind;
        }
        if let Some(db) = var("HUB_DATABASE") {
            self.database.path = PathBuf::from(db);
        }
        if let Some(dir) = var("HUB_REPLAY_DIR") {
            self.database.replay_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.ranking;
        if !(r.prior_weight >= 0.0) {
            return Err(invalid("ranking.prior_weight must be >= 0"));
        }
        if !(1.0..=10.0).contains(&r.default_prior_mean) {
            return Err(invalid("ranking.default_prior_mean must be within 1..=10"));
        }
        if r.rating_top_n == 0 {
            return Err(invalid("ranking.rating_top_n must be >= 1"));
        }
        if r.page_size == 0 || r.max_page_size < r.page_size {
            return Err(invalid("ranking.max_page_size must be >= page_size >= 1"));
        }
        if r.around_default > r.around_max {
            return Err(invalid("ranking.around_default must be <= around_max"));
        }
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections must be >= 1"));
        }
        if self.auth.hash_rounds == 0 || self.auth.session_ttl_days <= 0 {
            return Err(invalid("auth.hash_rounds and auth.session_ttl_days must be positive"));
        }
        Ok(())
    }
}

fn var(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            log::info!("CONFIG: {key} overridden from environment");
            Some(value)
        }
        _ => None,
    }
}

fn invalid(msg: &str) -> AppError {
    AppError::Config(msg.to_string())
}
