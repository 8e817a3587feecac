//! Configuration management for sesomnodd.
//!
//! Loads settings from /etc/sesomnod/config.toml (or ./config.toml for
//! local runs) and then overlays the deployment environment variables.
//! Secrets are only ever taken from the environment; the TOML file
//! carries tunables.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use tracing::{info, warn};

/// Config file path on the container image.
pub const CONFIG_PATH: &str = "/etc/sesomnod/config.toml";

/// Fallback config path for local development.
pub const LOCAL_CONFIG_PATH: &str = "config.toml";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address; the hosting platform routes to all interfaces.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port; overridden by $PORT.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Telegram bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token ($TELEGRAM_TOKEN).
    #[serde(default)]
    pub token: String,

    /// Target chat id ($TELEGRAM_CHAT_ID).
    #[serde(default)]
    pub chat_id: String,

    #[serde(default = "default_telegram_base")]
    pub api_base: String,
}

fn default_telegram_base() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_base(),
        }
    }
}

/// Odds data provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsConfig {
    /// The Odds API key ($ODDS_API_KEY).
    #[serde(default)]
    pub api_key: String,

    /// Football-Data.org key ($FOOTBALL_DATA_KEY), optional.
    #[serde(default)]
    pub football_data_key: String,

    #[serde(default = "default_odds_base")]
    pub odds_api_base: String,

    #[serde(default = "default_football_data_base")]
    pub football_data_base: String,

    /// Bookmaker regions passed to The Odds API.
    #[serde(default = "default_regions")]
    pub regions: String,
}

fn default_odds_base() -> String {
    "https://api.the-odds-api.com".to_string()
}

fn default_football_data_base() -> String {
    "https://api.football-data.org".to_string()
}

fn default_regions() -> String {
    "eu".to_string()
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            football_data_key: String::new(),
            odds_api_base: default_odds_base(),
            football_data_base: default_football_data_base(),
            regions: default_regions(),
        }
    }
}

/// Hosted Postgres (Supabase SQL-over-HTTP) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Personal access token ($SUPABASE_PAT).
    #[serde(default)]
    pub pat: String,

    /// Project ref ($SUPABASE_PROJECT).
    #[serde(default)]
    pub project: String,

    #[serde(default = "default_db_base")]
    pub api_base: String,
}

fn default_db_base() -> String {
    "https://api.supabase.com".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            pat: String::new(),
            project: String::new(),
            api_base: default_db_base(),
        }
    }
}

/// Internal scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Disable when an external cron service drives the endpoints.
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// Minutes between scheduler ticks.
    #[serde(default = "default_tick_minutes")]
    pub tick_minutes: u64,

    /// CET hour for the daily analysis run.
    #[serde(default = "default_analysis_hour")]
    pub analysis_hour: u32,

    /// CET hour for the daily summary post.
    #[serde(default = "default_summary_hour")]
    pub summary_hour: u32,
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_tick_minutes() -> u64 {
    30
}

fn default_analysis_hour() -> u32 {
    6
}

fn default_summary_hour() -> u32 {
    23
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            tick_minutes: default_tick_minutes(),
            analysis_hour: default_analysis_hour(),
            summary_hour: default_summary_hour(),
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub odds: OddsConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Load config from file (or defaults), then apply env overrides.
    pub fn load() -> Self {
        let mut config = Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(LOCAL_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            });
        config.overlay(&env_vars());
        config
    }

    fn load_from_path(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path);
        Ok(config)
    }

    /// Apply the deployment environment contract on top of file values.
    pub fn overlay(&mut self, vars: &HashMap<String, String>) {
        if let Some(v) = vars.get("TELEGRAM_TOKEN") {
            self.telegram.token = v.clone();
        }
        if let Some(v) = vars.get("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v.clone();
        }
        if let Some(v) = vars.get("ODDS_API_KEY") {
            self.odds.api_key = v.clone();
        }
        if let Some(v) = vars.get("FOOTBALL_DATA_KEY") {
            self.odds.football_data_key = v.clone();
        }
        if let Some(v) = vars.get("SUPABASE_PAT") {
            self.database.pat = v.clone();
        }
        if let Some(v) = vars.get("SUPABASE_PROJECT") {
            self.database.project = v.clone();
        }
        if let Some(v) = vars.get("PORT") {
            match v.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid PORT value: {}", v),
            }
        }
    }
}

fn env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.scheduler.analysis_hour, 6);
        assert_eq!(config.scheduler.summary_hour, 23);
        assert_eq!(config.odds.regions, "eu");
        assert!(config.scheduler.enabled);
    }

    #[test]
    fn test_parse_toml_partial() {
        let toml_str = r#"
[server]
port = 8080

[scheduler]
enabled = false
tick_minutes = 15
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.tick_minutes, 15);
        // Defaults for untouched sections
        assert_eq!(config.odds.odds_api_base, "https://api.the-odds-api.com");
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_env_overlay() {
        let mut config = Config::default();
        let vars: HashMap<String, String> = [
            ("TELEGRAM_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-10042"),
            ("ODDS_API_KEY", "odds-key"),
            ("SUPABASE_PAT", "sbp_secret"),
            ("SUPABASE_PROJECT", "myproject"),
            ("PORT", "9000"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        config.overlay(&vars);
        assert_eq!(config.telegram.token, "123:abc");
        assert_eq!(config.telegram.chat_id, "-10042");
        assert_eq!(config.odds.api_key, "odds-key");
        assert_eq!(config.database.pat, "sbp_secret");
        assert_eq!(config.database.project, "myproject");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_env_overlay_invalid_port_kept() {
        let mut config = Config::default();
        let vars: HashMap<String, String> =
            [("PORT".to_string(), "not-a-port".to_string())].into_iter().collect();
        config.overlay(&vars);
        assert_eq!(config.server.port, 8000);
    }
}
