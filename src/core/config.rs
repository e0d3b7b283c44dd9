use crate::core::manager::RatePolicy;
use crate::core::rate::Rate;
use crate::providers::rendered::default_browser_args;
use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_SOURCE_URL: &str = "https://abokiforex.app/dollar-to-naira-black-market";
pub const DEFAULT_SELECTOR: &str = "#usdSell";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Plain HTTP GET and HTML parse.
    Http,
    /// Headless browser render, for pages that fill the rate in with scripts.
    #[default]
    Rendered,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BrowserConfig {
    #[serde(default = "default_browser_program")]
    pub program: String,
    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            program: default_browser_program(),
            args: default_browser_args(),
        }
    }
}

fn default_browser_program() -> String {
    "google-chrome".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_source_url")]
    pub url: String,
    #[serde(default = "default_selector")]
    pub selector: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            url: default_source_url(),
            selector: default_selector(),
            timeout_secs: default_timeout_secs(),
            browser: BrowserConfig::default(),
        }
    }
}

impl SourceConfig {
    /// Ceiling for a single fetch attempt.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_selector() -> String {
    DEFAULT_SELECTOR.to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RefreshConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub freshness_secs: u64,
    pub backup_max_age_secs: u64,
    pub interval_secs: u64,
    pub fallback_rate: Option<f64>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1000,
            freshness_secs: 3600,
            backup_max_age_secs: 86400,
            interval_secs: 3600,
            fallback_rate: None,
        }
    }
}

impl RefreshConfig {
    pub fn to_policy(&self) -> Result<RatePolicy> {
        if self.max_attempts == 0 {
            anyhow::bail!("refresh.max_attempts must be at least 1");
        }
        if self.interval_secs == 0 {
            anyhow::bail!("refresh.interval_secs must be at least 1");
        }
        let fallback_rate = match self.fallback_rate {
            Some(value) => Some(
                Rate::new(value)
                    .ok_or_else(|| anyhow!("refresh.fallback_rate must be positive: {value}"))?,
            ),
            None => None,
        };

        Ok(RatePolicy {
            max_attempts: self.max_attempts,
            backoff_unit: Duration::from_millis(self.backoff_ms),
            freshness: Duration::from_secs(self.freshness_secs),
            backup_max_age: Duration::from_secs(self.backup_max_age_secs),
            refresh_interval: Duration::from_secs(self.interval_secs),
            fallback_rate,
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub backup_path: Option<String>,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no config file exists.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ng", "nairaprice", "nairaprice")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn backup_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.backup_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("ng", "nairaprice", "nairaprice")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("last_rate.json"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies `PORT` and `GOOGLE_CHROME_BIN` from the environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(
            std::env::var("PORT").ok(),
            std::env::var("GOOGLE_CHROME_BIN").ok(),
        )
    }

    fn apply_overrides(mut self, port: Option<String>, chrome_bin: Option<String>) -> Result<Self> {
        if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT: {port}"))?;
        }
        if let Some(bin) = chrome_bin.filter(|b| !b.trim().is_empty()) {
            self.source.browser.program = bin;
        }
        Ok(self)
    }
}
