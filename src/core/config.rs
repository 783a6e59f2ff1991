use crate::core::quota::QuotaPolicy;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_MINDICADOR_URL: &str = "https://mindicador.cl";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    /// Primary multi-indicator endpoint.
    #[serde(default = "default_mindicador")]
    pub mindicador: ProviderConfig,
    /// Currency cross-rate provider for USD and EUR.
    #[serde(default)]
    pub cross_rate: Option<ProviderConfig>,
    /// USD price of bitcoin.
    #[serde(default)]
    pub crypto: Option<ProviderConfig>,
    /// USD per troy ounce price of gold.
    #[serde(default)]
    pub metal: Option<ProviderConfig>,
}

fn default_mindicador() -> ProviderConfig {
    ProviderConfig {
        base_url: DEFAULT_MINDICADOR_URL.to_string(),
    }
}

fn default_retries() -> usize {
    2
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            mindicador: default_mindicador(),
            cross_rate: None,
            crypto: None,
            metal: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub quota: QuotaPolicy,
    /// Retry attempts for each remote call after the first one.
    #[serde(default = "default_retries")]
    pub retries: usize,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            quota: QuotaPolicy::default(),
            retries: default_retries(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults when none exists.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("cl", "cotiza", "cotiza")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("cl", "cotiza", "cotiza")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
