//! Assistant configuration loaded from TOML with environment overrides

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Directory name used under the platform config/data dirs
const APP_DIR: &str = "chatcal";

const CONFIG_FILE: &str = "config.toml";

const DB_FILE: &str = "calendar.db";

/// Top-level configuration (config.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub phrasing: Phrasing,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Remote generative backend settings ([backend] section)
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { "http://localhost:8000/v1".to_string() }
fn default_model() -> String { "openai/gpt-oss-20b".to_string() }
fn default_api_key_env() -> String { "CHATCAL_API_KEY".to_string() }
fn default_timeout_secs() -> u64 { 20 }

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Reply phrasing ([phrasing] section). A fixed seed makes phrase
/// selection deterministic.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Phrasing {
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Event store location ([store] section)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Configured path or `<data_dir>/chatcal/calendar.db`
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join(DB_FILE)
        })
    }
}

/// Default config location: `<config_dir>/chatcal/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

impl AssistantConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Load config from `path` (or the default location). A missing file
    /// yields defaults; environment overrides are applied either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

        let mut config = if path.exists() {
            debug!(path = %path.display(), "loading config");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read: {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Invalid config: {}", path.display()))?
        } else {
            debug!(path = %path.display(), "config not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay `CHATCAL_LLM_URL` and `CHATCAL_LLM_MODEL`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CHATCAL_LLM_URL").filter(|v| !v.is_empty()) {
            self.backend.base_url = url;
        }
        if let Some(model) = lookup("CHATCAL_LLM_MODEL").filter(|v| !v.is_empty()) {
            self.backend.model = model;
        }
    }
}
