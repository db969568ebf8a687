use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    debounce::DEFAULT_DEBOUNCE, provider::FORECAST_DAYS, provider::weatherapi::DEFAULT_BASE_URL,
    screen::StalePolicy,
};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// debounce_ms = 1200
/// stale_policy = "discard-superseded"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WeatherAPI.com key.
    pub api_key: Option<String>,

    /// Override for the service base URL.
    pub base_url: Option<String>,

    /// Quiet period before a typed query is searched.
    pub debounce_ms: u64,

    pub forecast_days: u8,

    pub stale_policy: StalePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            forecast_days: FORECAST_DAYS,
            stale_policy: StalePolicy::default(),
        }
    }
}

impl Config {
    /// Return the API key or an error with a hint on how to set it.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `citycast configure` and enter your WeatherAPI.com key."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Load the config from the platform config directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load the config at `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents)
                .with_context(|| format!("Invalid citycast config in {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => {
                Err(e).with_context(|| format!("Cannot read citycast config {}", path.display()))
            }
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        if cfg.forecast_days == 0 {
            return Err(anyhow!("forecast_days must be at least 1"));
        }
        Ok(cfg)
    }

    /// Save to the platform config directory and return the file written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write the config as TOML to `path`, creating its directory first.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
        if let Some(dir) = dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create config directory {}", dir.display()))?;
        }

        let text = toml::to_string_pretty(self).context("Cannot encode citycast config")?;
        fs::write(path, text)
            .with_context(|| format!("Cannot write citycast config {}", path.display()))
    }

    /// `<platform config dir>/citycast/config.toml`.
    pub fn config_file_path() -> Result<PathBuf> {
        ProjectDirs::from("dev", "citycast", "citycast")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or_else(|| anyhow!("No config directory is available on this platform"))
    }
}
