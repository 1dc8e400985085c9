/// CLI configuration
///
/// Layered from defaults, an optional TOML file and `LOFI_`-prefixed
/// environment variables, e.g. `LOFI_PLAYBACK__SETTLE_DELAY_MS=80` or
/// `LOFI_CATALOG__SEARCH_URL=http://localhost:3000/api/search-song`.
use crate::error::{CliError, Result};
use lofi_catalog::CatalogConfig;
use lofi_playback::{PlaybackConfig, TickSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "lofi.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default = "default_playback")]
    pub playback: PlaybackSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CatalogSettings {
    /// Search endpoint; catalog lookups are disabled when unset
    pub search_url: Option<String>,

    pub download_proxy: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CliConfig {
    /// Load configuration from file and process environment
    ///
    /// An explicit `path` must exist; otherwise `lofi.toml` is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_sources(path, config::Environment::default())
    }

    /// Load from a file and a given environment source
    pub fn from_sources(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            env.prefix("LOFI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.playback.tick_interval_ms == 0 {
            return Err(CliError::Config(
                "playback.tick_interval_ms must be positive".to_string(),
            ));
        }
        if let Some(url) = &self.catalog.search_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(CliError::Config(format!(
                    "catalog.search_url must be an http(s) URL, got {url}"
                )));
            }
        }
        Ok(())
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig::default()
            .with_settle_delay(Duration::from_millis(self.playback.settle_delay_ms))
            .with_tick_source(TickSource::Timer(Duration::from_millis(
                self.playback.tick_interval_ms,
            )))
    }

    /// Catalog client settings, if a search endpoint is configured
    pub fn catalog_config(&self) -> Option<CatalogConfig> {
        let search_url = self.catalog.search_url.as_ref()?;
        let mut config = CatalogConfig::new(search_url.clone());
        if let Some(proxy) = &self.catalog.download_proxy {
            config = config.with_download_proxy(proxy.clone());
        }
        config.timeout = Duration::from_secs(self.catalog.timeout_secs);
        Some(config)
    }
}

// Default values
fn default_playback() -> PlaybackSettings {
    PlaybackSettings {
        settle_delay_ms: default_settle_delay_ms(),
        tick_interval_ms: default_tick_interval_ms(),
    }
}

fn default_settle_delay_ms() -> u64 {
    50
}

fn default_tick_interval_ms() -> u64 {
    50
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        settings_path: default_settings_path(),
    }
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("./data/settings.json")
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            playback: default_playback(),
            storage: default_storage(),
            catalog: CatalogSettings {
                timeout_secs: default_timeout_secs(),
                ..CatalogSettings::default()
            },
        }
    }
}
