use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where interpretation and attack requests are sent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColormapConfig {
    pub name: String,
    pub nshades: usize,  // Clamped to [6, 72] when the scale is built
}

impl Default for ColormapConfig {
    fn default() -> Self {
        Self {
            name: "copper".to_string(),
            nshades: 20,
        }
    }
}

/// Background colors for HotFlip diffs (hex strings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    pub removed: String,
    pub added: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            removed: "#FF5733".to_string(),
            added: "#26BD19".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tokens highlighted per saliency map before the slider is touched
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub colormap: ColormapConfig,

    #[serde(default)]
    pub markers: MarkerConfig,

    /// Desktop notification when a word-flip attack finishes
    #[serde(default)]
    pub notifications: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            backend: BackendConfig::default(),
            colormap: ColormapConfig::default(),
            markers: MarkerConfig::default(),
            notifications: false,
        }
    }
}

fn default_top_k() -> usize {
    3
}

fn default_timeout() -> u64 {
    30
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("salience");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match Self::parse(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
            return Ok(AppConfig::default());
        }

        let config = AppConfig::default();
        if let Err(e) = config.save() {
            tracing::debug!("Could not write default config: {}", e);
        }
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        // Trailing slashes would double up when request paths are joined
        let mut clean_config = self.clone();
        clean_config.backend.url = clean_config.backend.url.trim_end_matches('/').to_string();

        let content = toml::to_string_pretty(&clean_config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
