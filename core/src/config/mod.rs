use crate::render::RenderFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DRAWBRIDGE_DIR: &str = ".drawbridge";

pub const BACKEND_ENV: &str = "DRAWBRIDGE_BACKEND";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// One of `serve`, `oneshot`, `http`, `stub`.
    pub backend: String,
    pub binary: Option<String>,
    pub base_url: Option<String>,
    /// Engine selector sent with every render unless a call overrides it.
    pub engine: Option<String>,
    pub format: RenderFormat,
    pub theme: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: "serve".to_string(),
            binary: None,
            base_url: None,
            engine: None,
            format: RenderFormat::Svg,
            theme: None,
        }
    }
}

pub fn get_drawbridge_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(DRAWBRIDGE_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_drawbridge_dir().join("config.toml")
}

impl Config {
    /// Loads `path` (or the default location) when it exists, falling back
    /// to defaults, then applies environment overrides.
    pub fn load_or_init(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
        let mut config = if path.exists() {
            load_config_from(&path)?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Config::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(binary) = lookup(crate::backends::protocol::BINARY_ENV) {
            self.binary = Some(binary);
        }
        if let Some(backend) = lookup(BACKEND_ENV) {
            self.backend = backend;
        }
    }
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!("Config file not found at {}", path.display())
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", path.display(), e)
        }
    })?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))
}

pub fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }

    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}
