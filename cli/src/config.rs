// Configuration management for the dualroute CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/dualroute/config.json
// - Linux: ~/.config/dualroute/config.json
// - Windows: %APPDATA%\dualroute\config.json

use anyhow::{Context, Result};
use dualroute_core::ModelConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest link header the loopback links accept; the next hop id lives in it
pub const MIN_LINK_HEADER: usize = 4;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Routing model shared by every simulated node
    pub model: ModelConfig,

    /// Loopback link header sizes used by `send`
    pub links: LinkConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Lower-layer header bytes in front of the routing header on Wifi lanes
    pub header_wifi: usize,

    /// Same for Zigbee lanes
    pub header_zigbee: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            header_wifi: 24,
            header_zigbee: 11,
        }
    }
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("dualroute");
        Ok(config_dir)
    }

    /// Get the default config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Resolve `--config`, falling back to the per-user config file
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::config_file(),
        }
    }

    /// Load config from `path`, or defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to `path`, creating its directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.model.budget().validate()?;
        for (name, size) in [
            ("header_wifi", self.links.header_wifi),
            ("header_zigbee", self.links.header_zigbee),
        ] {
            if size < MIN_LINK_HEADER {
                anyhow::bail!(
                    "links.{} must be at least {} bytes, got {}",
                    name,
                    MIN_LINK_HEADER,
                    size
                );
            }
        }
        Ok(())
    }

    /// Directory relative route source paths are resolved against
    pub fn base_dir(path: &Path) -> Option<&Path> {
        path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        let mut values = vec![
            ("route_source_path".to_string(), self.model.route_source_path.clone()),
            ("max_payload_wifi".to_string(), self.model.max_payload_wifi.to_string()),
            ("max_payload_zigbee".to_string(), self.model.max_payload_zigbee.to_string()),
            (
                "default_node".to_string(),
                format!(
                    "{} / {:?}",
                    self.model.default_node.capability, self.model.default_node.tie_break
                ),
            ),
            ("links.header_wifi".to_string(), format!("{} bytes", self.links.header_wifi)),
            ("links.header_zigbee".to_string(), format!("{} bytes", self.links.header_zigbee)),
        ];
        for (node, params) in &self.model.nodes {
            values.push((
                format!("nodes.{}", node),
                format!("{} / {:?}", params.capability, params.tie_break),
            ));
        }
        values
    }
}
