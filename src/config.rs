use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::ContainerKind;

const APP_NAME: &str = "gearset-tracker";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Containers whose contents count as owned.
    pub tracked_containers: Vec<ContainerKind>,
    /// Recompute automatically on inventory changes. When off, only manual
    /// rescans and login update collected state.
    pub auto_scan: bool,
    /// Maximum number of gearsets per player.
    pub max_gearsets: usize,
    /// Offer the overmeld plan before the exact plan.
    pub prefer_overmeld: bool,
    /// Port for the HTTP API.
    pub port: u16,
    /// Optional item/materia catalog file.
    pub catalog_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracked_containers: ContainerKind::default_tracked(),
            auto_scan: true,
            max_gearsets: 100,
            prefer_overmeld: false,
            port: 17020,
            catalog_path: None,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from the user's config directory.
    /// Returns default config if file doesn't exist or fails to parse.
    pub fn load() -> Self {
        match get_config_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;

        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn is_tracked(&self, kind: ContainerKind) -> bool {
        self.tracked_containers.contains(&kind)
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
