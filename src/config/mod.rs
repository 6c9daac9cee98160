pub mod schema;

pub use schema::BridgeConfig;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default bridge home directory (~/.picobridge), used when `--home` is
/// not given.
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".picobridge"))
        .unwrap_or_else(|| PathBuf::from(".picobridge"))
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read picobridge config file")?;
        let config: BridgeConfig =
            toml::from_str(&contents).context("Failed to parse picobridge config (TOML)")?;
        Ok(config)
    } else {
        Ok(BridgeConfig::default())
    }
}
