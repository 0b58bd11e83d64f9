//! Config file loading and saving.
//!
//! The config lives at `~/.adjutant/config.json`. A missing file yields the
//! defaults; a malformed file logs a warning and yields the defaults rather
//! than refusing to start.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use super::schema::Config;
use crate::utils::data_dir;

pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

pub fn load_config() -> Config {
    let path = config_path();
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("invalid config at {}: {}; using defaults", path.display(), e);
                Config::default()
            }
        },
        Err(e) => {
            warn!("cannot read config at {}: {}; using defaults", path.display(), e);
            Config::default()
        }
    }
}

pub fn save_config(config: &Config) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
