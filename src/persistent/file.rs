use std::path::{Path, PathBuf};

use anyhow::Context;

use super::ShopConfig;

/// Single-file store for [`ShopConfig`], rewritten wholesale on every save
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing or broken file yields the empty config
    pub fn load(&self) -> ShopConfig {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no config at {}, starting unconfigured", self.path.display());
                return ShopConfig::default();
            }
            Err(e) => {
                log::warn!("cannot read config {}: {}", self.path.display(), e);
                return ShopConfig::default();
            }
        };
        match ron::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("cannot parse config {}: {}", self.path.display(), e);
                ShopConfig::default()
            }
        }
    }

    pub fn save(&self, config: &ShopConfig) -> anyhow::Result<()> {
        let raw = ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())
            .context("cannot serialize shop config")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("cannot write config to {}", self.path.display()))?;
        log::info!("config saved to {}", self.path.display());
        Ok(())
    }
}
