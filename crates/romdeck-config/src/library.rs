//! Library path configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem layout of the ROM library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Root of the watched ROM tree; one subdirectory per platform
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// Root of the per-user asset tree (saves, states, screenshots)
    #[serde(default = "default_assets_path")]
    pub assets_path: PathBuf,

    /// Location of the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_base_path() -> PathBuf {
    PathBuf::from("/roms/library")
}

fn default_assets_path() -> PathBuf {
    PathBuf::from("/roms/assets")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("/roms/.romdeck/romdeck.db")
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            assets_path: default_assets_path(),
            database_path: default_database_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: LibraryConfig = toml::from_str(r#"base_path = "/data/roms""#).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/data/roms"));
        assert_eq!(config.assets_path, default_assets_path());
        assert_eq!(config.database_path, default_database_path());
    }
}
