//! Application paths for config and data.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Application paths.
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
    /// Data directory.
    pub data: PathBuf,
}

impl AppPaths {
    /// Create paths for the relaybill application.
    #[must_use]
    pub fn new() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("com", "relaybill", "relaybill") {
            Self {
                config: proj_dirs.config_dir().to_path_buf(),
                data: proj_dirs.data_dir().to_path_buf(),
            }
        } else {
            // Fallback to home directory
            let home = BaseDirs::new()
                .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
            Self {
                config: home.join(".config/relaybill"),
                data: home.join(".local/share/relaybill"),
            }
        }
    }

    /// Path to the config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Default path to the channel records file.
    #[must_use]
    pub fn channels_file(&self) -> PathBuf {
        self.data.join("channels.json")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
