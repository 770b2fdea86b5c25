//! Configuration Loader
//!
//! Layers configuration from defaults, files and environment variables, in
//! increasing order of precedence.

use crate::config::HelpdeskConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_BASENAME: &str = "helpdesk";
const APP_DIR: &str = "helpdesk";

/// Configuration loader that handles multiple sources with precedence
pub struct ConfigLoader {
    base_config: HelpdeskConfig,
    config_paths: Vec<PathBuf>,
    load_from_env: bool,
    validate: bool,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_config: HelpdeskConfig::default(),
            config_paths: Self::get_default_config_paths(),
            load_from_env: true,
            validate: true,
        }
    }

    #[must_use]
    pub fn with_base_config(mut self, config: HelpdeskConfig) -> Self {
        self.base_config = config;
        self
    }

    /// Add a configuration file path, tried after the existing ones
    #[must_use]
    pub fn add_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Replace the configuration file paths
    #[must_use]
    pub fn with_config_paths<P: AsRef<Path>>(mut self, paths: Vec<P>) -> Self {
        self.config_paths = paths
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        self
    }

    #[must_use]
    pub fn with_env_loading(mut self, enabled: bool) -> Self {
        self.load_from_env = enabled;
        self
    }

    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Load configuration from all sources
    ///
    /// Unreadable files are skipped with a warning; a malformed environment
    /// or a final configuration that fails validation is an error.
    ///
    /// # Errors
    /// Returns an error if environment overrides cannot be parsed or
    /// validation fails
    pub fn load(&self) -> Result<HelpdeskConfig> {
        let mut config = self.base_config.clone();
        debug!("Starting configuration loading");

        for path in &self.config_paths {
            if !path.exists() {
                debug!("Configuration file not found: {}", path.display());
                continue;
            }
            match HelpdeskConfig::from_file(path) {
                Ok(file_config) => {
                    config.merge_with(&file_config);
                    info!("Loaded configuration from: {}", path.display());
                }
                Err(e) => {
                    warn!(
                        "Failed to load configuration from {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        if self.load_from_env {
            let env_config = HelpdeskConfig::from_env()?;
            config.merge_with(&env_config);
            debug!("Applied environment overrides");
        }

        if self.validate {
            config.validate()?;
            debug!("Configuration validation passed");
        }

        Ok(config)
    }

    /// Default configuration file paths, lowest precedence first
    #[must_use]
    pub fn get_default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for dir in [
            Self::get_system_config_dir(),
            Self::get_user_config_dir(),
            PathBuf::from("."),
        ] {
            for ext in ["json", "yaml", "yml"] {
                paths.push(dir.join(format!("{CONFIG_BASENAME}.{ext}")));
            }
        }
        paths
    }

    #[must_use]
    pub fn get_user_config_dir() -> PathBuf {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg).join(APP_DIR)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".config").join(APP_DIR)
        } else if let Ok(appdata) = std::env::var("APPDATA") {
            PathBuf::from(appdata).join(APP_DIR)
        } else {
            PathBuf::from("~/.config").join(APP_DIR)
        }
    }

    #[must_use]
    pub fn get_system_config_dir() -> PathBuf {
        if cfg!(target_os = "macos") {
            PathBuf::from("/Library/Application Support").join(APP_DIR)
        } else if cfg!(target_os = "windows") {
            PathBuf::from("C:\\ProgramData").join(APP_DIR)
        } else {
            PathBuf::from("/etc").join(APP_DIR)
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration from the default locations and the environment
///
/// # Errors
/// Returns an error if the merged configuration is invalid
pub fn load_config() -> Result<HelpdeskConfig> {
    ConfigLoader::new().load()
}

/// Load configuration from explicit files only
///
/// # Errors
/// Returns an error if the merged configuration is invalid
pub fn load_config_with_paths<P: AsRef<Path>>(paths: Vec<P>) -> Result<HelpdeskConfig> {
    ConfigLoader::new()
        .with_config_paths(paths)
        .with_env_loading(false)
        .load()
}
