use std::path::PathBuf;

use thiserror::Error;

use crate::{config::AppConfig, fs::FileSystemError};

/// Port for loading the tool configuration from disk
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
pub trait ConfigLoader: Send + Sync {
    /// Load configuration from the standard location, falling back to defaults when no file
    /// exists there
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError`] if the location cannot be determined, more than one config
    /// file is present, or the file is invalid.
    fn load_config(&self) -> Result<AppConfig, ConfigLoadError>;

    /// Config files present in the configuration directory
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError::FileSystemError`] if the directory cannot be determined.
    fn find_config_file_paths(&self) -> Result<Vec<PathBuf>, ConfigLoadError>;
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error(transparent)]
    FileSystemError(#[from] FileSystemError),

    #[error("Multiple configuration files found: {}", .0.join(", "))]
    MultipleFound(Vec<String>),

    #[error(transparent)]
    ConfigError(#[from] ::config::ConfigError),
}

/// Applies runtime CLI arguments on top of the configuration read from the config file
pub trait ApplyToConfig {
    /// Apply the arguments in `self` after/on top of `config`
    fn apply_to_config(&self, config: AppConfig) -> AppConfig;
}
