//! `AppConfig` test helpers shared by library and CLI tests.

use quickpack::config::{AppConfig, AppConfigBuilder};
use std::path::Path;

/// Standard test configuration with colors disabled.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfigBuilder::default().use_colors(false).build()
}

/// Test configuration with colors enabled, for formatting tests.
#[must_use]
pub fn test_config_with_colors() -> AppConfig {
    AppConfigBuilder::default().use_colors(true).build()
}

#[must_use]
pub fn test_config_verbose() -> AppConfig {
    AppConfigBuilder::default()
        .use_colors(false)
        .verbose(true)
        .build()
}

/// Test configuration reading the setup document at `setup_file`.
pub fn test_config_with_setup_file<P: AsRef<Path>>(setup_file: P) -> AppConfig {
    AppConfigBuilder::default()
        .setup_file(setup_file.as_ref())
        .use_colors(false)
        .build()
}
