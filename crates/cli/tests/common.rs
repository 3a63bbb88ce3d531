#![allow(dead_code)]

use std::fs;

use assert_cmd::Command;
use tempfile::TempDir;
use test_common::CONFIG_DIR_ENV;

/// A config directory with no config file, so defaults apply
#[must_use]
pub fn setup_default_test_config() -> TempDir {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp_dir.path().join("config")).unwrap();
    temp_dir
}

/// A config directory holding `config.yaml` with `config_yaml`
#[must_use]
pub fn setup_test_config(config_yaml: &str) -> TempDir {
    let temp_dir = setup_default_test_config();
    fs::write(temp_dir.path().join("config").join("config.yaml"), config_yaml).unwrap();
    temp_dir
}

/// The binary, pointed at the config directory inside `temp_dir`
#[must_use]
pub fn get_command_with_test_config(temp_dir: &TempDir) -> Command {
    let mut cmd = get_command();
    cmd.env(CONFIG_DIR_ENV, temp_dir.path().join("config"));
    cmd.env_remove("QUICKPACK_LOG");
    cmd
}

#[must_use]
pub fn get_command() -> Command {
    Command::cargo_bin("quickpack").unwrap()
}
