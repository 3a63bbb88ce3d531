pub mod common;

use common::{get_command_with_test_config, setup_default_test_config, setup_test_config};
use predicates::prelude::*;

#[test]
fn test_validate_valid_config() {
    let yaml = r#"
python: "python3"
index_url: "https://pypi.org"
command_timeout: 300
"#;

    let temp_dir = setup_test_config(yaml);
    let mut cmd = get_command_with_test_config(&temp_dir);
    cmd.args(["config", "validate"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("config.yaml"));
}

#[test]
fn test_validate_without_config_file_uses_defaults() {
    let temp_dir = setup_default_test_config();
    let mut cmd = get_command_with_test_config(&temp_dir);
    cmd.args(["config", "validate"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("defaults (no config file)"));
}

#[test]
fn test_validate_unsupported_index_scheme() {
    let yaml = r#"
index_url: "ftp://mirror.example.com"
"#;

    let temp_dir = setup_test_config(yaml);
    let mut cmd = get_command_with_test_config(&temp_dir);
    cmd.args(["config", "validate"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains("url_format"));
}

#[test]
fn test_validate_warnings_do_not_fail() {
    let yaml = r#"
command_timeout: 2
"#;

    let temp_dir = setup_test_config(yaml);
    let mut cmd = get_command_with_test_config(&temp_dir);
    cmd.args(["config", "validate"]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("command_timeout"));
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let yaml = r#"
command_timeout: "not-a-number"
"#;

    let temp_dir = setup_test_config(yaml);
    let mut cmd = get_command_with_test_config(&temp_dir);
    cmd.args(["config", "validate"]);

    cmd.assert().failure().stderr(predicate::str::contains("Error"));
}
