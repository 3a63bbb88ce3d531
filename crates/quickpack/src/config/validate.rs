use std::path::{Path, PathBuf};

use url::Url;

use crate::validation::{ValidationErrorCategory, ValidationIssue, ValidationIssues};

use super::AppConfig;

/// Commands that finish faster than this are unlikely to build a distribution
const MIN_SENSIBLE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    /// The config file that was validated, if one was found
    pub(crate) config_file_path: Option<PathBuf>,

    pub(crate) issues: ValidationIssues,
}

impl ValidationResult {
    #[must_use]
    pub fn config_file_path(&self) -> Option<&PathBuf> {
        self.config_file_path.as_ref()
    }

    #[must_use]
    pub fn issues(&self) -> &ValidationIssues {
        &self.issues
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues.has_errors()
    }
}

impl AppConfig {
    /// Full validation for the `AppConfig`
    #[must_use]
    pub fn validate(&self, config_file_path: Option<PathBuf>) -> ValidationResult {
        let mut issues = Vec::new();

        issues.extend(validate_non_empty("python", &self.python, "python3"));
        issues.extend(validate_non_empty("shell", &self.shell, "/bin/sh"));
        issues.extend(validate_index_url(&self.index_url));
        issues.extend(validate_timeout(self.command_timeout.get()));
        issues.extend(validate_setup_file(&self.setup_file));

        ValidationResult {
            config_file_path,
            issues: issues.into(),
        }
    }
}

fn validate_non_empty(field: &str, value: &str, example: &str) -> Option<ValidationIssue> {
    value.trim().is_empty().then(|| {
        ValidationIssue::error(
            ValidationErrorCategory::RequiredField,
            field,
            &format!("The `{field}` field exists, but has no value"),
            Some(&format!("Set a value for `{field}`. Ex. `{field}: {example}`")),
        )
    })
}

fn validate_index_url(url: &Url) -> Option<ValidationIssue> {
    match url.scheme() {
        "https" => None,
        "http" => Some(ValidationIssue::warning(
            ValidationErrorCategory::UrlFormat,
            "index_url",
            "The package index is reached over plain HTTP",
            Some("Use an `https://` index URL"),
        )),
        other => Some(ValidationIssue::error(
            ValidationErrorCategory::UrlFormat,
            "index_url",
            &format!("Unsupported URL scheme `{other}` for the package index"),
            Some("Use an `https://` index URL. Ex. `index_url: https://pypi.org`"),
        )),
    }
}

fn validate_timeout(secs: u64) -> Option<ValidationIssue> {
    (secs < MIN_SENSIBLE_TIMEOUT_SECS).then(|| {
        ValidationIssue::warning(
            ValidationErrorCategory::InvalidValue,
            "command_timeout",
            &format!("A timeout of {secs}s will likely kill the host toolchain mid-build"),
            Some("Raise `command_timeout`. Ex. `command_timeout: 600`"),
        )
    })
}

fn validate_setup_file(setup_file: &Path) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if setup_file.as_os_str().is_empty() {
        issues.push(ValidationIssue::error(
            ValidationErrorCategory::RequiredField,
            "setup_file",
            "The `setup_file` field exists, but has no value",
            Some("Set a value for `setup_file`. Ex. `setup_file: quickpack.yml`"),
        ));
        return issues;
    }

    let is_yaml = setup_file
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "yml" | "yaml"));

    if !is_yaml {
        issues.push(ValidationIssue::warning(
            ValidationErrorCategory::PathFormat,
            "setup_file",
            "The setup document does not have a YAML extension",
            Some("Name the setup document `*.yml` or `*.yaml`"),
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfigBuilder;
    use std::num::NonZeroU64;

    #[test]
    fn test_default_config_is_valid() {
        let result = AppConfig::default().validate(None);

        assert!(result.issues().is_empty());
        assert!(result.config_file_path().is_none());
    }

    #[test]
    fn test_empty_python_is_an_error() {
        let config = AppConfigBuilder::default().python("  ").build();

        let result = config.validate(Some(PathBuf::from("/cfg/config.yaml")));

        assert!(result.has_errors());
        let issue = result.issues().errors().next().unwrap();
        assert_eq!(issue.field(), "python");
        assert_eq!(issue.category(), ValidationErrorCategory::RequiredField);
        assert_eq!(
            result.config_file_path(),
            Some(&PathBuf::from("/cfg/config.yaml"))
        );
    }

    #[test]
    fn test_index_url_schemes() {
        let http = AppConfigBuilder::default()
            .index_url(Url::parse("http://mirror.local").unwrap())
            .build()
            .validate(None);
        assert!(!http.has_errors());
        assert_eq!(http.issues().warnings().count(), 1);

        let ftp = AppConfigBuilder::default()
            .index_url(Url::parse("ftp://mirror.local").unwrap())
            .build()
            .validate(None);
        assert!(ftp.has_errors());
        assert_eq!(
            ftp.issues().errors().next().map(ValidationIssue::category),
            Some(ValidationErrorCategory::UrlFormat)
        );
    }

    #[test]
    fn test_short_timeout_warns() {
        let result = AppConfigBuilder::default()
            .command_timeout(NonZeroU64::new(3).unwrap())
            .build()
            .validate(None);

        assert!(!result.has_errors());
        assert_eq!(
            result.issues().warnings().next().map(ValidationIssue::field),
            Some("command_timeout")
        );
    }

    #[test]
    fn test_setup_file_extension_warns() {
        let result = AppConfigBuilder::default()
            .setup_file("quickpack.toml")
            .build()
            .validate(None);

        assert_eq!(result.issues().len(), 1);
        assert_eq!(
            result.issues().iter().next().map(ValidationIssue::level),
            Some(crate::validation::ValidationLevel::Warning)
        );
    }
}
