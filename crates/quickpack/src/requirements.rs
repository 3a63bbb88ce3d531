//! Install requirements: parsing, requirements files, and freezing against a package index

pub mod index;
pub mod resolve;
pub mod specifier;
pub mod version;

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

#[cfg(any(test, feature = "with_mocks"))]
pub use index::MockPackageIndex;
pub use index::{PackageIndex, PypiIndex};
pub use resolve::{normalize_name, resolve};
pub use specifier::{Specifier, SpecifierError, SpecifierSet};
pub use version::{InvalidVersion, PyVersion};

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[([^\]]*)\])?\s*(.*)$")
        .expect("valid regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    #[error("invalid requirement {line:?}: {reason}")]
    Invalid { line: String, reason: String },

    #[error("invalid requirement {line:?}: {source}")]
    Specifier {
        line: String,
        #[source]
        source: SpecifierError,
    },

    #[error("pip option {option:?} is not supported in requirements files (line {line_number})")]
    UnsupportedOption { option: String, line_number: usize },
}

/// Failure to pin a requirement against the package index
#[derive(Error, Debug, Clone)]
pub enum LookupError {
    #[error("package {name} was not found on {index}")]
    PackageNotFound { name: String, index: String },

    #[error("no versions found for package {name}")]
    NoReleases { name: String },

    #[error("no versions found for package {name} matching {requirement}")]
    NoMatchingVersion { name: String, requirement: String },

    #[error("cannot freeze direct reference {requirement}")]
    DirectReference { requirement: String },

    #[error("{name} is pinned to {pinned}, which conflicts with {requirement}")]
    Conflict {
        name: String,
        pinned: String,
        requirement: String,
    },

    #[error("{package} declares an invalid dependency: {source}")]
    InvalidDependency {
        package: String,
        #[source]
        source: RequirementError,
    },

    #[error("package index returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("package index request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// One install requirement, e.g. `requests[socks]>=2.0 ; python_version >= "3.8"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub specifiers: SpecifierSet,
    pub url: Option<String>,
    pub marker: Option<String>,
}

impl Requirement {
    /// The requirement pinned to exactly `version`, keeping extras and marker
    #[must_use]
    pub fn pinned(&self, version: &str) -> Self {
        let operator = if version.parse::<PyVersion>().is_ok() { "==" } else { "===" };
        Self {
            specifiers: format!("{operator}{version}")
                .parse()
                .unwrap_or_default(),
            url: None,
            ..self.clone()
        }
    }

    /// Pick the newest release satisfying the specifiers from an index listing
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NoReleases`] for an empty listing and
    /// [`LookupError::NoMatchingVersion`] when nothing matches.
    pub fn best_match<'a>(&self, releases: &'a [String]) -> Result<&'a str, LookupError> {
        self.best_match_allowing(releases, false)
    }

    /// [`Self::best_match`], optionally admitting pre-releases the specifiers do not name
    ///
    /// # Errors
    ///
    /// Same as [`Self::best_match`].
    pub fn best_match_allowing<'a>(
        &self,
        releases: &'a [String],
        prereleases: bool,
    ) -> Result<&'a str, LookupError> {
        if releases.is_empty() {
            return Err(LookupError::NoReleases {
                name: self.name.clone(),
            });
        }

        releases
            .iter()
            .map(|raw| {
                let version = raw.parse::<PyVersion>().ok();
                if version.is_none() {
                    debug!(package = %self.name, release = %raw, "Non-standard release version");
                }
                (raw.as_str(), version)
            })
            .filter(|(raw, version)| self.specifiers.admits(raw, version.as_ref(), prereleases))
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(raw, _)| raw)
            .ok_or_else(|| LookupError::NoMatchingVersion {
                name: self.name.clone(),
                requirement: self.to_string(),
            })
    }

    /// Resolve this requirement to `name==version` using `index`
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the index cannot be queried or nothing matches.
    pub fn freeze(&self, index: &dyn PackageIndex) -> Result<Self, LookupError> {
        if self.url.is_some() {
            return Err(LookupError::DirectReference {
                requirement: self.to_string(),
            });
        }
        let releases = index.release_versions(&self.name)?;
        let version = self.best_match(&releases)?;
        Ok(self.pinned(version))
    }
}

impl FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let invalid = |reason: &str| RequirementError::Invalid {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let (body, marker) = match line.split_once(';') {
            Some((body, marker)) => (body.trim(), Some(marker.trim().to_string())),
            None => (line, None),
        };
        if marker.as_deref() == Some("") {
            return Err(invalid("empty environment marker"));
        }

        let caps = NAME_PATTERN
            .captures(body)
            .ok_or_else(|| invalid("missing project name"))?;
        let name = caps[1].to_string();
        let extras = caps
            .get(2)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let rest = caps.get(3).map_or("", |m| m.as_str()).trim();
        let (specifiers, url) = if let Some(url) = rest.strip_prefix('@') {
            let url = url.trim();
            if url.is_empty() {
                return Err(invalid("empty direct reference"));
            }
            (SpecifierSet::default(), Some(url.to_string()))
        } else {
            let inner = rest
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'))
                .unwrap_or(rest);
            let specifiers = inner
                .parse()
                .map_err(|source| RequirementError::Specifier {
                    line: line.to_string(),
                    source,
                })?;
            (specifiers, None)
        };

        Ok(Self {
            name,
            extras,
            specifiers,
            url,
            marker,
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(url) = &self.url {
            write!(f, " @ {url}")?;
        } else {
            write!(f, "{}", self.specifiers)?;
        }
        if let Some(marker) = &self.marker {
            write!(f, " ; {marker}")?;
        }
        Ok(())
    }
}

/// Parse the contents of a pip-style requirements file
///
/// Blank lines and comments are dropped and inline comments stripped. Backslash
/// continuations are joined. Pip options (`-r`, `-e`, `--index-url`, ...) are rejected since
/// they have no meaning as install requirements.
///
/// # Errors
///
/// Returns [`RequirementError`] for the first line that is an option or not a requirement.
pub fn parse_requirements_text(text: &str) -> Result<Vec<Requirement>, RequirementError> {
    let mut requirements = Vec::new();
    let mut pending = String::new();

    for (index, raw_line) in text.lines().enumerate() {
        let without_comment = match raw_line.find(" #").or_else(|| {
            raw_line.trim_start().starts_with('#').then_some(0)
        }) {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };

        if let Some(continued) = without_comment.trim_end().strip_suffix('\\') {
            pending.push_str(continued);
            continue;
        }
        pending.push_str(without_comment);

        let line = pending.trim().to_string();
        pending.clear();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('-') {
            let option = line.split_whitespace().next().unwrap_or(&line).to_string();
            return Err(RequirementError::UnsupportedOption {
                option,
                line_number: index + 1,
            });
        }
        requirements.push(line.parse()?);
    }

    Ok(requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn req(s: &str) -> Requirement {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_full_requirement() {
        let r = req("requests [socks, security] >=2.0,<3 ; python_version >= \"3.8\"");

        assert_eq!(r.name, "requests");
        assert_eq!(r.extras, vec!["socks", "security"]);
        assert_eq!(r.specifiers.to_string(), ">=2.0,<3");
        assert_eq!(r.marker.as_deref(), Some("python_version >= \"3.8\""));
        assert_eq!(
            r.to_string(),
            "requests[socks,security]>=2.0,<3 ; python_version >= \"3.8\""
        );
    }

    #[test]
    fn test_parse_bare_and_parenthesized() {
        assert_eq!(req("six").to_string(), "six");
        assert_eq!(req("zope.interface (>=4.0)").to_string(), "zope.interface>=4.0");
    }

    #[test]
    fn test_parse_direct_reference() {
        let r = req("pkg @ https://example.com/pkg-1.0.tar.gz");

        assert_eq!(r.url.as_deref(), Some("https://example.com/pkg-1.0.tar.gz"));
        assert_eq!(r.to_string(), "pkg @ https://example.com/pkg-1.0.tar.gz");
    }

    #[test]
    fn test_parse_invalid_requirement() {
        assert!(matches!(
            "==1.0".parse::<Requirement>(),
            Err(RequirementError::Invalid { .. })
        ));
        assert!(matches!(
            "pkg >=banana".parse::<Requirement>(),
            Err(RequirementError::Specifier { .. })
        ));
    }

    #[test]
    fn test_best_match_picks_newest_satisfying_release() {
        let r = req("attrs>=19,<22");
        let releases: Vec<String> = ["18.2.0", "19.1.0", "21.4.0", "21.10.0rc1", "22.1.0", "junk-version"]
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(r.best_match(&releases).unwrap(), "21.4.0");
        assert_eq!(r.best_match_allowing(&releases, true).unwrap(), "21.10.0rc1");
    }

    #[test]
    fn test_best_match_errors() {
        let r = req("attrs>=30");

        assert!(matches!(r.best_match(&[]), Err(LookupError::NoReleases { .. })));
        assert!(matches!(
            r.best_match(&["1.0".to_string()]),
            Err(LookupError::NoMatchingVersion { .. })
        ));
    }

    #[test]
    fn test_freeze_keeps_extras_and_marker() {
        let mut index = MockPackageIndex::new();
        index
            .expect_release_versions()
            .withf(|name| name == "requests")
            .returning(|_| Ok(vec!["2.30.0".to_string(), "2.31.0".to_string()]));
        let r = req("requests[socks]~=2.30 ; sys_platform == 'linux'");

        let frozen = r.freeze(&index).unwrap();

        assert_eq!(
            frozen.to_string(),
            "requests[socks]==2.31.0 ; sys_platform == 'linux'"
        );
    }

    #[test]
    fn test_freeze_matches_non_standard_release_by_identity() {
        let mut index = MockPackageIndex::new();
        index
            .expect_release_versions()
            .returning(|_| Ok(vec!["1.0".to_string(), "1.0-custom".to_string()]));
        let r = req("legacy===1.0-custom");

        let frozen = r.freeze(&index).unwrap();

        assert_eq!(frozen.to_string(), "legacy===1.0-custom");
    }

    #[test]
    fn test_freeze_refuses_direct_reference() {
        let index = MockPackageIndex::new();
        let r = req("pkg @ file:///tmp/pkg.whl");

        assert!(matches!(
            r.freeze(&index),
            Err(LookupError::DirectReference { .. })
        ));
    }

    #[test]
    fn test_requirements_file_parsing() {
        let text = "\
# pinned deps
requests>=2.0  # http

click \\
  >=8
six
";
        let parsed = parse_requirements_text(text).unwrap();

        let rendered: Vec<String> = parsed.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["requests>=2.0", "click>=8", "six"]);
    }

    #[test]
    fn test_requirements_file_rejects_options() {
        let err = parse_requirements_text("six\n-r other.txt\n").unwrap_err();

        assert_eq!(
            err,
            RequirementError::UnsupportedOption {
                option: "-r".to_string(),
                line_number: 2
            }
        );
    }
}
