//! Version specifiers (`>=1.2`, `~=2.0`, `==1.*`, ...)

use std::{fmt, str::FromStr};

use thiserror::Error;

use super::version::PyVersion;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecifierError {
    #[error("missing comparison operator in {0:?}")]
    MissingOperator(String),

    #[error("invalid version in specifier {0:?}")]
    InvalidVersion(String),

    #[error("`~=` needs at least two release segments: {0:?}")]
    CompatibleTooShort(String),

    #[error("wildcards are only allowed with `==` and `!=`: {0:?}")]
    MisplacedWildcard(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Compatible,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Identity,
}

impl Operator {
    // Longest first so `===` is not read as `==`
    const ALL: [(&'static str, Self); 8] = [
        ("===", Self::Identity),
        ("~=", Self::Compatible),
        ("==", Self::Equal),
        ("!=", Self::NotEqual),
        ("<=", Self::LessEqual),
        (">=", Self::GreaterEqual),
        ("<", Self::Less),
        (">", Self::Greater),
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, op)| *op == self)
            .map_or("", |(s, _)| s)
    }
}

/// A single `<op><version>` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    operator: Operator,
    raw_version: String,
    version: Option<PyVersion>,
    wildcard: bool,
}

impl Specifier {
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// True when the clause itself names a pre-release, which opts in to pre-releases
    #[must_use]
    pub fn mentions_prerelease(&self) -> bool {
        self.version.as_ref().is_some_and(PyVersion::is_prerelease)
    }

    /// Whether a release listed by the index as `raw` satisfies this clause
    ///
    /// `candidate` is `raw` parsed, when it is a standard version. Only `===` can match a
    /// release that is not.
    #[must_use]
    pub fn contains(&self, raw: &str, candidate: Option<&PyVersion>) -> bool {
        let (Some(spec), Some(candidate)) = (&self.version, candidate) else {
            return self.operator == Operator::Identity && raw.trim() == self.raw_version;
        };

        match self.operator {
            Operator::Identity => raw.trim() == self.raw_version,
            Operator::Equal => self.equal(spec, candidate),
            Operator::NotEqual => !self.equal(spec, candidate),
            Operator::LessEqual => candidate.public() <= *spec,
            Operator::GreaterEqual => candidate.public() >= *spec,
            Operator::Less => {
                candidate < spec
                    && !(candidate.is_prerelease()
                        && !spec.is_prerelease()
                        && candidate.same_release(spec))
            }
            Operator::Greater => {
                candidate > spec
                    && !(candidate.is_postrelease()
                        && !spec.is_postrelease()
                        && candidate.same_release(spec))
                    && !(candidate.has_local() && candidate.public() == *spec)
            }
            Operator::Compatible => {
                let prefix = &spec.release()[..spec.release().len() - 1];
                candidate.public() >= *spec
                    && candidate.epoch() == spec.epoch()
                    && candidate.release_starts_with(prefix)
            }
        }
    }

    fn equal(&self, spec: &PyVersion, candidate: &PyVersion) -> bool {
        if self.wildcard {
            candidate.epoch() == spec.epoch() && candidate.release_starts_with(spec.release())
        } else if spec.has_local() {
            candidate == spec
        } else {
            candidate.public() == *spec
        }
    }
}

impl FromStr for Specifier {
    type Err = SpecifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (operator, rest) = Operator::ALL
            .iter()
            .find_map(|(token, op)| trimmed.strip_prefix(token).map(|rest| (*op, rest)))
            .ok_or_else(|| SpecifierError::MissingOperator(trimmed.to_string()))?;
        let raw_version = rest.trim().to_string();

        if operator == Operator::Identity {
            return Ok(Self {
                operator,
                version: raw_version.parse().ok(),
                raw_version,
                wildcard: false,
            });
        }

        let (version_text, wildcard) = match raw_version.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (raw_version.as_str(), false),
        };
        if wildcard && !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(SpecifierError::MisplacedWildcard(trimmed.to_string()));
        }

        let version: PyVersion = version_text
            .parse()
            .map_err(|_| SpecifierError::InvalidVersion(trimmed.to_string()))?;
        if operator == Operator::Compatible && version.release().len() < 2 {
            return Err(SpecifierError::CompatibleTooShort(trimmed.to_string()));
        }

        Ok(Self {
            operator,
            version: Some(version),
            raw_version,
            wildcard,
        })
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator.as_str(), self.raw_version)
    }
}

/// A comma-separated set of clauses, all of which must hold
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecifierSet(Vec<Specifier>);

impl SpecifierSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Specifier> {
        self.0.iter()
    }

    #[must_use]
    pub fn allows_prereleases(&self) -> bool {
        self.0.iter().any(Specifier::mentions_prerelease)
    }

    /// Whether a listed release satisfies every clause
    ///
    /// Pre-releases only match when some clause names a pre-release itself.
    #[must_use]
    pub fn contains(&self, raw: &str, candidate: Option<&PyVersion>) -> bool {
        self.admits(raw, candidate, false)
    }

    /// [`Self::contains`], with `prereleases` admitting pre-releases unconditionally
    #[must_use]
    pub fn admits(&self, raw: &str, candidate: Option<&PyVersion>, prereleases: bool) -> bool {
        if !prereleases
            && candidate.is_some_and(PyVersion::is_prerelease)
            && !self.allows_prereleases()
        {
            return false;
        }
        self.0.iter().all(|spec| spec.contains(raw, candidate))
    }
}

impl FromStr for SpecifierSet {
    type Err = SpecifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", clauses.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allows(set: &str, version: &str) -> bool {
        let set: SpecifierSet = set.parse().unwrap();
        set.contains(version, version.parse().ok().as_ref())
    }

    #[test]
    fn test_range_operators() {
        assert!(allows(">=1.2,<2", "1.9.9"));
        assert!(!allows(">=1.2,<2", "2.0"));
        assert!(!allows(">=1.2,<2", "1.1"));
        assert!(allows("<=1.2", "1.2.0"));
        assert!(allows(">1.2", "1.3"));
        assert!(!allows(">1.2", "1.2.post1"));
        assert!(allows("!=1.5", "1.6"));
        assert!(!allows("!=1.5", "1.5.0"));
    }

    #[test]
    fn test_equality_and_wildcards() {
        assert!(allows("==1.4", "1.4.0"));
        assert!(allows("==1.4", "1.4+local"));
        assert!(allows("==1.4.*", "1.4.17"));
        assert!(!allows("==1.4.*", "1.40"));
        assert!(!allows("!=1.4.*", "1.4.2"));
    }

    #[test]
    fn test_arbitrary_equality_matches_raw_text() {
        assert!(allows("===1.0-custom", "1.0-custom"));
        assert!(!allows("===1.0-custom", "1.0"));
        assert!(allows("===1.0", "1.0"));
        assert!(!allows("===1.0", "1.0.0"));
        assert!(!allows(">=1.0", "1.0-custom"));
    }

    #[test]
    fn test_compatible_release() {
        assert!(allows("~=2.2", "2.9"));
        assert!(!allows("~=2.2", "3.0"));
        assert!(allows("~=1.4.5", "1.4.9"));
        assert!(!allows("~=1.4.5", "1.5.0"));
        assert!(!allows("~=1.4.5", "1.4.4"));
    }

    #[test]
    fn test_prereleases_need_opt_in() {
        assert!(!allows(">=1.0", "2.0rc1"));
        assert!(allows(">=2.0rc1", "2.0rc2"));
        assert!(!allows("<2.0", "2.0a1"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "1.0".parse::<Specifier>().unwrap_err(),
            SpecifierError::MissingOperator("1.0".to_string())
        );
        assert!(matches!(
            "~=1".parse::<Specifier>(),
            Err(SpecifierError::CompatibleTooShort(_))
        ));
        assert!(matches!(
            ">=1.*".parse::<Specifier>(),
            Err(SpecifierError::MisplacedWildcard(_))
        ));
    }

    #[test]
    fn test_display_round_trip() {
        let set: SpecifierSet = " >=1.2 , <2 ".parse().unwrap();
        assert_eq!(set.to_string(), ">=1.2,<2");
    }
}
