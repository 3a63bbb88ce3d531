//! Release versions as published on a package index, ordered the way installers order them

use std::{cmp::Ordering, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)^\s*v?
        (?:(?P<epoch>\d+)!)?
        (?P<release>\d+(?:\.\d+)*)
        (?:[-_.]?(?P<pre_l>a|b|c|rc|alpha|beta|pre|preview)[-_.]?(?P<pre_n>\d+)?)?
        (?:-(?P<post_n1>\d+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>\d+)?)?
        (?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>\d+)?)?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        \s*$",
    )
    .expect("valid regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version: {0:?}")]
pub struct InvalidVersion(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreKind {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl fmt::Display for PreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alpha => write!(f, "a"),
            Self::Beta => write!(f, "b"),
            Self::ReleaseCandidate => write!(f, "rc"),
        }
    }
}

/// Sort helper: variants order before/after any concrete value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Slot<T> {
    Below,
    At(T),
    Above,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LocalPart {
    Text(String),
    Number(u64),
}

/// A parsed release version
#[derive(Debug, Clone)]
pub struct PyVersion {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<String>,
}

impl PyVersion {
    #[must_use]
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    #[must_use]
    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    #[must_use]
    pub fn has_local(&self) -> bool {
        self.local.is_some()
    }

    /// The same version without its `+local` label
    #[must_use]
    pub fn public(&self) -> Self {
        Self {
            local: None,
            ..self.clone()
        }
    }

    /// Epoch and release segments equal, ignoring trailing zeros
    #[must_use]
    pub fn same_release(&self, other: &Self) -> bool {
        self.epoch == other.epoch && trimmed(&self.release) == trimmed(&other.release)
    }

    /// Release segments start with `prefix`, padding this version with zeros as needed
    #[must_use]
    pub fn release_starts_with(&self, prefix: &[u64]) -> bool {
        prefix
            .iter()
            .enumerate()
            .all(|(i, segment)| self.release.get(i).copied().unwrap_or(0) == *segment)
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn sort_key(&self) -> (u64, &[u64], Slot<(PreKind, u64)>, Slot<u64>, Slot<u64>, Slot<Vec<LocalPart>>) {
        let pre = match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => Slot::Below,
            (None, _, _) => Slot::Above,
            (Some(pre), _, _) => Slot::At(pre),
        };
        let post = self.post.map_or(Slot::Below, Slot::At);
        let dev = self.dev.map_or(Slot::Above, Slot::At);
        let local = self.local.as_deref().map_or(Slot::Below, |local| {
            Slot::At(
                local
                    .split(['.', '-', '_'])
                    .map(|part| {
                        part.parse::<u64>()
                            .map_or_else(|_| LocalPart::Text(part.to_ascii_lowercase()), LocalPart::Number)
                    })
                    .collect(),
            )
        });

        (self.epoch, trimmed(&self.release), pre, post, dev, local)
    }
}

fn trimmed(release: &[u64]) -> &[u64] {
    let len = release.iter().rposition(|n| *n != 0).map_or(0, |i| i + 1);
    &release[..len]
}

impl FromStr for PyVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersion(s.to_string());
        let caps = VERSION_PATTERN.captures(s).ok_or_else(invalid)?;
        let number = |name: &str| -> Result<Option<u64>, InvalidVersion> {
            caps.name(name)
                .map(|m| m.as_str().parse::<u64>().map_err(|_| invalid()))
                .transpose()
        };

        let release = caps["release"]
            .split('.')
            .map(|n| n.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        let pre = match caps.name("pre_l") {
            Some(label) => {
                let kind = match label.as_str().to_ascii_lowercase().as_str() {
                    "a" | "alpha" => PreKind::Alpha,
                    "b" | "beta" => PreKind::Beta,
                    _ => PreKind::ReleaseCandidate,
                };
                Some((kind, number("pre_n")?.unwrap_or(0)))
            }
            None => None,
        };

        let post = if caps.name("post_n1").is_some() || caps.name("post_l").is_some() {
            Some(number("post_n1")?.or(number("post_n2")?).unwrap_or(0))
        } else {
            None
        };

        let dev = if caps.name("dev_l").is_some() {
            Some(number("dev_n")?.unwrap_or(0))
        } else {
            None
        };

        Ok(Self {
            epoch: number("epoch")?.unwrap_or(0),
            release,
            pre,
            post,
            dev,
            local: caps.name("local").map(|m| m.as_str().to_ascii_lowercase()),
        })
    }
}

impl PartialEq for PyVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PyVersion {}

impl PartialOrd for PyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for PyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        write!(f, "{}", release.join("."))?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{kind}{n}")?;
        }
        if let Some(post) = self.post {
            write!(f, ".post{post}")?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{dev}")?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{local}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v(s: &str) -> PyVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_normalized_display() {
        assert_eq!(v("1.0").to_string(), "1.0");
        assert_eq!(v("1.0-alpha1").to_string(), "1.0a1");
        assert_eq!(v("2!1.0.post2.dev3+ubuntu.1").to_string(), "2!1.0.post2.dev3+ubuntu.1");
        assert_eq!(v("1.0rc").to_string(), "1.0rc0");
        assert_eq!(v("1.0-1").to_string(), "1.0.post1");
    }

    #[test]
    fn test_ordering() {
        let ordered = [
            "1.0.dev0",
            "1.0a1",
            "1.0a2.dev1",
            "1.0a2",
            "1.0b1",
            "1.0rc1",
            "1.0",
            "1.0+local",
            "1.0.post1.dev0",
            "1.0.post1",
            "1.1",
            "1!0.1",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_trailing_zeros_are_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert!(v("1.0").same_release(&v("1")));
    }

    #[test]
    fn test_prerelease_flags() {
        assert!(v("1.0rc1").is_prerelease());
        assert!(v("1.0.dev4").is_prerelease());
        assert!(!v("1.0.post1").is_prerelease());
        assert!(v("1.0.post1").is_postrelease());
        assert!(!v("1.0rc1").is_postrelease());
    }

    #[test]
    fn test_invalid() {
        assert!("not-a-version".parse::<PyVersion>().is_err());
        assert!("".parse::<PyVersion>().is_err());
        assert!("1.0.x".parse::<PyVersion>().is_err());
    }
}
