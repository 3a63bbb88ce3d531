//! Pinning a requirement set together with everything it depends on

use std::{
    collections::{BTreeMap, VecDeque},
    sync::LazyLock,
};

use regex::Regex;
use tracing::{debug, info};

use super::{LookupError, PackageIndex, PyVersion, Requirement};

static EXTRA_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bextra\b").expect("valid regex"));

static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("valid regex"));

/// Canonical project name: lowercase, with runs of `-`, `_` and `.` folded into `-`
#[must_use]
pub fn normalize_name(name: &str) -> String {
    NAME_SEPARATORS
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

/// Pin `roots` and their transitive dependencies to concrete releases
///
/// Resolution is greedy and breadth-first: a project is pinned to its newest matching release
/// the first time it is reached, and every later requirement on it must accept that pin.
/// Dependencies gated on an `extra` marker are skipped; other markers stay on the pinned
/// line unevaluated. Pre-releases are only chosen when `prereleases` is set or a specifier
/// names one.
///
/// The result is sorted by canonical project name.
///
/// # Errors
///
/// Returns [`LookupError`] if the index cannot be queried, nothing matches a requirement,
/// a dependency line is malformed, or two requirements disagree on a pin.
pub fn resolve(
    roots: &[Requirement],
    index: &dyn PackageIndex,
    prereleases: bool,
) -> Result<Vec<Requirement>, LookupError> {
    let mut pinned: BTreeMap<String, (Requirement, String)> = BTreeMap::new();
    let mut pending: VecDeque<Requirement> = roots.iter().cloned().collect();

    while let Some(requirement) = pending.pop_front() {
        if requirement.url.is_some() {
            return Err(LookupError::DirectReference {
                requirement: requirement.to_string(),
            });
        }

        let key = normalize_name(&requirement.name);
        if let Some((_, version)) = pinned.get(&key) {
            let parsed = version.parse::<PyVersion>().ok();
            if !requirement.specifiers.admits(version, parsed.as_ref(), true) {
                return Err(LookupError::Conflict {
                    name: requirement.name.clone(),
                    pinned: version.clone(),
                    requirement: requirement.to_string(),
                });
            }
            continue;
        }

        let releases = index.release_versions(&requirement.name)?;
        let version = requirement
            .best_match_allowing(&releases, prereleases)?
            .to_string();
        debug!(package = %requirement.name, %version, "Pinned");

        for line in index.requires_dist(&requirement.name, &version)? {
            let dependency: Requirement =
                line.parse()
                    .map_err(|source| LookupError::InvalidDependency {
                        package: format!("{}=={version}", requirement.name),
                        source,
                    })?;
            if dependency.marker.as_deref().is_some_and(|m| EXTRA_MARKER.is_match(m)) {
                debug!(dependency = %dependency, "Skipping dependency of an extra");
                continue;
            }
            pending.push_back(dependency);
        }

        pinned.insert(key, (requirement.pinned(&version), version));
    }

    info!(count = pinned.len(), "Resolved requirements");
    Ok(pinned.into_values().map(|(requirement, _)| requirement).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::MockPackageIndex;
    use pretty_assertions::assert_eq;

    fn index(projects: &[(&str, &str, &[&str])]) -> MockPackageIndex {
        let mut releases: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut requires: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
        for (name, version, deps) in projects {
            releases
                .entry((*name).to_string())
                .or_default()
                .push((*version).to_string());
            requires.insert(
                ((*name).to_string(), (*version).to_string()),
                deps.iter().map(ToString::to_string).collect(),
            );
        }

        let mut index = MockPackageIndex::new();
        index.expect_release_versions().returning(move |name| {
            releases
                .get(name)
                .cloned()
                .ok_or_else(|| LookupError::PackageNotFound {
                    name: name.to_string(),
                    index: "test".to_string(),
                })
        });
        index.expect_requires_dist().returning(move |name, version| {
            Ok(requires
                .get(&(name.to_string(), version.to_string()))
                .cloned()
                .unwrap_or_default())
        });
        index
    }

    fn lines(pins: &[Requirement]) -> Vec<String> {
        pins.iter().map(ToString::to_string).collect()
    }

    fn roots(line: &str) -> Vec<Requirement> {
        vec![line.parse().unwrap()]
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Zope.Interface"), "zope-interface");
        assert_eq!(normalize_name("typing__extensions"), "typing-extensions");
    }

    #[test]
    fn test_resolves_transitive_dependencies() {
        let index = index(&[
            (
                "app",
                "1.0",
                &[
                    "six>=1.10",
                    "colorama ; sys_platform == \"win32\"",
                    "pytest ; extra == \"test\"",
                ],
            ),
            ("six", "1.9.0", &[]),
            ("six", "1.16.0", &[]),
            ("six", "2.0.0b1", &[]),
            ("colorama", "0.4.6", &[]),
        ]);

        let pins = resolve(&roots("app==1.0"), &index, false).unwrap();

        assert_eq!(
            lines(&pins),
            vec![
                "app==1.0",
                "colorama==0.4.6 ; sys_platform == \"win32\"",
                "six==1.16.0",
            ]
        );
    }

    #[test]
    fn test_prereleases_can_be_admitted() {
        let index = index(&[
            ("app", "1.0", &["six"]),
            ("six", "1.16.0", &[]),
            ("six", "2.0.0b1", &[]),
        ]);

        let pins = resolve(&roots("app==1.0"), &index, true).unwrap();

        assert_eq!(lines(&pins), vec!["app==1.0", "six==2.0.0b1"]);
    }

    #[test]
    fn test_dependency_cycle_terminates() {
        let index = index(&[("a", "1.0", &["b>=1"]), ("b", "1.0", &["A"])]);

        let pins = resolve(&roots("a"), &index, false).unwrap();

        assert_eq!(lines(&pins), vec!["a==1.0", "b==1.0"]);
    }

    #[test]
    fn test_conflicting_pins_fail() {
        let index = index(&[
            ("app", "1.0", &["six<1.10", "lib"]),
            ("lib", "2.0", &["six>=1.12"]),
            ("six", "1.9.0", &[]),
            ("six", "1.16.0", &[]),
        ]);

        let err = resolve(&roots("app==1.0"), &index, false).unwrap_err();

        assert!(
            matches!(&err, LookupError::Conflict { name, pinned, .. } if name == "six" && pinned == "1.9.0"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_invalid_dependency_line_names_the_package() {
        let index = index(&[("app", "1.0", &["==broken"])]);

        let err = resolve(&roots("app"), &index, false).unwrap_err();

        assert!(
            matches!(&err, LookupError::InvalidDependency { package, .. } if package == "app==1.0")
        );
    }
}
