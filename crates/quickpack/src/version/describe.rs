use std::sync::LazyLock;

use regex::Regex;

use super::VersionError;

static PAST_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)-(\d+)-g([0-9a-f]+)(_dirty)?$").expect("valid regex")
});

static ON_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)(_dirty)?$").expect("valid regex"));

/// Convert a `git describe --match "*.*" --dirty=_dirty` descriptor into a version
///
/// - `MAJOR.MINOR-COMMITS-gHASH[_dirty]` becomes `MAJOR.MINOR.COMMITS[.dirty]`
/// - `MAJOR.MINOR[_dirty]` becomes `MAJOR.MINOR[.dirty]`
///
/// Surrounding whitespace (the trailing newline of CLI output) is ignored.
///
/// # Errors
///
/// Returns [`VersionError::UnparsableVersionDescriptor`] for any other shape.
pub fn describe_to_version(descriptor: &str) -> Result<String, VersionError> {
    let trimmed = descriptor.trim();
    let unparsable = || VersionError::UnparsableVersionDescriptor {
        descriptor: trimmed.to_string(),
    };

    let (mut version, dirty) = if trimmed.contains("-g") {
        let caps = PAST_TAG.captures(trimmed).ok_or_else(unparsable)?;
        (
            format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]),
            caps.get(5).is_some(),
        )
    } else {
        let caps = ON_TAG.captures(trimmed).ok_or_else(unparsable)?;
        (format!("{}.{}", &caps[1], &caps[2]), caps.get(3).is_some())
    };

    if dirty {
        version.push_str(".dirty");
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_commits_past_tag() {
        assert_eq!(describe_to_version("2.5-3-gabc1234").unwrap(), "2.5.3");
    }

    #[test]
    fn test_commits_past_tag_dirty() {
        assert_eq!(
            describe_to_version("2.5-3-gabc1234_dirty").unwrap(),
            "2.5.3.dirty"
        );
    }

    #[test]
    fn test_exactly_on_tag() {
        assert_eq!(describe_to_version("2.5").unwrap(), "2.5");
        assert_eq!(describe_to_version("10.0_dirty\n").unwrap(), "10.0.dirty");
    }

    #[test]
    fn test_unparsable_descriptors() {
        for descriptor in ["v2.5", "2.5.1", "2.5-3-gXYZ", "2.5-x-gabc", "", "release"] {
            let err = describe_to_version(descriptor).unwrap_err();
            assert!(
                matches!(err, VersionError::UnparsableVersionDescriptor { .. }),
                "{descriptor:?} should be rejected"
            );
        }
    }
}
