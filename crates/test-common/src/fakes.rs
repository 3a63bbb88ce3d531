//! In-memory fakes for the ports the pipeline talks to.

use crate::constants::TEST_VERSION;
use crate::fixtures::snapshot_tree;
use quickpack::{
    host::{HostError, HostRecord, HostToolchain},
    pipeline::Collaborators,
    requirements::{LookupError, PackageIndex},
    version::FixedVersionSource,
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Host toolchain that records what it was handed instead of building anything.
///
/// Besides the record and arguments it captures the project tree as it looked
/// while the host ran, so tests can assert on virtual files that are gone again
/// by the time the run returns.
pub struct FakeHost {
    root: PathBuf,
    fail_with: Option<i32>,
    calls: Mutex<Vec<HostCall>>,
}

#[derive(Debug, Clone)]
pub struct HostCall {
    pub record: HostRecord,
    pub args: Vec<String>,
    pub tree: BTreeMap<PathBuf, Vec<u8>>,
}

impl HostCall {
    /// Contents of `relative` as the host saw it.
    #[must_use]
    pub fn file(&self, relative: &str) -> Option<String> {
        self.tree
            .get(Path::new(relative))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

impl FakeHost {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            fail_with: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A host that exits with `exit_code` after recording the call.
    #[must_use]
    pub fn failing(root: &Path, exit_code: i32) -> Self {
        Self {
            fail_with: Some(exit_code),
            ..Self::new(root)
        }
    }

    #[must_use]
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("host calls lock").clone()
    }

    /// The only call made, panicking if there were none or several.
    #[must_use]
    pub fn single_call(&self) -> HostCall {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one host call");
        calls.into_iter().next().expect("one call")
    }
}

impl HostToolchain for FakeHost {
    fn run(&self, record: &HostRecord, args: &[String]) -> Result<(), HostError> {
        self.calls.lock().expect("host calls lock").push(HostCall {
            record: record.clone(),
            args: args.to_vec(),
            tree: snapshot_tree(&self.root),
        });

        match self.fail_with {
            Some(exit_code) => Err(HostError::Failed {
                exit_code,
                stderr: "simulated host failure".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn name(&self) -> String {
        "fake-host".to_string()
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Package index backed by a fixed table of releases and their dependencies.
#[derive(Debug, Default)]
pub struct FakeIndex {
    releases: BTreeMap<String, Vec<String>>,
    dependencies: BTreeMap<(String, String), Vec<String>>,
}

impl FakeIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_releases(mut self, name: &str, versions: &[&str]) -> Self {
        self.releases.insert(
            name.to_lowercase(),
            versions.iter().map(ToString::to_string).collect(),
        );
        self
    }

    /// Declare the `Requires-Dist` lines of one release
    #[must_use]
    pub fn with_dependencies(mut self, name: &str, version: &str, requires: &[&str]) -> Self {
        self.dependencies.insert(
            (name.to_lowercase(), version.to_string()),
            requires.iter().map(ToString::to_string).collect(),
        );
        self
    }
}

impl PackageIndex for FakeIndex {
    fn release_versions(&self, name: &str) -> Result<Vec<String>, LookupError> {
        self.releases
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| LookupError::PackageNotFound {
                name: name.to_string(),
                index: "fake-index".to_string(),
            })
    }

    fn requires_dist(&self, name: &str, version: &str) -> Result<Vec<String>, LookupError> {
        let known = self
            .releases
            .get(&name.to_lowercase())
            .is_some_and(|versions| versions.iter().any(|v| v == version));
        if !known {
            return Err(LookupError::PackageNotFound {
                name: format!("{name}=={version}"),
                index: "fake-index".to_string(),
            });
        }
        Ok(self
            .dependencies
            .get(&(name.to_lowercase(), version.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Collaborators wired to the fakes, with versions fixed at [`TEST_VERSION`].
#[must_use]
pub fn fake_collaborators(host: Arc<FakeHost>, index: FakeIndex) -> Collaborators {
    Collaborators {
        versions: Arc::new(FixedVersionSource::new(TEST_VERSION)),
        index: Arc::new(index),
        host,
    }
}
