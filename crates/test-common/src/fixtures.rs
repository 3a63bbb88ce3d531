//! Project trees on disk for pipeline tests.

use crate::constants::{TEST_LIB_NAME, TEST_PACKAGE, TEST_SCRIPT, TEST_SCRIPT_MODULE};
use quickpack::version::version_boilerplate;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// A throwaway project root that is removed when dropped.
///
/// # Example
/// ```rust
/// let project = ProjectFixture::example_library();
/// project.write("README.md", "# readme\n");
/// let before = snapshot_tree(project.root());
/// ```
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    /// An empty project root.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// A library shaped like the one the pipeline is normally run on:
    /// a package with a version module and a script module, a README and a
    /// setup document declaring version sources and a console script.
    #[must_use]
    pub fn example_library() -> Self {
        let project = Self::empty();
        project.write(format!("{TEST_PACKAGE}/__init__.py"), "");
        project.write(format!("{TEST_PACKAGE}/version.py"), version_boilerplate());
        project.write(
            format!("{TEST_PACKAGE}/{}.py", TEST_SCRIPT),
            "print('hello from examplescript')\n",
        );
        project.write("README.md", "# examplelib\n");
        project.write_setup(&example_setup(""));
        project
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: impl AsRef<Path>, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write fixture file");
        path
    }

    /// Replace the setup document at the default location.
    pub fn write_setup(&self, yaml: &str) -> PathBuf {
        self.write(quickpack::setup::DEFAULT_SETUP_FILE, yaml)
    }

    #[must_use]
    pub fn read(&self, relative: impl AsRef<Path>) -> String {
        fs::read_to_string(self.path(relative)).expect("read fixture file")
    }

    #[must_use]
    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.path(relative).exists()
    }
}

/// Setup document for the example library, with `extra` appended to the `setup` mapping.
///
/// `extra` must already be indented by two spaces.
#[must_use]
pub fn example_setup(extra: &str) -> String {
    format!(
        r#"setup:
  name: {TEST_LIB_NAME}
  description: "examplelib: a library used by the test suite"
  author: ACME Inc.
  version_sources:
    - {TEST_PACKAGE}/version.py
  console_scripts:
    {TEST_SCRIPT}: {TEST_SCRIPT_MODULE}
{extra}"#
    )
}

/// Every regular file under `root` with its bytes, keyed by relative path.
///
/// Two snapshots taken before and after a run are equal exactly when the run
/// left the tree as it found it.
#[must_use]
pub fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).expect("read dir") {
            let path = entry.expect("dir entry").path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let relative = path.strip_prefix(root).expect("under root").to_path_buf();
                files.insert(relative, fs::read(&path).expect("read file"));
            }
        }
    }

    files
}
