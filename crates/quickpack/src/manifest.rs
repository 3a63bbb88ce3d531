//! Packaging manifest (`MANIFEST.in`) rewriting
//!
//! Steps accumulate directive lines on a [`ManifestRewriter`] held by the build context. The
//! `prepare_manifest_in` step then writes them out exactly once, through the ledger, so the
//! manifest is restored (or removed) at teardown.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::fs::FileSystemError;
use crate::ledger::{LedgerError, VirtualFileLedger};

pub const DEFAULT_MANIFEST_PATH: &str = "MANIFEST.in";

pub const BLOCK_HEADER: &str =
    "# ---- AUTO-GENERATED: lines beyond this point were added by quickpack";
pub const BLOCK_FOOTER: &str = "# ---- AUTO-GENERATED: done";

/// Directives understood by the host toolchain's manifest parser
pub const DIRECTIVES: &[&str] = &[
    "include",
    "exclude",
    "recursive-include",
    "recursive-exclude",
    "global-include",
    "global-exclude",
    "prune",
    "graft",
];

#[derive(Error, Debug, Clone)]
pub enum ManifestError {
    #[error("{} has already been rewritten", path.display())]
    AlreadyRewritten { path: PathBuf },

    #[error("at least one pattern is required for {directive}")]
    MissingPatterns { directive: &'static str },

    #[error("not a manifest directive or comment: {line:?}")]
    InvalidLine { line: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    FileSystem(#[from] FileSystemError),
}

/// How accumulated lines relate to an existing manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestMode {
    /// Keep the existing content and add the block after it
    #[default]
    Append,
    /// Discard the existing content
    Replace,
}

/// Check that `line` is a comment or starts with a known directive
#[must_use]
pub fn is_valid_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.starts_with('#') {
        return true;
    }
    trimmed
        .split_whitespace()
        .next()
        .is_some_and(|directive| DIRECTIVES.contains(&directive))
}

#[derive(Debug, Clone)]
pub struct ManifestRewriter {
    path: PathBuf,
    mode: ManifestMode,
    template: Option<PathBuf>,
    lines: Vec<String>,
    rewritten: bool,
}

impl ManifestRewriter {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mode: ManifestMode) -> Self {
        Self {
            path: path.into(),
            mode,
            template: None,
            lines: Vec::new(),
            rewritten: false,
        }
    }

    /// Start from `template` instead of the existing manifest
    ///
    /// In append mode the manifest is then always written, even without added lines.
    #[must_use]
    pub fn with_template(mut self, template: Option<PathBuf>) -> Self {
        self.template = template;
        self
    }

    #[must_use]
    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn mode(&self) -> ManifestMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ManifestMode) {
        self.mode = mode;
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn is_rewritten(&self) -> bool {
        self.rewritten
    }

    /// Add a raw line
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::AlreadyRewritten`] once [`Self::rewrite`] has run.
    pub fn add_line(&mut self, line: impl Into<String>) -> Result<(), ManifestError> {
        if self.rewritten {
            return Err(ManifestError::AlreadyRewritten {
                path: self.path.clone(),
            });
        }
        self.lines.push(line.into());
        Ok(())
    }

    pub fn add_comment(&mut self, comment: &str) -> Result<(), ManifestError> {
        self.add_line(format!("# {comment}"))
    }

    fn add_directive<S: AsRef<str>>(
        &mut self,
        directive: &'static str,
        prefix: Option<&str>,
        patterns: &[S],
    ) -> Result<(), ManifestError> {
        if patterns.is_empty() {
            return Err(ManifestError::MissingPatterns { directive });
        }
        let mut line = directive.to_string();
        if let Some(prefix) = prefix {
            line.push(' ');
            line.push_str(prefix);
        }
        for pattern in patterns {
            line.push(' ');
            line.push_str(pattern.as_ref());
        }
        self.add_line(line)
    }

    pub fn add_include<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<(), ManifestError> {
        self.add_directive("include", None, patterns)
    }

    pub fn add_exclude<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<(), ManifestError> {
        self.add_directive("exclude", None, patterns)
    }

    pub fn add_recursive_include<S: AsRef<str>>(
        &mut self,
        directory: &str,
        patterns: &[S],
    ) -> Result<(), ManifestError> {
        self.add_directive("recursive-include", Some(directory), patterns)
    }

    pub fn add_recursive_exclude<S: AsRef<str>>(
        &mut self,
        directory: &str,
        patterns: &[S],
    ) -> Result<(), ManifestError> {
        self.add_directive("recursive-exclude", Some(directory), patterns)
    }

    pub fn add_global_include<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
    ) -> Result<(), ManifestError> {
        self.add_directive("global-include", None, patterns)
    }

    pub fn add_global_exclude<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
    ) -> Result<(), ManifestError> {
        self.add_directive("global-exclude", None, patterns)
    }

    pub fn add_prune(&mut self, directory: &str) -> Result<(), ManifestError> {
        self.add_line(format!("prune {directory}"))
    }

    pub fn add_graft(&mut self, directory: &str) -> Result<(), ManifestError> {
        self.add_line(format!("graft {directory}"))
    }

    /// Render the generated block, without any pre-existing content
    #[must_use]
    pub fn render_block(&self) -> String {
        let mut block = String::from(BLOCK_HEADER);
        block.push('\n');
        for line in &self.lines {
            block.push_str(line);
            block.push('\n');
        }
        block.push_str(BLOCK_FOOTER);
        block.push('\n');
        block
    }

    /// Write the accumulated lines out through the ledger
    ///
    /// This is terminal: afterwards no lines can be added and a second call fails. With no
    /// accumulated lines and no template nothing is written. Returns the path written, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::AlreadyRewritten`] on a second call, or the ledger's error if
    /// the manifest cannot be written.
    pub fn rewrite(
        &mut self,
        ledger: &mut VirtualFileLedger,
    ) -> Result<Option<PathBuf>, ManifestError> {
        if self.rewritten {
            return Err(ManifestError::AlreadyRewritten {
                path: self.path.clone(),
            });
        }
        self.rewritten = true;

        let template = self
            .template
            .as_ref()
            .filter(|_| self.mode == ManifestMode::Append);
        if self.lines.is_empty() && template.is_none() {
            return Ok(None);
        }

        let exists = ledger.file_system().path_exists(&self.path);
        let mut text = match template {
            Some(template) => ledger.file_system().read_file(template)?,
            None if exists && self.mode == ManifestMode::Append => {
                ledger.file_system().read_file(&self.path)?
            }
            None => String::new(),
        };
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        if !self.lines.is_empty() {
            text.push_str(&self.render_block());
        }

        if exists {
            ledger.modify_file(&self.path, text.as_bytes())?;
        } else {
            ledger.create_file(&self.path, text.as_bytes())?;
        }

        info!(
            path = %self.path.display(),
            template = ?self.template,
            lines = self.lines.len(),
            mode = ?self.mode,
            "Rewrote packaging manifest"
        );
        Ok(Some(self.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;
    use pretty_assertions::assert_eq;
    use std::{fs, sync::Arc};
    use tempfile::tempdir;

    fn ledger() -> VirtualFileLedger {
        VirtualFileLedger::new(Arc::new(RealFileSystem))
    }

    #[test]
    fn test_directive_rendering() {
        let mut rewriter = ManifestRewriter::new("MANIFEST.in", ManifestMode::Append);

        rewriter.add_include(&["README.md", "LICENSE"]).unwrap();
        rewriter.add_recursive_include("pkg/data", &["*.json"]).unwrap();
        rewriter.add_global_exclude(&["*.pyc"]).unwrap();
        rewriter.add_prune("build").unwrap();
        rewriter.add_comment("generated").unwrap();

        assert_eq!(
            rewriter.lines(),
            [
                "include README.md LICENSE",
                "recursive-include pkg/data *.json",
                "global-exclude *.pyc",
                "prune build",
                "# generated",
            ]
        );
    }

    #[test]
    fn test_missing_patterns() {
        let mut rewriter = ManifestRewriter::new("MANIFEST.in", ManifestMode::Append);
        let none: [&str; 0] = [];

        let err = rewriter.add_exclude(&none).unwrap_err();

        assert!(matches!(
            err,
            ManifestError::MissingPatterns {
                directive: "exclude"
            }
        ));
        assert!(rewriter.lines().is_empty());
    }

    #[test]
    fn test_rewrite_creates_missing_manifest_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("MANIFEST.in");
        let mut ledger = ledger();
        let mut rewriter = ManifestRewriter::new(&path, ManifestMode::Append);
        rewriter.add_include(&["dynamic_requirements.txt"]).unwrap();

        let written = rewriter.rewrite(&mut ledger).unwrap();

        assert_eq!(written, Some(path.clone()));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("{BLOCK_HEADER}\ninclude dynamic_requirements.txt\n{BLOCK_FOOTER}\n")
        );
        assert!(matches!(
            rewriter.rewrite(&mut ledger),
            Err(ManifestError::AlreadyRewritten { .. })
        ));
        assert!(matches!(
            rewriter.add_line("include x"),
            Err(ManifestError::AlreadyRewritten { .. })
        ));

        ledger.teardown();
        assert!(!path.exists());
    }

    #[test]
    fn test_append_mode_keeps_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("MANIFEST.in");
        fs::write(&path, "include README.md").unwrap();
        let mut ledger = ledger();
        let mut rewriter = ManifestRewriter::new(&path, ManifestMode::Append);
        rewriter.add_graft("assets").unwrap();

        rewriter.rewrite(&mut ledger).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("include README.md\n{BLOCK_HEADER}\ngraft assets\n{BLOCK_FOOTER}\n")
        );

        ledger.teardown();
        assert_eq!(fs::read_to_string(&path).unwrap(), "include README.md");
    }

    #[test]
    fn test_replace_mode_discards_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("MANIFEST.in");
        fs::write(&path, "include old.txt\n").unwrap();
        let mut ledger = ledger();
        let mut rewriter = ManifestRewriter::new(&path, ManifestMode::Replace);
        rewriter.add_include(&["new.txt"]).unwrap();

        rewriter.rewrite(&mut ledger).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("old.txt"));
        assert!(text.contains("include new.txt"));
    }

    #[test]
    fn test_rewrite_without_lines_touches_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("MANIFEST.in");
        let mut ledger = ledger();
        let mut rewriter = ManifestRewriter::new(&path, ManifestMode::Append);

        assert_eq!(rewriter.rewrite(&mut ledger).unwrap(), None);
        assert!(!path.exists());
        assert!(ledger.is_empty());
        assert!(rewriter.is_rewritten());
    }

    #[test]
    fn test_template_replaces_existing_manifest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("MANIFEST.in");
        let template = dir.path().join("extra_setup.MANIFEST.in");
        fs::write(&path, "include old.txt\n").unwrap();
        fs::write(&template, "graft docs").unwrap();
        let mut ledger = ledger();
        let mut rewriter =
            ManifestRewriter::new(&path, ManifestMode::Append).with_template(Some(template));
        rewriter.add_include(&["dynamic_requirements.txt"]).unwrap();

        rewriter.rewrite(&mut ledger).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("graft docs\n{BLOCK_HEADER}\ninclude dynamic_requirements.txt\n{BLOCK_FOOTER}\n")
        );
        ledger.teardown();
        assert_eq!(fs::read_to_string(&path).unwrap(), "include old.txt\n");
    }

    #[test]
    fn test_template_is_written_without_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("MANIFEST.in");
        let template = dir.path().join("extra_setup.MANIFEST.in");
        fs::write(&template, "include NOTICE\n").unwrap();
        let mut ledger = ledger();
        let mut rewriter =
            ManifestRewriter::new(&path, ManifestMode::Append).with_template(Some(template));

        assert_eq!(rewriter.rewrite(&mut ledger).unwrap(), Some(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "include NOTICE\n");

        ledger.teardown();
        assert!(!path.exists());
    }

    #[test]
    fn test_line_validation() {
        assert!(is_valid_line("include *.txt"));
        assert!(is_valid_line("  recursive-exclude tests *"));
        assert!(is_valid_line("# a comment"));
        assert!(!is_valid_line("includes *.txt"));
        assert!(!is_valid_line(""));
    }
}
