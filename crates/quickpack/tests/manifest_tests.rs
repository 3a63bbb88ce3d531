use quickpack::{
    fs::RealFileSystem,
    ledger::VirtualFileLedger,
    manifest::{BLOCK_FOOTER, BLOCK_HEADER, ManifestError, ManifestMode, ManifestRewriter},
};
use std::{fs, sync::Arc};
use tempfile::tempdir;
use pretty_assertions::assert_eq;

#[test]
fn test_manifest_is_created_then_removed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("MANIFEST.in");
    let mut ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));
    let mut rewriter = ManifestRewriter::new(&path, ManifestMode::Append);

    rewriter.add_include(&["dynamic_requirements.txt"]).unwrap();
    rewriter.add_global_exclude(&["*.pyc"]).unwrap();
    let written = rewriter.rewrite(&mut ledger).unwrap();

    assert_eq!(written.as_deref(), Some(path.as_path()));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("{BLOCK_HEADER}\ninclude dynamic_requirements.txt\nglobal-exclude *.pyc\n{BLOCK_FOOTER}\n")
    );

    ledger.teardown();
    assert!(!path.exists());
}

#[test]
fn test_second_rewrite_is_refused_and_changes_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("MANIFEST.in");
    fs::write(&path, "include LICENSE").unwrap();
    let mut ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));
    let mut rewriter = ManifestRewriter::new(&path, ManifestMode::Append);
    rewriter.add_include(&["README.md"]).unwrap();
    rewriter.rewrite(&mut ledger).unwrap();
    let after_first = fs::read_to_string(&path).unwrap();

    let second = rewriter.rewrite(&mut ledger);
    let late_line = rewriter.add_include(&["CHANGES.md"]);

    assert!(matches!(second, Err(ManifestError::AlreadyRewritten { .. })));
    assert!(matches!(late_line, Err(ManifestError::AlreadyRewritten { .. })));
    assert!(after_first.starts_with("include LICENSE\n"));
    assert_eq!(fs::read_to_string(&path).unwrap(), after_first);

    ledger.teardown();
    assert_eq!(fs::read_to_string(&path).unwrap(), "include LICENSE");
}

#[test]
fn test_replace_mode_drops_existing_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("MANIFEST.in");
    fs::write(&path, "include OLD\n").unwrap();
    let mut ledger = VirtualFileLedger::new(Arc::new(RealFileSystem));
    let mut rewriter = ManifestRewriter::new(&path, ManifestMode::Replace);

    rewriter.add_line("graft docs").unwrap();
    rewriter.rewrite(&mut ledger).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(!text.contains("include OLD"));
    assert!(text.contains("graft docs"));

    ledger.teardown();
    assert_eq!(fs::read_to_string(&path).unwrap(), "include OLD\n");
}
