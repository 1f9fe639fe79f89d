use std::fs;

use sanitizer_engine::{
    backup_path, ensure_output_dir, AtomicFileWriter, BackupOutcome, DiskWorkspace,
    PreviewWorkspace, Workspace,
};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("assets/images");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("index.html", b"hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "index.html");
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    let second = writer.write("index.html", b"world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("index.html", b"data").is_err());
    assert!(!file_path.with_file_name("index.html").exists());
}

#[test]
fn backup_sits_next_to_the_original() {
    let original = std::path::Path::new("site/work/index.html");
    assert_eq!(
        backup_path(original, ".backup"),
        std::path::Path::new("site/work/index.html.backup")
    );
}

#[test]
fn existing_backup_is_never_overwritten() {
    let temp = TempDir::new().unwrap();
    let page = temp.path().join("index.html");
    fs::write(&page, "first original").unwrap();

    let workspace = DiskWorkspace;
    let created = workspace.create_backup(&page, ".backup").unwrap();
    let backup = temp.path().join("index.html.backup");
    assert_eq!(created, BackupOutcome::Created(backup.clone()));

    fs::write(&page, "sanitized once").unwrap();
    let again = workspace.create_backup(&page, ".backup").unwrap();
    assert_eq!(again, BackupOutcome::Preserved(backup.clone()));
    assert_eq!(fs::read_to_string(&backup).unwrap(), "first original");
}

#[test]
fn disk_workspace_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("assets/images/favicon-light.png");
    DiskWorkspace.write_file(&target, b"png").unwrap();
    assert_eq!(fs::read(&target).unwrap(), b"png");
}

#[test]
fn preview_workspace_touches_nothing() {
    let temp = TempDir::new().unwrap();
    let page = temp.path().join("index.html");
    fs::write(&page, "original").unwrap();

    let workspace = PreviewWorkspace;
    assert!(workspace.is_preview());
    let outcome = workspace.create_backup(&page, ".backup").unwrap();
    assert_eq!(outcome, BackupOutcome::Created(temp.path().join("index.html.backup")));
    workspace
        .write_file(&temp.path().join("assets/images/a.png"), b"png")
        .unwrap();
    workspace.write_file(&page, b"changed").unwrap();

    let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(fs::read_to_string(&page).unwrap(), "original");
}
