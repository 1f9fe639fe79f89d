use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Writer for the directory that holds `target`.
    pub fn for_target(target: &Path) -> Self {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::new(dir)
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // Replace existing file if present to keep determinism.
        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(PathBuf),
    /// A backup from an earlier run already exists and was left alone.
    Preserved(PathBuf),
}

/// `{original}{suffix}`, next to the original.
pub fn backup_path(original: &Path, suffix: &str) -> PathBuf {
    let mut name = original.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Every filesystem mutation of a run goes through this trait, so switching
/// the implementation is the only difference between a real and a preview run.
pub trait Workspace: Send + Sync {
    fn create_backup(&self, original: &Path, suffix: &str) -> Result<BackupOutcome, PersistError>;

    fn write_file(&self, target: &Path, content: &[u8]) -> Result<(), PersistError>;

    fn is_preview(&self) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DiskWorkspace;

impl Workspace for DiskWorkspace {
    fn create_backup(&self, original: &Path, suffix: &str) -> Result<BackupOutcome, PersistError> {
        let backup = backup_path(original, suffix);
        // Anything other than a regular file at the backup path makes the copy fail.
        if backup.is_file() {
            engine_debug!("Keeping existing backup {:?}", backup);
            return Ok(BackupOutcome::Preserved(backup));
        }
        fs::copy(original, &backup)?;
        engine_info!("Created backup: {:?}", backup);
        Ok(BackupOutcome::Created(backup))
    }

    fn write_file(&self, target: &Path, content: &[u8]) -> Result<(), PersistError> {
        let filename = target
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PersistError::OutputDir(format!("no file name in {target:?}")))?;
        AtomicFileWriter::for_target(target).write(filename, content)?;
        engine_debug!("Wrote {} bytes to {:?}", content.len(), target);
        Ok(())
    }
}

/// Reports what [`DiskWorkspace`] would do without touching the disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreviewWorkspace;

impl Workspace for PreviewWorkspace {
    fn create_backup(&self, original: &Path, suffix: &str) -> Result<BackupOutcome, PersistError> {
        let backup = backup_path(original, suffix);
        if backup.is_file() {
            Ok(BackupOutcome::Preserved(backup))
        } else {
            engine_debug!("Preview: would create backup {:?}", backup);
            Ok(BackupOutcome::Created(backup))
        }
    }

    fn write_file(&self, target: &Path, content: &[u8]) -> Result<(), PersistError> {
        engine_debug!("Preview: would write {} bytes to {:?}", content.len(), target);
        Ok(())
    }

    fn is_preview(&self) -> bool {
        true
    }
}
