use std::path::{Path, PathBuf};

use engine_logging::engine_warn;
use sanitizer_core::Settings;
use walkdir::{DirEntry, WalkDir};

/// Finds the markup files of a template tree.
///
/// Every call to [`DocumentLocator::iter`] walks the tree again, in lexical
/// file-name order at each level.
#[derive(Debug, Clone)]
pub struct DocumentLocator {
    root: PathBuf,
    output_dir: Option<PathBuf>,
    extensions: Vec<String>,
    exclude: Vec<String>,
    backup_suffix: String,
}

impl DocumentLocator {
    pub fn new(root: impl Into<PathBuf>, settings: &Settings) -> Self {
        let root = root.into();
        let output_dir = settings.output.output_dir.as_ref().map(|dir| root.join(dir));
        Self {
            root,
            output_dir,
            extensions: settings
                .files
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            exclude: settings.files.exclude.clone(),
            backup_suffix: settings.output.backup_suffix.clone(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !self.is_pruned(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    engine_warn!("Skipping unreadable path: {}", err);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path)
            .filter(move |path| self.is_candidate(path))
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        if let Some(out) = &self.output_dir {
            if entry.path().starts_with(out) {
                return true;
            }
        }
        let name = entry.file_name().to_string_lossy();
        self.exclude.iter().any(|excluded| excluded.as_str() == name)
    }

    fn is_candidate(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !self.backup_suffix.is_empty() && name.ends_with(&self.backup_suffix) {
            return false;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
    }
}
