use std::fmt::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    Download,
    Write,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "parse"),
            ErrorKind::Download => write!(f, "download"),
            ErrorKind::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Removed,
    AttributeReplaced,
    TextReplaced,
    StyleScrubbed,
    AssetDownloaded,
    AssetReused,
    AssetSkipped,
    BackupCreated,
    BackupPreserved,
    Written,
    Error(ErrorKind),
}

impl ChangeKind {
    /// True for kinds that alter the document itself, which is what decides
    /// whether a file gets backed up and rewritten.
    pub fn mutates_document(self) -> bool {
        matches!(
            self,
            ChangeKind::Removed
                | ChangeKind::AttributeReplaced
                | ChangeKind::TextReplaced
                | ChangeKind::StyleScrubbed
                | ChangeKind::AssetDownloaded
                | ChangeKind::AssetReused
        )
    }

    pub fn is_error(self) -> bool {
        matches!(self, ChangeKind::Error(_))
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Removed => write!(f, "removed"),
            ChangeKind::AttributeReplaced => write!(f, "attribute-replaced"),
            ChangeKind::TextReplaced => write!(f, "text-replaced"),
            ChangeKind::StyleScrubbed => write!(f, "style-scrubbed"),
            ChangeKind::AssetDownloaded => write!(f, "asset-downloaded"),
            ChangeKind::AssetReused => write!(f, "asset-reused"),
            ChangeKind::AssetSkipped => write!(f, "asset-skipped"),
            ChangeKind::BackupCreated => write!(f, "backup-created"),
            ChangeKind::BackupPreserved => write!(f, "backup-preserved"),
            ChangeKind::Written => write!(f, "written"),
            ChangeKind::Error(kind) => write!(f, "error({kind})"),
        }
    }
}

/// One logged unit of applied or attempted change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub file: PathBuf,
    pub kind: ChangeKind,
    pub detail: String,
}

impl ChangeRecord {
    pub fn new(file: impl Into<PathBuf>, kind: ChangeKind, detail: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            kind,
            detail: detail.into(),
        }
    }

    pub fn error(file: impl Into<PathBuf>, kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self::new(file, ChangeKind::Error(kind), detail)
    }
}

/// Records produced while processing a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub records: Vec<ChangeRecord>,
}

impl FileReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: ChangeKind, detail: impl Into<String>) {
        let record = ChangeRecord::new(self.path.clone(), kind, detail);
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ChangeRecord>) {
        self.records.extend(records);
    }

    pub fn mutation_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind.mutates_document())
            .count()
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| r.kind.is_error()).count()
    }

    pub fn is_unchanged(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub files_processed: usize,
    pub files_changed: usize,
    pub elements_removed: usize,
    pub attributes_replaced: usize,
    pub texts_replaced: usize,
    pub assets_downloaded: usize,
    pub assets_reused: usize,
    pub errors: usize,
}

/// Accumulates every file report of one run, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RunReport {
    pub preview: bool,
    pub generated_utc: Option<String>,
    pub files: Vec<FileReport>,
    pub downloaded_assets: Vec<PathBuf>,
    totals: Totals,
}

impl RunReport {
    pub fn new(preview: bool) -> Self {
        Self {
            preview,
            ..Self::default()
        }
    }

    pub fn with_timestamp(mut self, generated_utc: impl Into<String>) -> Self {
        self.generated_utc = Some(generated_utc.into());
        self
    }

    pub fn merge(&mut self, file: FileReport) {
        let totals = &mut self.totals;
        totals.files_processed += 1;
        if file.mutation_count() > 0 {
            totals.files_changed += 1;
        }
        totals.elements_removed += file.count(ChangeKind::Removed);
        totals.attributes_replaced += file.count(ChangeKind::AttributeReplaced);
        totals.texts_replaced += file.count(ChangeKind::TextReplaced);
        totals.assets_downloaded += file.count(ChangeKind::AssetDownloaded);
        totals.assets_reused += file.count(ChangeKind::AssetReused);
        totals.errors += file.error_count();
        self.files.push(file);
    }

    pub fn record_download(&mut self, stored_at: &Path) {
        self.downloaded_assets.push(stored_at.to_path_buf());
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn records(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.files.iter().flat_map(|f| f.records.iter())
    }

    pub fn record_count(&self) -> usize {
        self.files.iter().map(|f| f.records.len()).sum()
    }

    /// Plain-text report grouped by file, followed by totals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let heading = if self.preview {
            "SANITIZATION PREVIEW (no files were modified)"
        } else {
            "SANITIZATION COMPLETE"
        };
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "{heading}");
        if let Some(ts) = &self.generated_utc {
            let _ = writeln!(out, "Generated: {ts}");
        }
        let _ = writeln!(out, "{RULE}");

        for file in &self.files {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", file.path.display());
            if file.is_unchanged() {
                let _ = writeln!(out, "  (no changes)");
                continue;
            }
            for record in &file.records {
                let _ = writeln!(out, "  [{}] {}", record.kind, record.detail);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Downloaded assets:");
        if self.downloaded_assets.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for asset in &self.downloaded_assets {
            let _ = writeln!(out, "  - {}", asset.display());
        }

        let t = self.totals;
        let _ = writeln!(out);
        let _ = writeln!(out, "{THIN_RULE}");
        let _ = writeln!(out, "Totals");
        let _ = writeln!(out, "{THIN_RULE}");
        let _ = writeln!(out, "Files processed:     {}", t.files_processed);
        let _ = writeln!(out, "Files changed:       {}", t.files_changed);
        let _ = writeln!(out, "Elements removed:    {}", t.elements_removed);
        let _ = writeln!(out, "Attributes replaced: {}", t.attributes_replaced);
        let _ = writeln!(out, "Texts replaced:      {}", t.texts_replaced);
        let _ = writeln!(out, "Assets downloaded:   {}", t.assets_downloaded);
        let _ = writeln!(out, "Assets reused:       {}", t.assets_reused);
        let _ = writeln!(out, "Errors:              {}", t.errors);
        out
    }
}
