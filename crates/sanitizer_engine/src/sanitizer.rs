use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use sanitizer_core::{ChangeKind, ErrorKind, FileReport, ReportFormat, RunReport};
use thiserror::Error;

use crate::assets::{AssetLocalizer, LocalizeEnv};
use crate::config::LoadedConfig;
use crate::dom::Document;
use crate::fetch::{FetchSettings, Fetcher, OfflineFetcher, ReqwestFetcher};
use crate::locate::DocumentLocator;
use crate::persist::{BackupOutcome, DiskWorkspace, PersistError, PreviewWorkspace, Workspace};
use crate::rules::RuleEngine;
use crate::PageContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Apply,
    /// Runs every rule and reports the outcome without network access or
    /// filesystem writes.
    Preview,
}

/// Produces the report timestamp.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("template directory {0:?} does not exist or is not a directory")]
    MissingRoot(PathBuf),
    #[error("cannot write report {path:?}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
    #[error("cannot encode report: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("cannot start runtime: {0}")]
    Runtime(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Where the report was written; `None` for preview runs.
    pub report_path: Option<PathBuf>,
    /// Plain-text rendering of the report.
    pub rendered: String,
    /// Documents rewritten during this run.
    pub written: Vec<PathBuf>,
}

struct FileOutcome {
    report: FileReport,
    downloaded: Vec<PathBuf>,
    written: Option<PathBuf>,
}

pub struct Sanitizer {
    config: LoadedConfig,
    root: PathBuf,
    mode: RunMode,
    fetcher: Arc<dyn Fetcher>,
    clock: Option<Clock>,
}

impl Sanitizer {
    pub fn new(config: LoadedConfig, root: impl Into<PathBuf>, mode: RunMode) -> Self {
        let fetcher = Arc::new(ReqwestFetcher::new(FetchSettings::from_assets(
            &config.settings.assets,
        )));
        Self {
            config,
            root: root.into(),
            mode,
            fetcher,
            clock: None,
        }
    }

    /// Replaces the network fetcher used by apply runs. Preview runs never
    /// fetch.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Root of the tree documents are written to.
    pub fn dest_root(&self) -> PathBuf {
        match &self.config.settings.output.output_dir {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }

    /// Runs on a fresh single-threaded runtime; for callers outside async code.
    pub fn run_blocking(&self) -> Result<RunOutcome, SanitizeError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run())
    }

    pub async fn run(&self) -> Result<RunOutcome, SanitizeError> {
        if !self.root.is_dir() {
            return Err(SanitizeError::MissingRoot(self.root.clone()));
        }
        let preview = self.mode == RunMode::Preview;
        let settings = &self.config.settings;
        let dest_root = self.dest_root();

        let workspace: &dyn Workspace = if preview { &PreviewWorkspace } else { &DiskWorkspace };
        let fetcher: &dyn Fetcher = if preview { &OfflineFetcher } else { self.fetcher.as_ref() };
        let env = LocalizeEnv {
            settings: &settings.assets,
            dest_root: &dest_root,
            fetcher,
            workspace,
        };

        let mut report = RunReport::new(preview);
        if let Some(clock) = &self.clock {
            report = report.with_timestamp((**clock)());
        }

        let locator = DocumentLocator::new(&self.root, settings);
        let sources: Vec<PathBuf> = locator.iter().collect();
        engine_info!(
            "Found {} template file(s) under {:?}{}",
            sources.len(),
            self.root,
            if preview { " (preview)" } else { "" }
        );

        let engine = RuleEngine::new(&self.config);
        let mut localizer = AssetLocalizer::new();
        let mut written = Vec::new();
        for source in sources {
            let page = PageContext::new(&self.root, &dest_root, &source);
            let outcome = self.process_file(&page, &engine, &mut localizer, &env).await;
            for asset in &outcome.downloaded {
                report.record_download(asset);
            }
            written.extend(outcome.written);
            report.merge(outcome.report);
        }

        let rendered = report.render_text();
        let report_path = if preview {
            None
        } else {
            Some(self.write_report(&report, &rendered)?)
        };

        let totals = report.totals();
        engine_info!(
            "Processed {} file(s), changed {}, {} error(s)",
            totals.files_processed,
            totals.files_changed,
            totals.errors
        );
        Ok(RunOutcome {
            report,
            report_path,
            rendered,
            written,
        })
    }

    async fn process_file(
        &self,
        page: &PageContext,
        engine: &RuleEngine<'_>,
        localizer: &mut AssetLocalizer,
        env: &LocalizeEnv<'_>,
    ) -> FileOutcome {
        let output = &self.config.settings.output;
        let mut outcome = FileOutcome {
            report: FileReport::new(&page.relative),
            downloaded: Vec::new(),
            written: None,
        };
        engine_debug!("Processing {}", page.relative.display());

        let mut doc = match Document::read(&page.source) {
            Ok((doc, encoding)) => {
                engine_debug!("Decoded {} as {}", page.relative.display(), encoding);
                doc
            }
            Err(err) => {
                engine_error!("Skipping {:?}: {}", page.source, err);
                outcome.report.push(ChangeKind::Error(ErrorKind::Parse), err.to_string());
                return outcome;
            }
        };
        outcome.report.extend(engine.apply(&mut doc, page));
        let localized = localizer.localize(&mut doc, page, env).await;
        outcome.report.extend(localized.records);
        outcome.downloaded = localized.downloaded;

        if outcome.report.mutation_count() == 0 && page.in_place() {
            return outcome;
        }

        if page.in_place() && output.backup {
            match env.workspace.create_backup(&page.source, &output.backup_suffix) {
                Ok(BackupOutcome::Created(path)) => outcome
                    .report
                    .push(ChangeKind::BackupCreated, path.display().to_string()),
                Ok(BackupOutcome::Preserved(path)) => outcome.report.push(
                    ChangeKind::BackupPreserved,
                    format!("{} (kept from an earlier run)", path.display()),
                ),
                Err(err) => {
                    engine_warn!("Backup of {:?} failed, leaving it untouched: {}", page.source, err);
                    outcome
                        .report
                        .push(ChangeKind::Error(ErrorKind::Write), format!("backup failed: {err}"));
                    return outcome;
                }
            }
        }

        if doc.declare_utf8() > 0 {
            engine_debug!("Declared UTF-8 in {}", page.relative.display());
        }
        let html = doc.to_html();
        match env.workspace.write_file(&page.target, html.as_bytes()) {
            Ok(()) => {
                outcome.report.push(
                    ChangeKind::Written,
                    format!("{} bytes to {}", html.len(), page.target.display()),
                );
                if !env.workspace.is_preview() {
                    outcome.written = Some(page.target.clone());
                }
            }
            Err(err) => {
                engine_error!("Cannot write {:?}: {}", page.target, err);
                outcome
                    .report
                    .push(ChangeKind::Error(ErrorKind::Write), format!("write failed: {err}"));
            }
        }
        outcome
    }

    /// The report lives under the template root even when documents are
    /// mirrored into an output directory.
    fn write_report(&self, report: &RunReport, rendered: &str) -> Result<PathBuf, SanitizeError> {
        let output = &self.config.settings.output;
        let path = self.root.join(&output.report_file);
        let content = match output.report_format {
            ReportFormat::Text => rendered.to_string(),
            ReportFormat::Json => serde_json::to_string_pretty(report)?,
        };
        DiskWorkspace
            .write_file(&path, content.as_bytes())
            .map_err(|source| SanitizeError::Report {
                path: path.clone(),
                source,
            })?;
        engine_info!("Report written to {:?}", path);
        Ok(path)
    }
}
