//! Sanitizer core: settings model, page metadata resolution and the run report.
mod page;
mod report;
mod settings;

pub use page::{page_identifier, project_name, resolve_page_meta, PageMeta, HOME_PAGE};
pub use report::{ChangeKind, ChangeRecord, ErrorKind, FileReport, RunReport, Totals};
pub use settings::{
    AssetCategory, AssetSettings, AttributeReplacement, ElementRule, FileSettings, OutputSettings,
    PageOverride, PersonalInfo, ReportFormat, Settings,
};
