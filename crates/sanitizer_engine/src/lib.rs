//! Sanitizer engine: document IO, rule application, asset localization and
//! the run pipeline.
mod assets;
mod config;
mod decode;
mod dom;
mod fetch;
mod filename;
mod locate;
mod persist;
mod rules;
mod sanitizer;
mod types;

pub use assets::{AssetLocalizer, LocalizeEnv, LocalizeOutcome};
pub use config::{load_config, parse_config, ConfigError, LoadedConfig, DEFAULT_CONFIG_FILE};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use dom::{Document, DomNode, Element, NodeKind, NodeVisitor, ParseError, Visit};
pub use fetch::{FetchSettings, Fetcher, OfflineFetcher, ReqwestFetcher};
pub use filename::{sanitize_stem, short_hash, url_extension, url_stem, AssetNamer};
pub use locate::DocumentLocator;
pub use persist::{
    backup_path, ensure_output_dir, AtomicFileWriter, BackupOutcome, DiskWorkspace, PersistError,
    PreviewWorkspace, Workspace,
};
pub use rules::{RuleEngine, RuleSet};
pub use sanitizer::{Clock, RunMode, RunOutcome, SanitizeError, Sanitizer};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, PageContext};
