use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use sanitizer_core::Settings;
use thiserror::Error;

use crate::rules::RuleSet;

pub const DEFAULT_CONFIG_FILE: &str = "sanitize-config.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },
    #[error("invalid css pattern `{pattern}`: {source}")]
    CssPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Settings validated and compiled once, before any document is touched.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub settings: Settings,
    pub rules: RuleSet,
}

impl LoadedConfig {
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        validate(&settings)?;
        let rules = RuleSet::compile(&settings)?;
        Ok(Self { settings, rules })
    }
}

pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text)?;
    engine_info!("Loaded config from {:?}", path);
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<LoadedConfig, ConfigError> {
    let settings: Settings = if text.trim().is_empty() {
        Settings::default()
    } else {
        serde_yaml::from_str(text)?
    };
    LoadedConfig::from_settings(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::Invalid(msg));

    if settings.remove_patterns.iter().any(|p| p.trim().is_empty()) {
        return invalid("remove_patterns may not contain empty strings".into());
    }
    if settings.assets.vendor_domains.iter().any(|d| d.trim().is_empty()) {
        return invalid("assets.vendor_domains may not contain empty strings".into());
    }
    if settings.assets.local_path.as_os_str().is_empty() {
        return invalid("assets.local_path may not be empty".into());
    }
    for pair in &settings.attribute_replacements {
        if pair.from.trim().is_empty() || pair.to.trim().is_empty() {
            return invalid("attribute_replacements need non-empty `from` and `to`".into());
        }
        if pair.from.eq_ignore_ascii_case(&pair.to) {
            return invalid(format!("attribute replacement `{}` maps onto itself", pair.from));
        }
    }
    for rule in &settings.remove_elements {
        if rule.contains.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return invalid(format!("remove_elements `{}` has an empty `contains`", rule.selector));
        }
    }
    if settings.output.backup && settings.output.backup_suffix.is_empty() {
        return invalid("output.backup_suffix may not be empty while backups are enabled".into());
    }
    if settings.files.extensions.is_empty() {
        return invalid("files.extensions may not be empty".into());
    }
    Ok(())
}
