use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use sanitizer_core::{AssetCategory, ReportFormat, Settings};
use sanitizer_engine::{load_config, parse_config, ConfigError};
use tempfile::TempDir;

#[test]
fn empty_document_yields_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config.settings, Settings::default());
    assert!(config.settings.assets.download_external);
    assert_eq!(config.settings.assets.local_path, Path::new("assets/images"));
    assert!(config.settings.output.backup);
    assert_eq!(config.settings.output.backup_suffix, ".backup");
    assert_eq!(config.settings.output.report_format, ReportFormat::Text);
}

#[test]
fn shipped_sample_config_loads() {
    let config = parse_config(include_str!("../../../sanitize-config.yml")).unwrap();
    let settings = &config.settings;
    assert_eq!(settings.personal.name, "Matt");
    assert!(settings
        .assets
        .vendor_domains
        .contains(&"framerusercontent.com".to_string()));
    assert_eq!(settings.attribute_replacements[0].from, "data-framer-name");
    assert_eq!(settings.css_patterns.len(), 1);
}

#[test]
fn pages_keep_authored_order() {
    let yaml = "\
pages:
  zeta:
    title: Z
  alpha:
    title: A
  work:
    path_prefix: work/
";
    let config = parse_config(yaml).unwrap();
    let keys: Vec<&str> = config.settings.pages.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["zeta", "alpha", "work"]);
    assert_eq!(config.settings.pages[2].path_prefix.as_deref(), Some("work/"));
}

#[test]
fn duplicate_page_keys_are_rejected() {
    let yaml = "\
pages:
  home:
    title: One
  home:
    title: Two
";
    let err = parse_config(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "{err}");
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let err = parse_config("personal: [unterminated").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = parse_config("assets:\n  download_everything: true\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn categories_parse_as_snake_case() {
    let config = parse_config("assets:\n  categories: [favicon, image]\n").unwrap();
    let assets = &config.settings.assets;
    assert!(assets.allows(AssetCategory::Image));
    assert!(assets.allows(AssetCategory::Favicon));
    assert!(!assets.allows(AssetCategory::OgImage));
}

#[test]
fn default_categories_leave_plain_images_alone() {
    let config = parse_config("").unwrap();
    assert!(config.settings.assets.allows(AssetCategory::TwitterImage));
    assert!(!config.settings.assets.allows(AssetCategory::Image));
}

#[test]
fn empty_vendor_domain_is_invalid() {
    let err = parse_config("assets:\n  vendor_domains: [framer.com, '']\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
}

#[test]
fn empty_local_path_is_invalid() {
    let err = parse_config("assets:\n  local_path: ''\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn replacement_onto_itself_is_invalid() {
    let yaml = "attribute_replacements:\n  - from: data-x\n    to: DATA-X\n";
    let err = parse_config(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn bad_selector_is_reported() {
    let yaml = "remove_elements:\n  - selector: 'div..badge'\n";
    let err = parse_config(yaml).unwrap_err();
    match err {
        ConfigError::Selector { selector, .. } => assert_eq!(selector, "div..badge"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn combinator_selectors_are_accepted() {
    let yaml = "remove_elements:\n  - selector: \"div.badge > a, #footer a[href*=framer]\"\n";
    assert!(parse_config(yaml).is_ok());
}

#[test]
fn bad_css_pattern_is_reported() {
    let err = parse_config("css_patterns: ['(unclosed']\n").unwrap_err();
    match err {
        ConfigError::CssPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_file_is_a_read_error() {
    let temp = TempDir::new().unwrap();
    let err = load_config(&temp.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn load_config_reads_from_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sanitize-config.yml");
    fs::write(&path, "personal:\n  name: Ada\noutput:\n  report_format: json\n").unwrap();
    let config = load_config(&path).unwrap();
    assert_eq!(config.settings.personal.name, "Ada");
    assert_eq!(config.settings.output.report_format, ReportFormat::Json);
}
