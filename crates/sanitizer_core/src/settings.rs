use std::fmt;
use std::path::PathBuf;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Fully defaulted settings for one sanitization run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub personal: PersonalInfo,
    #[serde(deserialize_with = "deserialize_pages")]
    pub pages: Vec<PageOverride>,
    pub remove_patterns: Vec<String>,
    pub remove_elements: Vec<ElementRule>,
    pub css_patterns: Vec<String>,
    pub attribute_replacements: Vec<AttributeReplacement>,
    pub assets: AssetSettings,
    pub files: FileSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    pub name: String,
    pub title: String,
    pub description: String,
}

/// Title/description override for one page (or a family of pages sharing a
/// path prefix). `key` comes from the mapping key in the settings document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageOverride {
    #[serde(skip)]
    pub key: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub title_template: Option<String>,
    pub description_template: Option<String>,
    pub path_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementRule {
    pub selector: String,
    #[serde(default)]
    pub contains: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeReplacement {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Favicon,
    OgImage,
    TwitterImage,
    Image,
}

impl AssetCategory {
    pub const DEFAULT_SET: [AssetCategory; 3] = [
        AssetCategory::Favicon,
        AssetCategory::OgImage,
        AssetCategory::TwitterImage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetCategory::Favicon => "favicon",
            AssetCategory::OgImage => "og_image",
            AssetCategory::TwitterImage => "twitter_image",
            AssetCategory::Image => "image",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetSettings {
    pub download_external: bool,
    pub local_path: PathBuf,
    pub vendor_domains: Vec<String>,
    pub categories: Option<Vec<AssetCategory>>,
    pub timeout_secs: u64,
    pub max_bytes: u64,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            download_external: true,
            local_path: PathBuf::from("assets/images"),
            vendor_domains: Vec::new(),
            categories: None,
            timeout_secs: 30,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl AssetSettings {
    pub fn allows(&self, category: AssetCategory) -> bool {
        match &self.categories {
            Some(allowed) => allowed.contains(&category),
            None => AssetCategory::DEFAULT_SET.contains(&category),
        }
    }

    /// Case-sensitive substring match against any configured vendor domain.
    pub fn is_vendor_host(&self, host: &str) -> bool {
        self.vendor_domains
            .iter()
            .any(|domain| host.contains(domain.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            extensions: vec!["html".to_string(), "htm".to_string()],
            exclude: vec![".git".to_string(), "node_modules".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub backup: bool,
    pub backup_suffix: String,
    pub report_file: PathBuf,
    pub report_format: ReportFormat,
    pub output_dir: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            backup: true,
            backup_suffix: ".backup".to_string(),
            report_file: PathBuf::from("sanitize-report.txt"),
            report_format: ReportFormat::Text,
            output_dir: None,
        }
    }
}

/// Reads the `pages` mapping in authored order, rejecting duplicate keys.
fn deserialize_pages<'de, D>(deserializer: D) -> Result<Vec<PageOverride>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PagesVisitor;

    impl<'de> Visitor<'de> for PagesVisitor {
        type Value = Vec<PageOverride>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of page identifiers to overrides")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut pages: Vec<PageOverride> = Vec::new();
            while let Some((key, mut page)) = map.next_entry::<String, PageOverride>()? {
                if pages.iter().any(|existing| existing.key == key) {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate page override `{key}`"
                    )));
                }
                page.key = key;
                pages.push(page);
            }
            Ok(pages)
        }
    }

    deserializer.deserialize_any(PagesVisitor)
}
