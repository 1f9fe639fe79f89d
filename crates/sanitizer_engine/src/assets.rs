use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use engine_logging::{engine_debug, engine_info, engine_warn};
use sanitizer_core::{AssetCategory, AssetSettings, ChangeKind, ChangeRecord, ErrorKind};
use url::Url;

use crate::dom::{Document, DomNode, Element, Visit};
use crate::fetch::Fetcher;
use crate::filename::{url_extension, url_stem, AssetNamer};
use crate::persist::Workspace;
use crate::rules::is_icon_link;
use crate::PageContext;

/// Collaborators the localizer needs for one document.
pub struct LocalizeEnv<'a> {
    pub settings: &'a AssetSettings,
    /// Directory the processed tree is written to; assets land in
    /// `{dest_root}/{local_path}`.
    pub dest_root: &'a Path,
    pub fetcher: &'a dyn Fetcher,
    pub workspace: &'a dyn Workspace,
}

#[derive(Debug, Default)]
pub struct LocalizeOutcome {
    pub records: Vec<ChangeRecord>,
    /// Files stored for this document, first download only.
    pub downloaded: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
enum Resolution {
    Stored(PathBuf),
    Failed(ErrorKind, String),
}

/// One vendor-hosted reference found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    category: AssetCategory,
    original: String,
    url: String,
    stem: String,
    ext: String,
}

/// Downloads vendor assets once per run and points documents at the local
/// copies. The URL cache lives as long as the localizer, which is one run.
#[derive(Debug, Default)]
pub struct AssetLocalizer {
    cache: HashMap<String, Resolution>,
    namer: AssetNamer,
}

impl AssetLocalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn localize(
        &mut self,
        doc: &mut Document,
        page: &PageContext,
        env: &LocalizeEnv<'_>,
    ) -> LocalizeOutcome {
        let mut outcome = LocalizeOutcome::default();
        let candidates = collect_candidates(doc, env.settings);
        if candidates.is_empty() {
            return outcome;
        }

        let mut rewrites: HashMap<String, String> = HashMap::new();
        for candidate in candidates {
            let label = format!("{} {}", candidate.category, candidate.url);

            if !env.settings.download_external {
                outcome.records.push(ChangeRecord::new(
                    &page.relative,
                    ChangeKind::AssetSkipped,
                    format!("{label} (download disabled)"),
                ));
                continue;
            }

            let (stored, fresh) = match self.cache.get(&candidate.url) {
                Some(Resolution::Stored(local)) => (Ok(local.clone()), false),
                Some(Resolution::Failed(kind, reason)) => {
                    (Err((*kind, format!("{reason} (not retried)"))), false)
                }
                None => {
                    let result = self.download(&candidate, env).await;
                    let resolution = match &result {
                        Ok(local) => Resolution::Stored(local.clone()),
                        Err((kind, reason)) => Resolution::Failed(*kind, reason.clone()),
                    };
                    self.cache.insert(candidate.url.clone(), resolution);
                    (result, true)
                }
            };

            match stored {
                Ok(local) => {
                    let reference = relative_reference(&local, page.target_dir());
                    let (kind, suffix) = if fresh {
                        outcome.downloaded.push(local.clone());
                        (ChangeKind::AssetDownloaded, "")
                    } else {
                        (ChangeKind::AssetReused, " (already downloaded)")
                    };
                    outcome.records.push(ChangeRecord::new(
                        &page.relative,
                        kind,
                        format!("{label} -> {reference}{suffix}"),
                    ));
                    rewrites.insert(candidate.original.clone(), reference);
                }
                Err((kind, reason)) => {
                    outcome.records.push(ChangeRecord::error(
                        &page.relative,
                        kind,
                        format!("{label}: {reason}"),
                    ));
                }
            }
        }

        if !rewrites.is_empty() {
            apply_rewrites(doc, env.settings, &rewrites);
        }
        outcome
    }

    async fn download(
        &mut self,
        candidate: &Candidate,
        env: &LocalizeEnv<'_>,
    ) -> Result<PathBuf, (ErrorKind, String)> {
        let output = env.fetcher.fetch(&candidate.url).await.map_err(|err| {
            engine_warn!("Failed to download {}: {}", candidate.url, err);
            (ErrorKind::Download, err.to_string())
        })?;

        let name = self.namer.claim(&candidate.stem, &candidate.ext, &candidate.url);
        let local = env.dest_root.join(&env.settings.local_path).join(name);
        env.workspace
            .write_file(&local, &output.bytes)
            .map_err(|err| {
                engine_warn!("Failed to store {:?}: {}", local, err);
                (ErrorKind::Write, format!("cannot store {}: {err}", local.display()))
            })?;
        engine_info!(
            "Downloaded: {} -> {:?} ({} bytes)",
            candidate.url,
            local,
            output.metadata.byte_len
        );
        Ok(local)
    }
}

/// The attribute carrying an asset URL for `el`, if `el` is one of the
/// reference kinds the settings allow.
fn reference_attr(el: &Element, settings: &AssetSettings) -> Option<(AssetCategory, &'static str)> {
    let found = if is_icon_link(el) {
        Some((AssetCategory::Favicon, "href"))
    } else if el.is("meta") && el.attr_is("property", "og:image") {
        Some((AssetCategory::OgImage, "content"))
    } else if el.is("meta") && el.attr_is("name", "twitter:image") {
        Some((AssetCategory::TwitterImage, "content"))
    } else if el.is("img") {
        Some((AssetCategory::Image, "src"))
    } else {
        None
    };
    found.filter(|(category, _)| settings.allows(*category))
}

fn collect_candidates(doc: &Document, settings: &AssetSettings) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    doc.for_each_element(|_, el| {
        let Some((category, attr)) = reference_attr(el, settings) else {
            return;
        };
        let Some(original) = el.attr(attr) else {
            return;
        };
        let Some(url) = vendor_url(original, settings) else {
            return;
        };
        let stem = match category {
            AssetCategory::Favicon => favicon_stem(el, original),
            AssetCategory::OgImage => "og-preview".to_string(),
            AssetCategory::TwitterImage => "twitter-preview".to_string(),
            AssetCategory::Image => url_stem(&url),
        };
        candidates.push(Candidate {
            category,
            original: original.to_string(),
            ext: url_extension(&url),
            url: url.to_string(),
            stem,
        });
    });
    engine_debug!("Found {} vendor asset reference(s)", candidates.len());
    candidates
}

/// Parses `raw` as an absolute http(s) URL on a vendor host.
fn vendor_url(raw: &str, settings: &AssetSettings) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = if raw.starts_with("//") {
        Url::parse(&format!("https:{raw}")).ok()?
    } else {
        Url::parse(raw).ok()?
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;
    settings.is_vendor_host(host).then_some(url)
}

fn favicon_stem(el: &Element, href: &str) -> String {
    if el.has_token("rel", "apple-touch-icon") {
        return "apple-touch-icon".to_string();
    }
    let media = el.attr("media").unwrap_or_default().to_ascii_lowercase();
    if href.to_ascii_lowercase().contains("dark") || media.contains("dark") {
        "favicon-dark".to_string()
    } else {
        "favicon-light".to_string()
    }
}

fn apply_rewrites(doc: &mut Document, settings: &AssetSettings, rewrites: &HashMap<String, String>) {
    doc.walk(&mut |node: &mut DomNode| {
        let Some(el) = node.as_element_mut() else {
            return Visit::Continue;
        };
        if let Some((_, attr)) = reference_attr(el, settings) {
            if let Some(local) = el.attr(attr).and_then(|value| rewrites.get(value)).cloned() {
                el.set_attr(attr, local);
            }
        }
        Visit::Continue
    });
}

/// `local` as seen from `from_dir`, always with `/` separators.
fn relative_reference(local: &Path, from_dir: &Path) -> String {
    let relative = pathdiff::diff_paths(local, from_dir).unwrap_or_else(|| local.to_path_buf());
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str().map(ToOwned::to_owned),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir => Some(String::new()),
            Component::Prefix(prefix) => prefix.as_os_str().to_str().map(ToOwned::to_owned),
            Component::CurDir => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
