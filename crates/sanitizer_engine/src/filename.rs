use std::collections::HashMap;

use sha2::{Digest, Sha256};
use url::Url;

const DEFAULT_EXTENSION: &str = "png";
const MAX_STEM_LEN: usize = 80;

/// Extension of the last path segment of `url`, lower-cased; `png` when the
/// URL has none or it looks bogus.
pub fn url_extension(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// File stem of the last path segment of `url`, made filesystem safe.
pub fn url_stem(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let stem = last.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(last);
    sanitize_stem(stem, "image")
}

/// Windows-safe stem: forbidden characters become `_`, runs of `_` collapse,
/// reserved device names get a trailing `_`.
pub fn sanitize_stem(input: &str, fallback: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) || c.is_whitespace() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', '.'][..]);

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }
    if compacted.is_empty() {
        compacted = fallback.to_string();
    }
    if compacted.len() > MAX_STEM_LEN {
        let mut end = MAX_STEM_LEN;
        while !compacted.is_char_boundary(end) {
            end -= 1;
        }
        compacted.truncate(end);
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

pub fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

/// Hands out local file names for one run. A name belongs to the first URL
/// that claims it; a different URL asking for the same name gets
/// `{stem}-{short_hash(url)}.{ext}` instead.
#[derive(Debug, Default)]
pub struct AssetNamer {
    claimed: HashMap<String, String>,
}

impl AssetNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, stem: &str, ext: &str, url: &str) -> String {
        let preferred = format!("{stem}.{ext}");
        match self.claimed.get(&preferred) {
            None => {
                self.claimed.insert(preferred.clone(), url.to_string());
                preferred
            }
            Some(owner) if owner == url => preferred,
            Some(_) => {
                let hashed = format!("{stem}-{}.{ext}", short_hash(url));
                self.claimed.insert(hashed.clone(), url.to_string());
                hashed
            }
        }
    }
}
