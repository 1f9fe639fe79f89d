use std::collections::HashSet;

use ego_tree::NodeId;
use engine_logging::{engine_debug, engine_trace};
use regex::Regex;
use sanitizer_core::{resolve_page_meta, ChangeKind, ChangeRecord, Settings};
use scraper::Selector;

use crate::config::{ConfigError, LoadedConfig};
use crate::dom::{Document, DomNode, Element, NodeKind, Visit};
use crate::PageContext;

/// Pattern rules never remove the document skeleton.
const PROTECTED_TAGS: &[&str] = &["html", "head", "body"];
/// Foreign content; its `title` and `meta` are not document metadata.
const FOREIGN_ROOTS: &[&str] = &["svg", "math"];
const MAX_DETAIL_LEN: usize = 160;

#[derive(Debug, Clone)]
struct ElementRemoval {
    source: String,
    selector: Selector,
    contains: Option<String>,
}

/// Removal and scrub rules compiled from [`Settings`].
#[derive(Debug, Clone)]
pub struct RuleSet {
    patterns: Vec<String>,
    element_rules: Vec<ElementRemoval>,
    css_patterns: Vec<Regex>,
}

impl RuleSet {
    pub fn compile(settings: &Settings) -> Result<Self, ConfigError> {
        let patterns = settings
            .remove_patterns
            .iter()
            .map(|p| p.to_lowercase())
            .collect();

        let mut element_rules = Vec::with_capacity(settings.remove_elements.len());
        for rule in &settings.remove_elements {
            let selector = Selector::parse(&rule.selector).map_err(|err| ConfigError::Selector {
                selector: rule.selector.clone(),
                reason: err.to_string(),
            })?;
            element_rules.push(ElementRemoval {
                source: rule.selector.trim().to_string(),
                selector,
                contains: rule.contains.as_ref().map(|c| c.to_lowercase()),
            });
        }

        let mut css_patterns = Vec::with_capacity(settings.css_patterns.len());
        for pattern in &settings.css_patterns {
            let regex = Regex::new(pattern).map_err(|source| ConfigError::CssPattern {
                pattern: pattern.clone(),
                source,
            })?;
            css_patterns.push(regex);
        }

        Ok(Self {
            patterns,
            element_rules,
            css_patterns,
        })
    }
}

/// Applies the document rules in their fixed order: removal, attribute
/// replacement, metadata rewrite, vendor stripping, style scrub.
pub struct RuleEngine<'a> {
    settings: &'a Settings,
    rules: &'a RuleSet,
}

impl<'a> RuleEngine<'a> {
    pub fn new(config: &'a LoadedConfig) -> Self {
        Self {
            settings: &config.settings,
            rules: &config.rules,
        }
    }

    pub fn apply(&self, doc: &mut Document, page: &PageContext) -> Vec<ChangeRecord> {
        let mut records = Vec::new();
        self.remove_matching(doc, page, &mut records);
        self.replace_attributes(doc, page, &mut records);
        self.rewrite_metadata(doc, page, &mut records);
        self.strip_vendor(doc, page, &mut records);
        self.scrub_styles(doc, page, &mut records);
        engine_debug!(
            "Rules produced {} change(s) for {}",
            records.len(),
            page.relative.display()
        );
        records
    }

    fn remove_matching(&self, doc: &mut Document, page: &PageContext, records: &mut Vec<ChangeRecord>) {
        if self.rules.patterns.is_empty() && self.rules.element_rules.is_empty() {
            return;
        }
        let selected: Vec<HashSet<NodeId>> = self
            .rules
            .element_rules
            .iter()
            .map(|rule| doc.select(&rule.selector))
            .collect();
        doc.walk(&mut |node: &mut DomNode| {
            let Some(el) = node.as_element() else {
                return Visit::Continue;
            };
            match self.removal_reason(node, el, &selected) {
                Some(reason) => {
                    records.push(ChangeRecord::new(
                        &page.relative,
                        ChangeKind::Removed,
                        format!("{} ({reason})", describe(el)),
                    ));
                    Visit::Remove
                }
                None => Visit::Continue,
            }
        });
    }

    fn removal_reason(&self, node: &DomNode, el: &Element, selected: &[HashSet<NodeId>]) -> Option<String> {
        let tag = el.name.to_ascii_lowercase();
        let attr_values = el
            .attrs
            .iter()
            .map(|(_, v)| v.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        if !self.rules.patterns.is_empty() && !PROTECTED_TAGS.contains(&tag.as_str()) {
            let own_text = if tag == "style" {
                String::new()
            } else {
                node.own_text().to_lowercase()
            };
            let hit = self.rules.patterns.iter().find(|pattern| {
                tag.contains(pattern.as_str())
                    || attr_values.contains(pattern.as_str())
                    || own_text.contains(pattern.as_str())
            });
            if let Some(pattern) = hit {
                return Some(format!("pattern `{pattern}`"));
            }
        }

        for (rule, hits) in self.rules.element_rules.iter().zip(selected) {
            if !node.origin().is_some_and(|id| hits.contains(&id)) {
                continue;
            }
            let contained = match &rule.contains {
                Some(needle) => {
                    attr_values.contains(needle.as_str())
                        || node.text_content().to_lowercase().contains(needle.as_str())
                }
                None => true,
            };
            if contained {
                return Some(format!("selector `{}`", rule.source));
            }
        }
        None
    }

    fn replace_attributes(&self, doc: &mut Document, page: &PageContext, records: &mut Vec<ChangeRecord>) {
        for pair in &self.settings.attribute_replacements {
            doc.walk(&mut |node: &mut DomNode| {
                if let Some(el) = node.as_element_mut() {
                    if el.rename_attr(&pair.from, &pair.to) {
                        records.push(ChangeRecord::new(
                            &page.relative,
                            ChangeKind::AttributeReplaced,
                            format!("{} -> {} on <{}>", pair.from, pair.to, el.name),
                        ));
                    }
                }
                Visit::Continue
            });
        }
    }

    fn rewrite_metadata(&self, doc: &mut Document, page: &PageContext, records: &mut Vec<ChangeRecord>) {
        let meta = resolve_page_meta(self.settings, &page.relative);
        engine_trace!("Metadata for {}: {:?}", page.relative.display(), meta);

        let mut title_seen = false;
        doc.walk(&mut |node: &mut DomNode| {
            let Some(el) = node.as_element() else {
                return Visit::Continue;
            };
            if FOREIGN_ROOTS.iter().any(|name| el.is(name)) {
                return Visit::SkipChildren;
            }

            if el.is("title") {
                if title_seen {
                    return Visit::SkipChildren;
                }
                title_seen = true;
                if !meta.title.is_empty() {
                    let old = node.text_content();
                    if old != meta.title {
                        node.set_text(meta.title.clone());
                        records.push(ChangeRecord::new(
                            &page.relative,
                            ChangeKind::TextReplaced,
                            format!("title: {} -> {}", clip(old.trim()), clip(&meta.title)),
                        ));
                    }
                }
                return Visit::SkipChildren;
            }

            if !el.is("meta") {
                return Visit::Continue;
            }
            let Some((label, wanted)) = metadata_target(el, &meta.title, &meta.description) else {
                return Visit::Continue;
            };
            if wanted.is_empty() || el.attr("content") == Some(wanted) {
                return Visit::Continue;
            }
            let wanted = wanted.to_string();
            if let Some(el) = node.as_element_mut() {
                let old = el.attr("content").unwrap_or_default().to_string();
                el.set_attr("content", wanted.clone());
                records.push(ChangeRecord::new(
                    &page.relative,
                    ChangeKind::TextReplaced,
                    format!("{label}: {} -> {}", clip(&old), clip(&wanted)),
                ));
            }
            Visit::Continue
        });
    }

    fn strip_vendor(&self, doc: &mut Document, page: &PageContext, records: &mut Vec<ChangeRecord>) {
        let domains = &self.settings.assets.vendor_domains;
        doc.walk(&mut |node: &mut DomNode| {
            let Some(el) = node.as_element() else {
                return Visit::Continue;
            };
            let reason = if el.is("meta") && el.attr_is("name", "generator") {
                Some("generator meta".to_string())
            } else if el.is("script") {
                vendor_url(el.attr("src"), domains).map(|d| format!("vendor script from {d}"))
            } else if el.is("link") && !is_icon_link(el) {
                vendor_url(el.attr("href"), domains).map(|d| format!("vendor link to {d}"))
            } else {
                None
            };
            match reason {
                Some(reason) => {
                    records.push(ChangeRecord::new(
                        &page.relative,
                        ChangeKind::Removed,
                        format!("{} ({reason})", describe(el)),
                    ));
                    Visit::Remove
                }
                None => Visit::Continue,
            }
        });
    }

    fn scrub_styles(&self, doc: &mut Document, page: &PageContext, records: &mut Vec<ChangeRecord>) {
        let patterns = &self.rules.css_patterns;
        if patterns.is_empty() {
            return;
        }
        doc.walk(&mut |node: &mut DomNode| {
            let is_style = node.as_element().is_some_and(|el| el.is("style"));
            if !is_style {
                return Visit::Continue;
            }
            let mut removed = 0;
            for child in &mut node.children {
                if let NodeKind::Text(text) = &mut child.kind {
                    for regex in patterns {
                        let hits = regex.find_iter(text).count();
                        if hits > 0 {
                            removed += hits;
                            *text = regex.replace_all(text, "").into_owned();
                        }
                    }
                }
            }
            if removed > 0 {
                records.push(ChangeRecord::new(
                    &page.relative,
                    ChangeKind::StyleScrubbed,
                    format!("removed {removed} css pattern match(es) from <style>"),
                ));
            }
            Visit::SkipChildren
        });
    }
}

/// The meta elements whose `content` carries the page title or description.
fn metadata_target<'m>(el: &Element, title: &'m str, description: &'m str) -> Option<(&'static str, &'m str)> {
    if el.attr_is("name", "description") {
        Some(("description", description))
    } else if el.attr_is("property", "og:title") {
        Some(("og:title", title))
    } else if el.attr_is("property", "og:description") {
        Some(("og:description", description))
    } else if el.attr_is("name", "twitter:title") {
        Some(("twitter:title", title))
    } else if el.attr_is("name", "twitter:description") {
        Some(("twitter:description", description))
    } else {
        None
    }
}

/// `rel="icon"`, `rel="shortcut icon"`, `rel="apple-touch-icon"` and friends.
pub(crate) fn is_icon_link(el: &Element) -> bool {
    el.is("link")
        && el.attr("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.to_ascii_lowercase().contains("icon"))
        })
}

fn vendor_url<'d>(url: Option<&str>, domains: &'d [String]) -> Option<&'d str> {
    let url = url?;
    domains
        .iter()
        .find(|domain| url.contains(domain.as_str()))
        .map(String::as_str)
}

fn describe(el: &Element) -> String {
    clip(&el.open_tag())
}

fn clip(text: &str) -> String {
    if text.len() <= MAX_DETAIL_LEN {
        return text.to_string();
    }
    let mut end = MAX_DETAIL_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
