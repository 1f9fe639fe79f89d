use std::path::Path;

use pretty_assertions::assert_eq;
use sanitizer_core::{ChangeKind, ChangeRecord};
use sanitizer_engine::{parse_config, Document, LoadedConfig, PageContext, RuleEngine};

const PERSONAL: &str = "\
personal:
  name: Matt
  title: UX Designer
";

fn config(yaml: &str) -> LoadedConfig {
    parse_config(yaml).unwrap()
}

fn page(relative: &str) -> PageContext {
    let root = Path::new("site");
    PageContext::new(root, root, &root.join(relative))
}

fn apply(config: &LoadedConfig, html: &str, relative: &str) -> (Document, Vec<ChangeRecord>) {
    let mut doc = Document::parse(html);
    let records = RuleEngine::new(config).apply(&mut doc, &page(relative));
    (doc, records)
}

fn kinds(records: &[ChangeRecord]) -> Vec<ChangeKind> {
    records.iter().map(|r| r.kind).collect()
}

#[test]
fn title_is_rebuilt_from_personal_info() {
    let config = config(PERSONAL);
    let html = "<html><head><title>Resize Light – Free Responsive Portfolio Template for Framer</title></head><body></body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    assert!(doc.to_html().contains("<title>Matt - UX Designer</title>"));
    assert_eq!(kinds(&records), vec![ChangeKind::TextReplaced]);
    assert!(records[0].detail.starts_with("title: Resize Light"));
    assert_eq!(records[0].file, Path::new("index.html"));
}

#[test]
fn generator_meta_is_removed() {
    let config = config("");
    let html = "<html><head><meta name=\"generator\" content=\"Framer 02004a2\"><meta charset=\"utf-8\"></head><body></body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    let out = doc.to_html();
    assert!(!out.contains("generator"));
    assert!(out.contains("<meta charset=\"utf-8\">"));
    assert_eq!(kinds(&records), vec![ChangeKind::Removed]);
    assert!(records[0].detail.contains("generator meta"));
}

#[test]
fn unmatched_pattern_is_silent() {
    let config = config("remove_patterns: [does-not-exist]\n");
    let html = "<html><head><title>Keep</title></head><body><p>hello</p></body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    assert!(records.is_empty());
    assert!(doc.to_html().contains("<p>hello</p>"));
}

#[test]
fn patterns_match_tag_attributes_and_own_text() {
    let config = config("remove_patterns: [__framer-badge, made in framer]\n");
    let html = "<html><body>\
        <div id=\"__framer-badge-container\"><span>badge</span></div>\
        <p>Built by hand <a href=\"https://framer.com\">Made in Framer</a></p>\
        </body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    let out = doc.to_html();
    assert!(!out.contains("__framer-badge-container"));
    assert!(!out.contains("Made in Framer"));
    assert!(out.contains("<p>Built by hand </p>"));
    assert_eq!(kinds(&records), vec![ChangeKind::Removed, ChangeKind::Removed]);
    assert!(records[0].detail.contains("pattern `__framer-badge`"));
    assert!(records[1].detail.contains("pattern `made in framer`"));
}

#[test]
fn document_skeleton_survives_broad_patterns() {
    let config = config("remove_patterns: [framer]\n");
    let html = "<html data-framer-hydrate=\"1\"><head></head><body class=\"framer-body\"><p>ok</p></body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    assert!(records.is_empty());
    assert!(doc.to_html().contains("<body class=\"framer-body\"><p>ok</p></body>"));
}

#[test]
fn inline_svg_title_is_left_alone() {
    let config = config(PERSONAL);
    let html = "<html><head><title>Old</title></head><body>\
        <svg><title>Close menu</title><path d=\"M0 0\"></path></svg>\
        </body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    let out = doc.to_html();
    assert!(out.contains("<head><title>Matt - UX Designer</title></head>"), "{out}");
    assert!(out.contains("<svg><title>Close menu</title>"), "{out}");
    assert_eq!(kinds(&records), vec![ChangeKind::TextReplaced]);
}

#[test]
fn element_rules_respect_contains() {
    let yaml = "\
remove_elements:
  - selector: a
    contains: framer
  - selector: '#promo'
";
    let config = config(yaml);
    let html = "<html><body>\
        <a href=\"/about\">About</a>\
        <a href=\"https://www.framer.com/?utm=badge\">Create a free website</a>\
        <section id=\"promo\">Buy</section>\
        </body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    let out = doc.to_html();
    assert!(out.contains("<a href=\"/about\">About</a>"));
    assert!(!out.contains("framer.com"));
    assert!(!out.contains("promo"));
    assert_eq!(records.len(), 2);
    assert!(records[0].detail.contains("selector `a`"));
}

#[test]
fn combinator_selector_removes_only_nested_match() {
    let yaml = "\
remove_elements:
  - selector: 'div.badge > a'
";
    let config = config(yaml);
    let html = "<html><body>\
        <div class=\"badge\"><a href=\"https://www.framer.com/\">Made in Framer</a></div>\
        <a href=\"/work\">Work</a>\
        </body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    let out = doc.to_html();
    assert!(out.contains("<div class=\"badge\"></div>"), "{out}");
    assert!(out.contains("<a href=\"/work\">Work</a>"));
    assert_eq!(kinds(&records), vec![ChangeKind::Removed]);
    assert!(records[0].detail.contains("selector `div.badge > a`"));
}

#[test]
fn attributes_are_renamed_on_every_element() {
    let yaml = "\
attribute_replacements:
  - from: data-framer-name
    to: data-name
";
    let config = config(yaml);
    let html = "<html><body><div data-framer-name=\"Hero\"><span data-framer-name=\"Label\">x</span></div></body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    let out = doc.to_html();
    assert!(out.contains("<div data-name=\"Hero\"><span data-name=\"Label\">x</span></div>"));
    assert!(!out.contains("data-framer-name"));
    assert_eq!(
        kinds(&records),
        vec![ChangeKind::AttributeReplaced, ChangeKind::AttributeReplaced]
    );
}

#[test]
fn social_metadata_follows_page_override_templates() {
    let yaml = "\
personal:
  name: Matt
  title: UX Designer
  description: Portfolio of Matt.
pages:
  work:
    path_prefix: work/
    title_template: '{project_name} - {name}'
";
    let config = config(yaml);
    let html = "<html><head>\
        <title>Project</title>\
        <meta name=\"description\" content=\"Made with Framer\">\
        <meta property=\"og:title\" content=\"Project\">\
        <meta name=\"twitter:description\" content=\"Made with Framer\">\
        </head><body></body></html>";
    let (doc, records) = apply(&config, html, "work/project-a/index.html");

    let out = doc.to_html();
    assert!(out.contains("<title>Project A - Matt</title>"));
    assert!(out.contains("<meta name=\"description\" content=\"Portfolio of Matt.\">"));
    assert!(out.contains("<meta property=\"og:title\" content=\"Project A - Matt\">"));
    assert!(out.contains("<meta name=\"twitter:description\" content=\"Portfolio of Matt.\">"));
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.kind == ChangeKind::TextReplaced));
}

#[test]
fn vendor_scripts_and_links_go_but_icons_stay() {
    let config = config("assets:\n  vendor_domains: [framerusercontent.com, framer.com]\n");
    let html = "<html><head>\
        <script src=\"https://events.framer.com/script\"></script>\
        <script src=\"/local.js\"></script>\
        <link rel=\"modulepreload\" href=\"https://framerusercontent.com/sites/x/app.mjs\">\
        <link rel=\"icon\" href=\"https://framerusercontent.com/images/favicon.png\">\
        </head><body></body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    let out = doc.to_html();
    assert!(!out.contains("events.framer.com"));
    assert!(!out.contains("app.mjs"));
    assert!(out.contains("<script src=\"/local.js\"></script>"));
    assert!(out.contains("<link rel=\"icon\" href=\"https://framerusercontent.com/images/favicon.png\">"));
    assert_eq!(kinds(&records), vec![ChangeKind::Removed, ChangeKind::Removed]);
}

#[test]
fn style_text_is_scrubbed_not_removed() {
    let yaml = "\
remove_patterns: [framer-badge]
css_patterns: ['#__framer-badge-container\\{[^}]+\\}']
";
    let config = config(yaml);
    let html = "<html><head><style>body{margin:0}#__framer-badge-container{position:fixed}</style></head><body></body></html>";
    let (doc, records) = apply(&config, html, "index.html");

    assert!(doc.to_html().contains("<style>body{margin:0}</style>"));
    assert_eq!(kinds(&records), vec![ChangeKind::StyleScrubbed]);
}

#[test]
fn second_application_changes_nothing() {
    let yaml = "\
personal:
  name: Matt
  title: UX Designer
remove_patterns: [__framer-badge]
attribute_replacements:
  - from: data-framer-name
    to: data-name
assets:
  vendor_domains: [framer.com]
";
    let config = config(yaml);
    let html = "<html><head><title>Old</title><meta name=\"generator\" content=\"Framer\">\
        <script src=\"https://events.framer.com/script\"></script></head>\
        <body><div id=\"__framer-badge-container\"></div><main data-framer-name=\"Main\"></main></body></html>";
    let (first, records) = apply(&config, html, "index.html");
    assert_eq!(records.len(), 5);

    let (second, again) = apply(&config, &first.to_html(), "index.html");
    assert!(again.is_empty(), "{again:?}");
    assert_eq!(second.to_html(), first.to_html());
}
