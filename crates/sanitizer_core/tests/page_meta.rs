use std::path::Path;

use pretty_assertions::assert_eq;
use sanitizer_core::{page_identifier, resolve_page_meta, PageMeta, PageOverride, PersonalInfo, Settings};

fn settings(pages: Vec<PageOverride>) -> Settings {
    Settings {
        personal: PersonalInfo {
            name: "Matt".to_string(),
            title: "UX Designer".to_string(),
            description: "Designer portfolio.".to_string(),
        },
        pages,
        ..Settings::default()
    }
}

fn page(key: &str) -> PageOverride {
    PageOverride {
        key: key.to_string(),
        ..PageOverride::default()
    }
}

#[test]
fn identifiers_follow_the_file_layout() {
    assert_eq!(page_identifier(Path::new("index.html")), "home");
    assert_eq!(page_identifier(Path::new("contact.html")), "contact");
    assert_eq!(page_identifier(Path::new("work/project-a/index.html")), "project-a");
    assert_eq!(page_identifier(Path::new("work/INDEX.htm")), "work");
}

#[test]
fn defaults_join_name_and_title() {
    let meta = resolve_page_meta(&settings(Vec::new()), Path::new("index.html"));
    assert_eq!(
        meta,
        PageMeta {
            title: "Matt - UX Designer".to_string(),
            description: "Designer portfolio.".to_string(),
        }
    );
}

#[test]
fn missing_title_part_is_not_joined() {
    let mut settings = settings(Vec::new());
    settings.personal.title.clear();
    let meta = resolve_page_meta(&settings, Path::new("index.html"));
    assert_eq!(meta.title, "Matt");

    let empty = resolve_page_meta(&Settings::default(), Path::new("index.html"));
    assert_eq!(empty.title, "");
    assert_eq!(empty.description, "");
}

#[test]
fn exact_key_beats_path_prefix() {
    let contact = PageOverride {
        title: Some("Say hello".to_string()),
        ..page("project-a")
    };
    let work = PageOverride {
        path_prefix: Some("work/".to_string()),
        title_template: Some("{project_name} | {name}".to_string()),
        ..page("work")
    };
    let settings = settings(vec![work, contact]);

    let exact = resolve_page_meta(&settings, Path::new("work/project-a/index.html"));
    assert_eq!(exact.title, "Say hello");
    assert_eq!(exact.description, "Designer portfolio.");

    let prefixed = resolve_page_meta(&settings, Path::new("work/big_launch/index.html"));
    assert_eq!(prefixed.title, "Big Launch | Matt");
}

#[test]
fn first_matching_prefix_wins() {
    let first = PageOverride {
        path_prefix: Some("work/".to_string()),
        title: Some("first".to_string()),
        ..page("a")
    };
    let second = PageOverride {
        path_prefix: Some("work/project".to_string()),
        title: Some("second".to_string()),
        ..page("b")
    };
    let meta = resolve_page_meta(&settings(vec![first, second]), Path::new("work/project-x/index.html"));
    assert_eq!(meta.title, "first");
}

#[test]
fn literal_beats_template_and_templates_fill_placeholders() {
    let contact = PageOverride {
        title: Some("Contact".to_string()),
        title_template: Some("ignored".to_string()),
        description_template: Some("Reach {name}, {title}. {unknown}".to_string()),
        ..page("contact")
    };
    let meta = resolve_page_meta(&settings(vec![contact]), Path::new("contact.html"));
    assert_eq!(meta.title, "Contact");
    assert_eq!(meta.description, "Reach Matt, UX Designer. {unknown}");
}

#[test]
fn unrelated_override_falls_back_to_defaults() {
    let about = PageOverride {
        title: Some("About".to_string()),
        ..page("about")
    };
    let meta = resolve_page_meta(&settings(vec![about]), Path::new("index.html"));
    assert_eq!(meta.title, "Matt - UX Designer");
}
