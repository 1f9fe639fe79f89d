use std::path::{Component, Path};

use crate::settings::{PageOverride, Settings};

pub const HOME_PAGE: &str = "home";

/// Title and description a page should carry after sanitization. An empty
/// value means there is nothing to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
}

/// Derives the page identifier from a path relative to the template root:
/// `index.html` is `home`, `contact.html` is `contact`, and
/// `work/project-a/index.html` is `project-a`.
pub fn page_identifier(relative: &Path) -> String {
    let stem = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if !stem.is_empty() && !stem.eq_ignore_ascii_case("index") {
        return stem.to_string();
    }
    relative
        .parent()
        .and_then(|parent| parent.file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| HOME_PAGE.to_string())
}

/// `my-big_project` becomes `My Big Project`.
pub fn project_name(page_id: &str) -> String {
    page_id
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Resolves the metadata for one page: an override keyed by the page
/// identifier wins, then the first override whose `path_prefix` matches,
/// then the personal defaults.
pub fn resolve_page_meta(settings: &Settings, relative: &Path) -> PageMeta {
    let page_id = page_identifier(relative);
    let rel = slash_path(relative);
    let personal = &settings.personal;
    let vars = TemplateVars {
        project_name: project_name(&page_id),
        name: &personal.name,
        title: &personal.title,
    };

    let default_title = [personal.name.trim(), personal.title.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" - ");
    let default_description = personal.description.clone();

    let Some(page) = find_override(&settings.pages, &page_id, &rel) else {
        return PageMeta {
            title: default_title,
            description: default_description,
        };
    };

    let title = pick(page.title.as_deref(), page.title_template.as_deref(), &vars)
        .unwrap_or(default_title);
    let description = pick(
        page.description.as_deref(),
        page.description_template.as_deref(),
        &vars,
    )
    .unwrap_or(default_description);

    PageMeta { title, description }
}

fn find_override<'a>(pages: &'a [PageOverride], page_id: &str, rel: &str) -> Option<&'a PageOverride> {
    pages.iter().find(|page| page.key == page_id).or_else(|| {
        pages.iter().find(|page| {
            page.path_prefix
                .as_deref()
                .is_some_and(|prefix| !prefix.is_empty() && rel.starts_with(prefix))
        })
    })
}

fn pick(literal: Option<&str>, template: Option<&str>, vars: &TemplateVars<'_>) -> Option<String> {
    literal
        .map(ToOwned::to_owned)
        .or_else(|| template.map(|t| vars.render(t)))
}

struct TemplateVars<'a> {
    project_name: String,
    name: &'a str,
    title: &'a str,
}

impl TemplateVars<'_> {
    /// Unknown placeholders are left verbatim.
    fn render(&self, template: &str) -> String {
        template
            .replace("{project_name}", &self.project_name)
            .replace("{name}", self.name)
            .replace("{title}", self.title)
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
