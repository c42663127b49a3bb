//! Derives stable output locations for articles and the relative links that
//! tie pages at different nesting depths back to the site root.

use chrono::{Datelike, NaiveDate};
use std::path::{Component, Path, PathBuf};

const HTML_EXTENSION: &str = "html";

/// Turns a title into a URL-safe slug: transliterated to ASCII, lowercased,
/// `/` and spaces turned into `_`, and every remaining character outside
/// `[a-z0-9-_]` dropped.
pub fn sanitize(name: &str) -> String {
    deunicode::deunicode(name)
        .to_lowercase()
        .replace('/', "_")
        .replace(' ', "_")
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_'))
        .collect()
}

/// Resolves the relative URL of an article from its title and, for public
/// articles, its publication date. Public articles live under
/// `{year}/{month}/{slug}`; drafts under `/{slug}`.
pub fn resolve_url(title: &str, date: Option<NaiveDate>) -> String {
    let slug = sanitize(title);
    match date {
        Some(date) => format!("{}/{:02}/{}", date.year(), date.month(), slug),
        None => format!("/{}", slug),
    }
}

/// Combines a base output directory with a resolved URL and forces the
/// `.html` extension.
pub fn page_location(base: &str, url: &str) -> PathBuf {
    let mut location = Path::new(base).join(url.trim_start_matches('/'));
    location.set_extension(HTML_EXTENSION);
    location
}

/// The number of directories between the output root and `location`.
pub fn depth(location: &Path) -> usize {
    location
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0)
}

/// The relative link from the directory containing `location` back to the
/// output root: empty at the root, `../` repeated once per nesting level
/// otherwise.
pub fn relative_root(location: &Path) -> String {
    "../".repeat(depth(location))
}

/// Renders a relative path with forward slashes regardless of platform.
pub fn to_link(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
