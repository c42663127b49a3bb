//! Placeholder templates. A template is a plain HTML fragment carrying
//! `{#NAME}` tokens; populating it replaces every recognized token that has a
//! binding and leaves everything else untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// The placeholder names the generator knows how to bind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    Title,
    Date,
    Author,
    BlogTitle,
    Link,
    Summary,
    Content,
    Keywords,
    Toc,
    RootLink,
    RelativeRootLink,
    ParentLink,
    CategoryTitle,
    CategoryId,
    CategoryLink,
}

impl Placeholder {
    const ALL: [Placeholder; 15] = [
        Placeholder::Title,
        Placeholder::Date,
        Placeholder::Author,
        Placeholder::BlogTitle,
        Placeholder::Link,
        Placeholder::Summary,
        Placeholder::Content,
        Placeholder::Keywords,
        Placeholder::Toc,
        Placeholder::RootLink,
        Placeholder::RelativeRootLink,
        Placeholder::ParentLink,
        Placeholder::CategoryTitle,
        Placeholder::CategoryId,
        Placeholder::CategoryLink,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Title => "TITLE",
            Placeholder::Date => "DATE",
            Placeholder::Author => "AUTHOR",
            Placeholder::BlogTitle => "BLOG_TITLE",
            Placeholder::Link => "LINK",
            Placeholder::Summary => "SUMMARY",
            Placeholder::Content => "CONTENT",
            Placeholder::Keywords => "KEYWORDS",
            Placeholder::Toc => "TOC",
            Placeholder::RootLink => "ROOT_LINK",
            Placeholder::RelativeRootLink => "RELATIVE_ROOT_LINK",
            Placeholder::ParentLink => "PARENT_LINK",
            Placeholder::CategoryTitle => "CATEGORY_TITLE",
            Placeholder::CategoryId => "CATEGORY_ID",
            Placeholder::CategoryLink => "CATEGORY_LINK",
        }
    }

    pub fn from_name(name: &str) -> Option<Placeholder> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// The literal token as it appears in templates, e.g. `{#TITLE}`.
    pub fn token(self) -> String {
        format!("{{#{}}}", self.name())
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of placeholder values.
#[derive(Clone, Debug, Default)]
pub struct Bindings(BTreeMap<Placeholder, String>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, placeholder: Placeholder, value: impl Into<String>) -> &mut Self {
        self.0.insert(placeholder, value.into());
        self
    }

    pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.set(placeholder, value);
        self
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.0.get(&placeholder).map(String::as_str)
    }
}

const TOKEN_OPEN: &str = "{#";
const TOKEN_CLOSE: char = '}';

/// Replaces every bound `{#NAME}` token in `template` in a single left to
/// right pass. Substituted values are not rescanned.
pub fn populate(template: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(TOKEN_OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + TOKEN_OPEN.len()..];
        let bound = after.find(TOKEN_CLOSE).and_then(|end| {
            Placeholder::from_name(&after[..end])
                .and_then(|p| bindings.get(p))
                .map(|value| (value, end))
        });
        match bound {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(TOKEN_OPEN);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// A fragment split by a pair of block markers into the text before the
/// block, the repeated block itself, and the text after it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    pub header: String,
    pub item: String,
    pub footer: String,
}

impl Section {
    fn split(source: &str, begin: &str, end: &str) -> Option<Section> {
        let begin_at = source.find(begin)?;
        let item_at = begin_at + begin.len();
        let end_at = item_at + source[item_at..].find(end)?;
        Some(Section {
            header: source[..begin_at].to_owned(),
            item: source[item_at..end_at].to_owned(),
            footer: source[end_at + end.len()..].to_owned(),
        })
    }

    /// Wraps already-rendered items between the header and the footer.
    pub fn wrap<'a>(&self, items: impl IntoIterator<Item = &'a str>) -> String {
        let mut out = self.header.clone();
        for item in items {
            out.push_str(item);
        }
        out.push_str(&self.footer);
        out
    }
}

pub const ARTICLE_TEMPLATE: &str = "article.html";
pub const INDEX_TEMPLATE: &str = "index.html";
pub const CATEGORIES_TEMPLATE: &str = "categories.html";
pub const SYNTAX_TEMPLATE: &str = "syntax.html";

/// The fragment files the generator consumes; everything else found in the
/// template directory is a theme asset.
pub const FRAGMENT_FILES: [&str; 4] = [
    ARTICLE_TEMPLATE,
    INDEX_TEMPLATE,
    CATEGORIES_TEMPLATE,
    SYNTAX_TEMPLATE,
];

const ARTICLE_BEGIN: &str = "{#ARTICLE_BEGIN}";
const ARTICLE_END: &str = "{#ARTICLE_END}";
const CATEGORY_BEGIN: &str = "{#CATEGORY_BEGIN}";
const CATEGORY_END: &str = "{#CATEGORY_END}";

/// The categories listing: an outer page section whose repeated block is
/// itself split into a per-category header, a per-article item and a
/// per-category footer.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoriesTemplate {
    pub page: Section,
    pub category: Section,
}

/// Every template fragment loaded for a generation run.
#[derive(Clone, Debug)]
pub struct Templates {
    pub article: String,
    pub index: Section,
    pub categories: Option<CategoriesTemplate>,
    pub syntax: Option<String>,
}

impl Templates {
    /// Loads the fragments from `dir`. `article.html` and `index.html` are
    /// required; `categories.html` and `syntax.html` are optional.
    pub fn load(dir: &Path) -> Result<Templates> {
        let article = read_required(dir, ARTICLE_TEMPLATE)?;
        let index_source = read_required(dir, INDEX_TEMPLATE)?;
        let index = Section::split(&index_source, ARTICLE_BEGIN, ARTICLE_END).ok_or_else(|| {
            Error::MissingMarkers {
                path: dir.join(INDEX_TEMPLATE),
                markers: "{#ARTICLE_BEGIN}/{#ARTICLE_END}",
            }
        })?;

        let categories = match read_optional(dir, CATEGORIES_TEMPLATE)? {
            None => None,
            Some(source) => Some(Self::split_categories(&dir.join(CATEGORIES_TEMPLATE), &source)?),
        };
        let syntax = read_optional(dir, SYNTAX_TEMPLATE)?;

        debug!(
            dir = %dir.display(),
            categories = categories.is_some(),
            syntax = syntax.is_some(),
            "loaded templates"
        );
        Ok(Templates {
            article,
            index,
            categories,
            syntax,
        })
    }

    fn split_categories(path: &Path, source: &str) -> Result<CategoriesTemplate> {
        let page = Section::split(source, CATEGORY_BEGIN, CATEGORY_END).ok_or_else(|| {
            Error::MissingMarkers {
                path: path.to_owned(),
                markers: "{#CATEGORY_BEGIN}/{#CATEGORY_END}",
            }
        })?;
        let category = Section::split(&page.item, ARTICLE_BEGIN, ARTICLE_END).ok_or_else(|| {
            Error::MissingMarkers {
                path: path.to_owned(),
                markers: "{#ARTICLE_BEGIN}/{#ARTICLE_END}",
            }
        })?;
        Ok(CategoriesTemplate { page, category })
    }
}

fn read_required(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    fs::read_to_string(&path).map_err(|err| Error::Read { path, err })
}

fn read_optional(dir: &Path, name: &str) -> Result<Option<String>> {
    let path = dir.join(name);
    if !path.is_file() {
        return Ok(None);
    }
    fs::read_to_string(&path)
        .map(Some)
        .map_err(|err| Error::Read { path, err })
}

/// The result of loading templates.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading the template fragments. All variants are
/// fatal for a generation run.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a template file is missing or unreadable.
    #[error("reading template file `{}`: {err}", .path.display())]
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when a template lacks the block markers it must contain.
    #[error("template file `{}` is missing its {markers} markers", .path.display())]
    MissingMarkers {
        path: PathBuf,
        markers: &'static str,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_populate_replaces_every_occurrence() {
        let bindings = Bindings::new()
            .with(Placeholder::Title, "Hello")
            .with(Placeholder::Link, "a.html");
        assert_eq!(
            r#"<a href="a.html">Hello</a> Hello"#,
            populate(r#"<a href="{#LINK}">{#TITLE}</a> {#TITLE}"#, &bindings)
        );
    }

    #[test]
    fn test_populate_leaves_unknown_and_unbound_tokens() {
        let bindings = Bindings::new().with(Placeholder::Title, "T");
        assert_eq!(
            "{#NOPE} T {#DATE} {# {#TITLE",
            populate("{#NOPE} {#TITLE} {#DATE} {# {#TITLE", &bindings)
        );
    }

    #[test]
    fn test_populate_does_not_rescan_values() {
        let bindings = Bindings::new()
            .with(Placeholder::Content, "{#TITLE}")
            .with(Placeholder::Title, "T");
        assert_eq!("{#TITLE} T", populate("{#CONTENT} {#TITLE}", &bindings));
    }

    #[test]
    fn test_placeholder_names_round_trip() {
        for p in Placeholder::ALL.iter() {
            assert_eq!(Some(*p), Placeholder::from_name(p.name()));
        }
        assert_eq!("{#RELATIVE_ROOT_LINK}", Placeholder::RelativeRootLink.token());
    }

    #[test]
    fn test_load_templates() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("article.html"), "<h1>{#TITLE}</h1>").unwrap();
        fs::write(
            dir.path().join("index.html"),
            "<ul>{#ARTICLE_BEGIN}<li>{#TITLE}</li>{#ARTICLE_END}</ul>",
        )
        .unwrap();
        fs::write(
            dir.path().join("categories.html"),
            "<div>{#CATEGORY_BEGIN}<h2>{#CATEGORY_TITLE}</h2>{#ARTICLE_BEGIN}<p>{#TITLE}</p>{#ARTICLE_END}<hr>{#CATEGORY_END}</div>",
        )
        .unwrap();

        let templates = Templates::load(dir.path()).unwrap();
        assert_eq!("<h1>{#TITLE}</h1>", templates.article);
        assert_eq!(
            Section {
                header: "<ul>".to_owned(),
                item: "<li>{#TITLE}</li>".to_owned(),
                footer: "</ul>".to_owned(),
            },
            templates.index
        );
        let categories = templates.categories.unwrap();
        assert_eq!("<div>", categories.page.header);
        assert_eq!("</div>", categories.page.footer);
        assert_eq!("<h2>{#CATEGORY_TITLE}</h2>", categories.category.header);
        assert_eq!("<p>{#TITLE}</p>", categories.category.item);
        assert_eq!("<hr>", categories.category.footer);
        assert!(templates.syntax.is_none());
    }

    #[test]
    fn test_load_missing_article_template_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("index.html"),
            "{#ARTICLE_BEGIN}{#ARTICLE_END}",
        )
        .unwrap();
        match Templates::load(dir.path()) {
            Err(Error::Read { path, .. }) => assert!(path.ends_with("article.html")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_load_index_without_markers_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("article.html"), "").unwrap();
        fs::write(dir.path().join("index.html"), "<ul></ul>").unwrap();
        assert!(matches!(
            Templates::load(dir.path()),
            Err(Error::MissingMarkers { .. })
        ));
    }

    #[test]
    fn test_section_wrap() {
        let section = Section {
            header: "[".to_owned(),
            item: String::new(),
            footer: "]".to_owned(),
        };
        assert_eq!("[ab]", section.wrap(vec!["a", "b"]));
    }
}
