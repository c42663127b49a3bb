use crate::article::Article;
use crate::template::Bindings;
use std::path::PathBuf;

/// A source file to copy next to a page, and where to copy it (relative to
/// the output root).
pub type Asset = (PathBuf, PathBuf);

/// One generated output file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// The output location relative to the output root.
    pub location: PathBuf,

    /// The final HTML (or XML) payload.
    pub html: String,

    /// Files referenced by the page that must be copied alongside it.
    pub assets: Vec<Asset>,
}

impl Page {
    pub fn new(location: impl Into<PathBuf>, html: String) -> Page {
        Page {
            location: location.into(),
            html,
            assets: Vec::new(),
        }
    }
}

/// A [`Page`] rendered from exactly one [`Article`].
#[derive(Clone, Debug)]
pub struct PageArticle<'a> {
    pub article: &'a Article,
    pub page: Page,

    /// The plain-text teaser.
    pub summary: String,

    /// The rendered article body before templating, with local media
    /// references already rewritten to their copied locations.
    pub content: String,

    /// The populated index-item snippet, reused by every aggregate page the
    /// article appears on. Links inside it are relative to the page it ends
    /// up on.
    pub snippet: String,

    /// The bindings `snippet` was populated with, kept for listings that use
    /// their own item fragment.
    pub item_bindings: Bindings,
}
