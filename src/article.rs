//! Defines the [`Article`], [`Kind`] and [`Loader`] types: the in-memory form
//! of a source markdown file and the logic that reads a directory of them.
//!
//! A source file starts with a header block separated from the body by a
//! blank line:
//!
//! ```md
//! # Hello World
//! 03/05/2024
//! Jane Doe
//! rust, static sites
//!
//! The body, in markdown.
//! ```
//!
//! Only the title line is mandatory. A second line reading `draft` (or no
//! second line at all) makes the article a draft.

use crate::category::Keyword;
use crate::url::resolve_url;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

const MARKDOWN_EXTENSION: &str = "md";
const DRAFT_MARKER: &str = "draft";

/// Whether an article is published or still a draft. Derived from the
/// presence of a publication date and never set independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Public,
    Draft,
}

impl Kind {
    /// The output directory for article pages of this kind.
    pub fn directory(self) -> &'static str {
        match self {
            Kind::Public => "articles",
            Kind::Draft => "drafts",
        }
    }

    /// The root-level index page listing articles of this kind.
    pub fn index_file(self) -> &'static str {
        match self {
            Kind::Public => "index.html",
            Kind::Draft => "index-drafts.html",
        }
    }
}

/// A single parsed source article. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct Article {
    title: String,
    date: Option<NaiveDate>,
    author: String,
    body: String,
    keywords: Vec<Keyword>,
    url: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        date: Option<NaiveDate>,
        author: impl Into<String>,
        body: impl Into<String>,
        keywords: Vec<Keyword>,
    ) -> Article {
        let title = title.into();
        let url = resolve_url(&title, date);
        Article {
            title,
            date,
            author: author.into(),
            body: body.into(),
            keywords,
            url,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// The raw markdown body.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    /// The article's relative URL (see [`crate::url::resolve_url`]).
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> Kind {
        match self.date {
            Some(_) => Kind::Public,
            None => Kind::Draft,
        }
    }

    /// The display date in `date_format`, or `DRAFT` for drafts.
    pub fn date_str(&self, date_format: &str) -> String {
        match self.date {
            Some(date) => date.format(date_format).to_string(),
            None => DRAFT_MARKER.to_uppercase(),
        }
    }
}

/// Parses [`Article`] objects from source files.
pub struct Loader<'a> {
    /// The `chrono` format of the date line, e.g. `%m/%d/%Y`.
    date_format: &'a str,

    /// The author used when the header has no author line.
    default_author: &'a str,
}

impl<'a> Loader<'a> {
    pub fn new(date_format: &'a str, default_author: &'a str) -> Loader<'a> {
        Loader {
            date_format,
            default_author,
        }
    }

    /// Parses a single [`Article`] from the full text of a source file.
    pub fn parse(&self, input: &str) -> Result<Article> {
        let input = input.replace("\r\n", "\n");
        if input.trim().is_empty() {
            return Err(Error::Empty);
        }
        let split = input.find("\n\n").ok_or(Error::MissingHeaderSeparator)?;
        let (header, body) = (&input[..split], &input[split + 2..]);
        if header.trim().is_empty() || body.trim().is_empty() {
            return Err(Error::Empty);
        }

        let mut lines = header.lines();
        let title = lines
            .next()
            .map(|line| line.replace("##", "").trim_matches('#').trim().to_owned())
            .unwrap_or_default();

        let date = match lines.next().map(str::trim) {
            None => None,
            Some(line) if line.is_empty() || line.eq_ignore_ascii_case(DRAFT_MARKER) => None,
            Some(line) => Some(NaiveDate::parse_from_str(line, self.date_format).map_err(
                |err| Error::Date {
                    value: line.to_owned(),
                    format: self.date_format.to_owned(),
                    err,
                },
            )?),
        };

        let author = match lines.next().map(str::trim) {
            Some(line) if !line.is_empty() => line.to_owned(),
            _ => self.default_author.to_owned(),
        };

        let keywords = lines.next().map(Keyword::parse_list).unwrap_or_default();

        Ok(Article::new(title, date, author, body, keywords))
    }

    /// Reads and parses one source file.
    pub fn load(&self, path: &Path) -> Result<Article> {
        let contents = fs::read_to_string(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        self.parse(&contents)
    }

    /// Loads every article in `dir` (not recursively). Files that fail to
    /// parse are logged and skipped. The result is ordered chronologically:
    /// public articles oldest first, then drafts in file name order.
    pub fn load_articles(&self, dir: &Path) -> Vec<Article> {
        let mut articles: Vec<Article> = source_files(dir)
            .into_iter()
            .filter_map(|path| match self.load(&path) {
                Ok(article) => Some(article),
                Err(err) => {
                    warn!(path = %path.display(), "skipping article: {}", err);
                    None
                }
            })
            .collect();

        // `sort_by_key` is stable, so equal dates and drafts keep file order.
        articles.sort_by_key(|article| (article.date().is_none(), article.date()));
        debug!(count = articles.len(), dir = %dir.display(), "loaded articles");
        articles
    }
}

/// Lists the markdown source files directly inside `dir`, sorted by file
/// name. Names starting with `_` or `#` are treated as disabled.
fn source_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("listing articles: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_source_file(path))
        .collect()
}

fn is_source_file(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .map(|ext| ext == MARKDOWN_EXTENSION)
        .unwrap_or(false);
    let enabled = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| !name.starts_with('_') && !name.starts_with('#'))
        .unwrap_or(false);
    has_extension && enabled
}

/// Represents the result of an [`Article`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing an [`Article`]. These are never fatal for a
/// run; the offending file is excluded.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the file, its header or its body is empty.
    #[error("article is empty or has an empty header or body")]
    Empty,

    /// Returned when no blank line separates the header from the body.
    #[error("missing blank line between header and body")]
    MissingHeaderSeparator,

    /// Returned when the date line doesn't match the configured format.
    #[error("parsing date `{value}` with format `{format}`: {err}")]
    Date {
        value: String,
        format: String,
        err: chrono::ParseError,
    },

    /// Returned for I/O problems reading a source file.
    #[error("reading `{}`: {err}", .path.display())]
    Io { path: PathBuf, err: std::io::Error },
}
