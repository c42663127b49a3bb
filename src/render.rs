//! Renders each [`Article`] into a [`PageArticle`]: the final article page,
//! its teaser, its index-item snippet and the local media files it refers
//! to.

use crate::article::{Article, Kind};
use crate::category::{Keyword, CATEGORIES_DIRECTORY};
use crate::config::{CategoryLinks, Config};
use crate::htmlrenderer::{EscapeHtml, ImageOptions};
use crate::markdown::{Mode, Renderer};
use crate::page::{Asset, Page, PageArticle};
use crate::summary::summarize;
use crate::template::{populate, Bindings, Placeholder, Templates};
use crate::url::{page_location, relative_root, to_link};
use std::path::Path;
use tracing::debug;

const SRC_ATTRIBUTE: &str = "src=\"";

// Stray whitespace in front of a markdown link target ends up percent
// encoded at the start of the attribute value.
const ENCODED_TAB: &str = "%09";

const PRE_TAG: &str = "<pre>";
const HEAD_CLOSE: &str = "</head>";

/// Builds [`PageArticle`]s. Holds the one markdown [`Renderer`] used for the
/// whole run.
pub struct ArticleRenderer<'a> {
    config: &'a Config,
    templates: &'a Templates,
    markdown: Renderer,
}

impl<'a> ArticleRenderer<'a> {
    pub fn new(config: &'a Config, templates: &'a Templates) -> ArticleRenderer<'a> {
        ArticleRenderer {
            config,
            templates,
            markdown: Renderer::new(ImageOptions {
                width: config.image_width.clone(),
                link_to_original: config.images_link,
            }),
        }
    }

    /// Renders `article` into a fully populated [`PageArticle`].
    pub fn render<'b>(&mut self, article: &'b Article) -> PageArticle<'b> {
        let location = page_location(article.kind().directory(), article.url());
        let rendered = self.markdown.render(article.body(), Mode::Content);
        let summary = summarize(&rendered, self.config.summary_length);
        let (content, assets) =
            localize_media(&rendered, &self.config.articles_directory, &location);
        let toc = if self.config.table_of_contents {
            self.markdown.render(article.body(), Mode::TableOfContents)
        } else {
            String::new()
        };

        let root = relative_root(&location);
        let link = to_link(&location);
        let date = article.date_str(&self.config.date_format);

        let page_bindings = Bindings::new()
            .with(Placeholder::Title, article.title())
            .with(Placeholder::Date, date.as_str())
            .with(Placeholder::Author, article.author())
            .with(Placeholder::BlogTitle, self.config.title.as_str())
            .with(Placeholder::Link, format!("{}{}", self.config.site_root, link))
            .with(Placeholder::Summary, summary.as_str())
            .with(Placeholder::Content, content.as_str())
            .with(
                Placeholder::Keywords,
                keyword_links(article.keywords(), self.config.category_links, &root),
            )
            .with(Placeholder::Toc, toc)
            .with(Placeholder::RootLink, self.config.site_root.as_str())
            .with(Placeholder::RelativeRootLink, root.as_str())
            .with(Placeholder::ParentLink, parent_link(article.kind(), &root))
            .with(Placeholder::CategoryTitle, "")
            .with(Placeholder::CategoryId, "")
            .with(Placeholder::CategoryLink, "");
        let html = match &self.templates.syntax {
            Some(syntax) if content.contains(PRE_TAG) => populate(
                &inject_before_head_close(&self.templates.article, syntax),
                &page_bindings,
            ),
            _ => populate(&self.templates.article, &page_bindings),
        };

        // Snippets end up on pages at other depths; their links carry the
        // root token and are resolved when the listing page is populated.
        let root_token = Placeholder::RelativeRootLink.token();
        let media_prefix = match location.parent() {
            Some(parent) if parent != Path::new("") => {
                format!("{}{}/", root_token, to_link(parent))
            }
            _ => root_token.clone(),
        };
        let item_bindings = Bindings::new()
            .with(Placeholder::Title, article.title())
            .with(Placeholder::Date, date)
            .with(Placeholder::Author, article.author())
            .with(Placeholder::Link, format!("{}{}", root_token, link))
            .with(Placeholder::Summary, summary.as_str())
            .with(
                Placeholder::Content,
                prefix_local_media(&content, &media_prefix),
            )
            .with(
                Placeholder::Keywords,
                keyword_links(article.keywords(), self.config.category_links, &root_token),
            )
            .with(Placeholder::Toc, "");
        let snippet = populate(&self.templates.index.item, &item_bindings);

        debug!(
            title = article.title(),
            location = %location.display(),
            assets = assets.len(),
            "rendered article"
        );
        PageArticle {
            article,
            page: Page {
                location,
                html,
                assets,
            },
            summary,
            content,
            snippet,
            item_bindings,
        }
    }
}

/// The index page an article of `kind` links back to.
fn parent_link(kind: Kind, root: &str) -> String {
    format!("{}{}", root, kind.index_file())
}

/// The link to a category, relative to the output root.
pub fn category_link(id: &str, style: CategoryLinks) -> String {
    match style {
        CategoryLinks::Page => format!("{}/{}.html", CATEGORIES_DIRECTORY, id),
        CategoryLinks::Anchor => format!("{}/index.html#{}", CATEGORIES_DIRECTORY, id),
    }
}

/// Renders the keyword list of an article as comma separated category links
/// prefixed with `root`.
pub fn keyword_links(keywords: &[Keyword], style: CategoryLinks, root: &str) -> String {
    keywords
        .iter()
        .map(|keyword| {
            format!(
                "<a href=\"{}{}\">{}</a>",
                root,
                category_link(&keyword.id, style),
                EscapeHtml(&keyword.name)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_absolute(link: &str) -> bool {
    link.is_empty()
        || link.starts_with("http")
        || link.starts_with("www.")
        || link.starts_with('/')
        || link.starts_with('#')
        || link.starts_with("data:")
}

/// Every `src="..."` attribute value in `html`, in document order.
fn src_links(html: &str) -> Vec<&str> {
    let mut links = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find(SRC_ATTRIBUTE) {
        let value = &rest[start + SRC_ATTRIBUTE.len()..];
        match value.find('"') {
            Some(end) => {
                links.push(&value[..end]);
                rest = &value[end + 1..];
            }
            None => break,
        }
    }
    links
}

/// Finds the local media an article page refers to. Each file is copied
/// into a directory named after the page (`articles/2024/03/hello.html`
/// gets `articles/2024/03/hello/`) and every attribute pointing at it is
/// rewritten to the new relative location.
pub fn localize_media(html: &str, source_dir: &Path, location: &Path) -> (String, Vec<Asset>) {
    let asset_dir = location.with_extension("");
    let dir_name = match asset_dir.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return (html.to_owned(), Vec::new()),
    };

    let mut assets = Vec::new();
    let mut rewrites: Vec<(&str, String)> = Vec::new();
    for raw in src_links(html) {
        let link = raw.trim_start_matches(ENCODED_TAB);
        if is_absolute(link) || rewrites.iter().any(|(seen, _)| *seen == raw) {
            continue;
        }
        let file_name = match Path::new(link).file_name() {
            Some(file_name) => file_name,
            None => continue,
        };
        let destination = asset_dir.join(file_name);
        if !assets.iter().any(|(_, dst)| *dst == destination) {
            assets.push((source_dir.join(link), destination));
        }
        rewrites.push((raw, format!("{}/{}", dir_name, file_name.to_string_lossy())));
    }

    let mut content = html.to_owned();
    for (from, to) in &rewrites {
        content = content.replace(&format!("=\"{}\"", from), &format!("=\"{}\"", to));
    }
    (content, assets)
}

/// Prefixes every relative `src="..."` value in `html` with `prefix`.
pub fn prefix_local_media(html: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find(SRC_ATTRIBUTE) {
        let split = start + SRC_ATTRIBUTE.len();
        out.push_str(&rest[..split]);
        rest = &rest[split..];
        let value = rest.split('"').next().unwrap_or("");
        if !is_absolute(value) {
            out.push_str(prefix);
        }
    }
    out.push_str(rest);
    out
}

fn inject_before_head_close(template: &str, fragment: &str) -> String {
    match template.find(HEAD_CLOSE) {
        Some(at) => {
            let mut out = String::with_capacity(template.len() + fragment.len());
            out.push_str(&template[..at]);
            out.push_str(fragment);
            out.push_str(&template[at..]);
            out
        }
        None => template.to_owned(),
    }
}
