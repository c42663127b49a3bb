//! Converts article markdown to HTML. The [`Renderer`] is an explicitly owned
//! value created once per generation run; its scratch buffer is reset after
//! every call so that consecutive renders never see each other's output.

use crate::htmlrenderer::{self, ImageOptions};
use pulldown_cmark::Options;
use tracing::warn;

/// Headings deeper than this are left out of tables of contents.
pub const TOC_MAX_LEVEL: u32 = 3;

/// What a render call produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// The full article body.
    Content,

    /// A nested list of links to the article's headings.
    TableOfContents,
}

/// The fixed extension set every article is rendered with. Fenced code is
/// part of CommonMark; underline, quotes, bare autolinks and the nesting cap
/// are layered on by [`htmlrenderer`].
fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_SUPERSCRIPT
        | Options::ENABLE_GFM
}

pub struct Renderer {
    images: ImageOptions,
    buffer: String,
}

impl Renderer {
    pub fn new(images: ImageOptions) -> Renderer {
        Renderer {
            images,
            buffer: String::with_capacity(4096),
        }
    }

    /// Renders `markdown` in the requested [`Mode`].
    pub fn render(&mut self, markdown: &str, mode: Mode) -> String {
        let events = htmlrenderer::parse(markdown, options());
        let headings = htmlrenderer::collect_headings(&events);

        let result = match mode {
            Mode::Content => {
                htmlrenderer::push_html(&mut self.buffer, markdown, events, &headings, &self.images)
            }
            Mode::TableOfContents => {
                htmlrenderer::push_toc(&mut self.buffer, &headings, TOC_MAX_LEVEL)
            }
        };
        if let Err(err) = result {
            warn!(?mode, "rendering markdown: {}", err);
        }

        let html = self.buffer.clone();
        self.buffer.clear();
        html
    }
}
