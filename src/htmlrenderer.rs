//! Implements a custom [`push_html`] on top of [`pulldown_cmark`]'s event
//! stream. Compared to `pulldown_cmark::html::push_html` it gives every
//! heading an anchor (so that a table of contents can link to it), sizes
//! images to the configured width and can wrap each image in a link to the
//! original file.
//!
//! It also layers a few inline extensions over the parser's output, working
//! from the source offset of each event: `_single underscores_` render as
//! `<u>` while `*asterisks*` stay `<em>`, `"double quotes"` become `<q>`,
//! and bare `http://`, `https://`, `ftp://` and `www.` URLs become links.
//! Elements nested deeper than [`MAX_NESTING`] are flattened to their text.

use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag,
    TagEnd,
};
use std::collections::HashMap;
use std::fmt::{self, Display, Write};
use std::ops::Range;

/// How deep elements may nest before their markup is dropped.
pub const MAX_NESTING: usize = 16;

/// An event along with its byte range in the markdown source.
pub type Spanned<'a> = (Event<'a>, Range<usize>);

/// Parses `markdown` into spanned events. Runs of adjacent text events are
/// merged so that the inline extensions see whole runs of text.
pub fn parse(markdown: &str, options: Options) -> Vec<Spanned<'_>> {
    let mut events: Vec<Spanned> = Vec::new();
    for (event, range) in Parser::new_ext(markdown, options).into_offset_iter() {
        if let (Event::Text(next), Some((Event::Text(text), span))) = (&event, events.last_mut()) {
            let mut merged = text.to_string();
            merged.push_str(next);
            *text = CowStr::from(merged);
            span.end = range.end;
            continue;
        }
        events.push((event, range));
    }
    events
}

struct EscapeHref<'a>(&'a str);

fn is_href_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%()*+,-./:;=?@[]_~".contains(&b)
}

impl<'a> Display for EscapeHref<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0.as_bytes() {
            match b {
                b'&' => f.write_str("&amp;")?,
                b'\'' => f.write_str("&#x27;")?,
                b if is_href_safe(b) => f.write_char(char::from(b))?,
                b => write!(f, "%{:02X}", b)?,
            }
        }
        Ok(())
    }
}

pub(crate) struct EscapeHtml<'a>(pub(crate) &'a str);

impl<'a> Display for EscapeHtml<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut last = 0;
        for (i, c) in self.0.char_indices() {
            let escaped = match c {
                '&' => "&amp;",
                '<' => "&lt;",
                '>' => "&gt;",
                '"' => "&quot;",
                _ => continue,
            };
            f.write_str(&self.0[last..i])?;
            f.write_str(escaped)?;
            last = i + 1;
        }
        f.write_str(&self.0[last..])
    }
}

/// How images are emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageOptions {
    /// Either a pixel count (`640`) or any CSS length (`80%`).
    pub width: String,

    /// Wrap every image in a link to the image file itself.
    pub link_to_original: bool,
}

/// A heading found in a document, with the anchor it is rendered with.
#[derive(Clone, Debug, PartialEq)]
pub struct Heading {
    pub level: u32,
    pub id: String,
    pub text: String,
}

/// Scans an event stream for headings and assigns each a unique anchor
/// derived from its text.
pub fn collect_headings(events: &[Spanned]) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut current: Option<(u32, String)> = None;

    for (event, _) in events {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((*level as u32, String::new()))
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, text)) = current.take() {
                    let base = match slug::slugify(&text) {
                        s if s.is_empty() => String::from("section"),
                        s => s,
                    };
                    let count = seen.entry(base.clone()).or_insert(0);
                    let id = match *count {
                        0 => base,
                        n => format!("{}-{}", base, n),
                    };
                    *count += 1;
                    headings.push(Heading { level, id, text });
                }
            }
            _ => {}
        }
    }
    headings
}

/// Writes a nested list of links to every heading up to `max_level`. The
/// first heading sets the outermost nesting level.
pub fn push_toc<W: Write>(w: &mut W, headings: &[Heading], max_level: u32) -> fmt::Result {
    let mut current: u32 = 0;
    let mut offset: u32 = 0;

    for heading in headings.iter().filter(|h| h.level <= max_level) {
        if current == 0 {
            offset = heading.level - 1;
        }
        let level = heading.level.saturating_sub(offset).max(1);

        if level > current {
            while level > current {
                w.write_str("<ul>\n<li>\n")?;
                current += 1;
            }
        } else if level < current {
            w.write_str("</li>\n")?;
            while level < current {
                w.write_str("</ul>\n</li>\n")?;
                current -= 1;
            }
            w.write_str("<li>\n")?;
        } else {
            w.write_str("</li>\n<li>\n")?;
        }
        writeln!(
            w,
            "<a href=\"#{}\">{}</a>",
            EscapeHref(&heading.id),
            EscapeHtml(&heading.text)
        )?;
    }

    while current > 0 {
        w.write_str("</li>\n</ul>\n")?;
        current -= 1;
    }
    Ok(())
}

const URL_PREFIXES: &[&str] = &["https://", "http://", "ftp://", "www."];

/// Finds the next bare URL in `text` that starts a word.
fn find_url(text: &str) -> Option<Range<usize>> {
    let mut previous: Option<char> = None;
    for (i, c) in text.char_indices() {
        let word_start = previous.map_or(true, |p| !(p.is_alphanumeric() || p == '/' || p == '.'));
        previous = Some(c);
        if !word_start {
            continue;
        }
        let candidate = &text[i..];
        if let Some(prefix) = URL_PREFIXES.iter().find(|p| candidate.starts_with(**p)) {
            let len = url_len(candidate);
            if len > prefix.len() {
                return Some(i..i + len);
            }
        }
    }
    None
}

// Trailing sentence punctuation is not part of the URL.
fn url_len(text: &str) -> usize {
    let end = text
        .find(|c: char| c.is_whitespace() || c == '<' || c == '"')
        .unwrap_or_else(|| text.len());
    text[..end]
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ':' | ';' | '!' | '?' | ')' | '\''))
        .len()
}

fn push_autolinked<W: Write>(w: &mut W, text: &str) -> fmt::Result {
    let mut rest = text;
    while let Some(url) = find_url(rest) {
        write!(w, "{}", EscapeHtml(&rest[..url.start]))?;
        let link = &rest[url.clone()];
        let href = match link.starts_with("www.") {
            true => format!("http://{}", link),
            false => link.to_owned(),
        };
        write!(w, r#"<a href="{}">{}</a>"#, EscapeHref(&href), EscapeHtml(link))?;
        rest = &rest[url.end..];
    }
    write!(w, "{}", EscapeHtml(rest))
}

/// Writes prose text, turning paired double quotes into `<q>` and bare URLs
/// into links. An unpaired quote is kept as is.
fn push_text<W: Write>(w: &mut W, text: &str) -> fmt::Result {
    let mut rest = text;
    while let Some(open) = rest.find('"') {
        let inner = &rest[open + 1..];
        match inner.find('"') {
            Some(close) => {
                push_autolinked(w, &rest[..open])?;
                w.write_str("<q>")?;
                push_autolinked(w, &inner[..close])?;
                w.write_str("</q>")?;
                rest = &inner[close + 1..];
            }
            None => break,
        }
    }
    push_autolinked(w, rest)
}

enum TableState {
    Head,
    Body,
}

/// An image whose alt text is still being collected.
struct PendingImage<'a> {
    dest: CowStr<'a>,
    title: CowStr<'a>,
    alt: String,
}

fn alert_class(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => "note",
        BlockQuoteKind::Tip => "tip",
        BlockQuoteKind::Important => "important",
        BlockQuoteKind::Warning => "warning",
        BlockQuoteKind::Caution => "caution",
    }
}

/// Renders markdown [`Event`]s into HTML. This is largely modeled after
/// [`pulldown_cmark`]'s private `HtmlWriter` struct.
struct HtmlRenderer<'a, 'h> {
    source: &'a str,

    table_alignments: Vec<Alignment>,
    table_state: TableState,
    table_cell_index: usize,

    images: &'h ImageOptions,
    image: Option<PendingImage<'a>>,

    /// Anchors for the document's headings, in document order.
    heading_ids: std::slice::Iter<'h, Heading>,

    /// Open elements, including the ones past [`MAX_NESTING`].
    depth: usize,

    /// Whether each open emphasis was written with underscores.
    underlines: Vec<bool>,
    links: usize,
    in_code_block: bool,
}

impl<'a, 'h> HtmlRenderer<'a, 'h> {
    fn new(source: &'a str, images: &'h ImageOptions, headings: &'h [Heading]) -> Self {
        HtmlRenderer {
            source,
            table_alignments: Vec::default(),
            table_state: TableState::Head,
            table_cell_index: usize::default(),
            images,
            image: None,
            heading_ids: headings.iter(),
            depth: 0,
            underlines: Vec::new(),
            links: 0,
            in_code_block: false,
        }
    }

    fn on_event<W: Write>(&mut self, w: &mut W, event: Event<'a>, range: Range<usize>) -> fmt::Result {
        if let Some(image) = self.image.as_mut() {
            match event {
                Event::Text(text) | Event::Code(text) => image.alt.push_str(&text),
                Event::End(TagEnd::Image) => {
                    self.depth -= 1;
                    if let Some(image) = self.image.take() {
                        self.on_image(w, image)?;
                    }
                }
                _ => {}
            }
            return Ok(());
        }

        match event {
            Event::Start(tag) => {
                self.depth += 1;
                if self.depth > MAX_NESTING {
                    // Keep heading anchors in step with the headings seen.
                    if let Tag::Heading { .. } = tag {
                        self.heading_ids.next();
                    }
                    return Ok(());
                }
                self.on_start(w, tag, range)
            }
            Event::End(tag) => {
                let flattened = self.depth > MAX_NESTING;
                self.depth -= 1;
                match flattened {
                    true => Ok(()),
                    false => self.on_end(w, tag),
                }
            }
            Event::Text(text) => match self.in_code_block || self.links > 0 {
                true => write!(w, "{}", EscapeHtml(&text)),
                false => push_text(w, &text),
            },
            Event::Code(code) => write!(w, "<code>{}</code>", EscapeHtml(&code)),
            Event::InlineMath(math) => {
                write!(w, r#"<span class="math math-inline">{}</span>"#, EscapeHtml(&math))
            }
            Event::DisplayMath(math) => {
                write!(w, r#"<span class="math math-display">{}</span>"#, EscapeHtml(&math))
            }
            Event::FootnoteReference(name) => write!(
                w,
                r##"<sup class="footnote-reference"><a href="#{}">{}</a></sup>"##,
                EscapeHtml(&name),
                EscapeHtml(&name),
            ),
            Event::HardBreak => w.write_str("<br />\n"),
            Event::Html(html) | Event::InlineHtml(html) => w.write_str(&html),
            Event::Rule => w.write_str("<hr />\n"),
            Event::SoftBreak => w.write_str("\n"),
            Event::TaskListMarker(checked) => write!(
                w,
                r#"<input disabled="" type="checkbox" {}/>"#,
                match checked {
                    true => r#"checked="" "#,
                    false => "",
                }
            ),
        }
    }

    fn on_image<W: Write>(&mut self, w: &mut W, image: PendingImage<'a>) -> fmt::Result {
        let width = &self.images.width;
        let size = if width.is_empty() {
            String::new()
        } else if width.chars().all(|c| c.is_ascii_digit()) {
            format!(r#" width="{}""#, width)
        } else {
            format!(r#" style="width:{}""#, EscapeHtml(width))
        };
        let title = if image.title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, EscapeHtml(&image.title))
        };
        let img = format!(
            r#"<img src="{}" alt="{}"{}{}>"#,
            EscapeHref(&image.dest),
            EscapeHtml(&image.alt),
            title,
            size,
        );
        match self.images.link_to_original {
            true => write!(w, r#"<a href="{}">{}</a>"#, EscapeHref(&image.dest), img),
            false => w.write_str(&img),
        }
    }

    fn on_start<W: Write>(&mut self, w: &mut W, tag: Tag<'a>, range: Range<usize>) -> fmt::Result {
        match tag {
            Tag::BlockQuote(None) => w.write_str("<blockquote>\n"),
            Tag::BlockQuote(Some(kind)) => write!(
                w,
                "<blockquote class=\"markdown-alert-{}\">\n",
                alert_class(kind)
            ),
            Tag::CodeBlock(kind) => {
                self.in_code_block = true;
                match kind {
                    CodeBlockKind::Fenced(info) => {
                        match info.split(' ').next().unwrap_or_default() {
                            "" => w.write_str("<pre><code>"),
                            lang => {
                                write!(w, r#"<pre><code class="language-{}">"#, EscapeHtml(lang))
                            }
                        }
                    }
                    CodeBlockKind::Indented => w.write_str("<pre><code>"),
                }
            }
            Tag::Emphasis => {
                let underline = self.source[range.start..].starts_with('_');
                self.underlines.push(underline);
                w.write_str(if underline { "<u>" } else { "<em>" })
            }
            Tag::FootnoteDefinition(name) => write!(
                w,
                r#"<div class="footnote-definition" id="{}"><sup class="footnote-definition-label">{}</sup>"#,
                EscapeHtml(&name),
                EscapeHtml(&name),
            ),
            Tag::Heading { level, .. } => match self.heading_ids.next() {
                Some(heading) => write!(w, r#"<h{} id="{}">"#, level as u32, EscapeHtml(&heading.id)),
                None => write!(w, "<h{}>", level as u32),
            },
            Tag::HtmlBlock | Tag::MetadataBlock(_) => Ok(()),
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(PendingImage {
                    dest: dest_url,
                    title,
                    alt: String::new(),
                });
                Ok(())
            }
            Tag::Item => w.write_str("<li>"),
            Tag::Link {
                link_type: LinkType::Email,
                dest_url,
                title,
                ..
            } => {
                self.links += 1;
                write!(
                    w,
                    r#"<a href="mailto:{}" title="{}">"#,
                    EscapeHref(&dest_url),
                    EscapeHtml(&title),
                )
            }
            Tag::Link {
                dest_url, title, ..
            } => {
                self.links += 1;
                match title.is_empty() {
                    true => write!(w, r#"<a href="{}">"#, EscapeHref(&dest_url)),
                    false => write!(
                        w,
                        r#"<a href="{}" title="{}">"#,
                        EscapeHref(&dest_url),
                        EscapeHtml(&title),
                    ),
                }
            }
            Tag::List(None) => w.write_str("<ul>\n"),
            Tag::List(Some(1)) => w.write_str("<ol>\n"),
            Tag::List(Some(start)) => writeln!(w, "<ol start=\"{}\">", start),
            Tag::DefinitionList => w.write_str("<dl>\n"),
            Tag::DefinitionListTitle => w.write_str("<dt>"),
            Tag::DefinitionListDefinition => w.write_str("<dd>"),
            Tag::Paragraph => w.write_str("<p>"),
            Tag::Strikethrough => w.write_str("<del>"),
            Tag::Strong => w.write_str("<strong>"),
            Tag::Superscript => w.write_str("<sup>"),
            Tag::Subscript => w.write_str("<sub>"),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                w.write_str("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                w.write_str("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                w.write_str("<tr>")
            }
            Tag::TableCell => write!(
                w,
                "<{}{}>",
                match self.table_state {
                    TableState::Head => "th",
                    TableState::Body => "td",
                },
                match self.table_alignments.get(self.table_cell_index) {
                    Some(Alignment::Left) => r#" align="left""#,
                    Some(Alignment::Right) => r#" align="right""#,
                    Some(Alignment::Center) => r#" align="center""#,
                    _ => "",
                }
            ),
        }
    }

    fn on_end<W: Write>(&mut self, w: &mut W, tag: TagEnd) -> fmt::Result {
        match tag {
            TagEnd::BlockQuote(_) => w.write_str("</blockquote>\n"),
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                w.write_str("</code></pre>\n")
            }
            TagEnd::Emphasis => match self.underlines.pop() {
                Some(true) => w.write_str("</u>"),
                _ => w.write_str("</em>"),
            },
            TagEnd::FootnoteDefinition => w.write_str("</div>\n"),
            TagEnd::Heading(level) => writeln!(w, "</h{}>", level as u32),
            TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => Ok(()),
            // handled in `on_event` once the alt text is complete
            TagEnd::Image => Ok(()),
            TagEnd::Item => w.write_str("</li>\n"),
            TagEnd::Link => {
                self.links = self.links.saturating_sub(1);
                w.write_str("</a>")
            }
            TagEnd::List(true) => w.write_str("</ol>\n"),
            TagEnd::List(false) => w.write_str("</ul>\n"),
            TagEnd::DefinitionList => w.write_str("</dl>\n"),
            TagEnd::DefinitionListTitle => w.write_str("</dt>\n"),
            TagEnd::DefinitionListDefinition => w.write_str("</dd>\n"),
            TagEnd::Paragraph => w.write_str("</p>\n"),
            TagEnd::Strikethrough => w.write_str("</del>"),
            TagEnd::Strong => w.write_str("</strong>"),
            TagEnd::Superscript => w.write_str("</sup>"),
            TagEnd::Subscript => w.write_str("</sub>"),
            TagEnd::Table => w.write_str("</tbody></table>\n"),
            TagEnd::TableHead => {
                self.table_state = TableState::Body;
                w.write_str("</tr></thead><tbody>")
            }
            TagEnd::TableRow => w.write_str("</tr>"),
            TagEnd::TableCell => {
                self.table_cell_index += 1;
                w.write_str(match self.table_state {
                    TableState::Head => "</th>",
                    TableState::Body => "</td>",
                })
            }
        }
    }
}

/// Converts the spanned events of `source` (see [`parse`]) into HTML much
/// like `pulldown_cmark::html::push_html`, with heading anchors taken from
/// `headings` (see [`collect_headings`]) and images emitted according to
/// `images`.
pub fn push_html<'a, W, I>(
    w: &mut W,
    source: &'a str,
    events: I,
    headings: &[Heading],
    images: &ImageOptions,
) -> fmt::Result
where
    W: Write,
    I: IntoIterator<Item = Spanned<'a>>,
{
    let mut renderer = HtmlRenderer::new(source, images, headings);
    for (event, range) in events {
        renderer.on_event(w, event, range)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(markdown: &str, images: &ImageOptions) -> String {
        let events = parse(markdown, Options::ENABLE_SUPERSCRIPT);
        let headings = collect_headings(&events);
        let mut out = String::new();
        push_html(&mut out, markdown, events, &headings, images).unwrap();
        out
    }

    fn plain_images() -> ImageOptions {
        ImageOptions {
            width: String::new(),
            link_to_original: false,
        }
    }

    #[test]
    fn test_headings_get_unique_anchors() {
        let html = render("# Intro\n\n## Intro\n\n## `code` title\n", &plain_images());
        assert_eq!(
            "<h1 id=\"intro\">Intro</h1>\n<h2 id=\"intro-1\">Intro</h2>\n<h2 id=\"code-title\"><code>code</code> title</h2>\n",
            html
        );
    }

    #[test]
    fn test_image_width_and_link() {
        let images = ImageOptions {
            width: "640".to_owned(),
            link_to_original: true,
        };
        assert_eq!(
            "<p><a href=\"cat.png\"><img src=\"cat.png\" alt=\"A cat\" width=\"640\"></a></p>\n",
            render("![A cat](cat.png)", &images)
        );
    }

    #[test]
    fn test_image_css_width() {
        let images = ImageOptions {
            width: "80%".to_owned(),
            link_to_original: false,
        };
        assert_eq!(
            "<p><img src=\"cat.png\" alt=\"\" style=\"width:80%\"></p>\n",
            render("![](cat.png)", &images)
        );
    }

    #[test]
    fn test_underscores_underline() {
        assert_eq!(
            "<p><u>under</u> and <em>em</em> and snake_case</p>\n",
            render("_under_ and *em* and snake_case", &plain_images())
        );
    }

    #[test]
    fn test_quotes() {
        assert_eq!(
            "<p>He said <q>hi</q> twice, then &quot;bye</p>\n",
            render("He said \"hi\" twice, then \"bye", &plain_images())
        );
    }

    #[test]
    fn test_bare_urls_become_links() {
        assert_eq!(
            "<p>See <a href=\"https://example.com/a?b=1&amp;c\">https://example.com/a?b=1&amp;c</a>, \
             or <a href=\"http://www.rust-lang.org\">www.rust-lang.org</a>.</p>\n",
            render(
                "See https://example.com/a?b=1&c, or www.rust-lang.org.",
                &plain_images()
            )
        );
    }

    #[test]
    fn test_links_and_code_are_not_relinked() {
        assert_eq!(
            "<p><a href=\"https://x.org\">https://x.org</a> <code>www.x.org</code></p>\n",
            render("<https://x.org> `www.x.org`", &plain_images())
        );
        assert_eq!(
            "<pre><code>https://x.org &quot;q&quot;\n</code></pre>\n",
            render("```\nhttps://x.org \"q\"\n```\n", &plain_images())
        );
    }

    #[test]
    fn test_superscript() {
        assert_eq!("<p>2<sup>10</sup></p>\n", render("2^10^", &plain_images()));
    }

    #[test]
    fn test_nesting_is_capped() {
        let markdown = format!("{}deep", "> ".repeat(MAX_NESTING + 4));
        let html = render(&markdown, &plain_images());
        assert_eq!(MAX_NESTING, html.matches("<blockquote>").count());
        assert_eq!(MAX_NESTING, html.matches("</blockquote>").count());
        assert!(html.contains("deep"));
        assert!(!html.contains("<p>"));
    }

    #[test]
    fn test_escaping() {
        assert_eq!("a &lt;b&gt; &amp; &quot;c&quot;", EscapeHtml("a <b> & \"c\"").to_string());
        assert_eq!("a%20b/%C3%A9?x=1&amp;y=&#x27;", EscapeHref("a b/é?x=1&y='").to_string());
    }

    #[test]
    fn test_toc_nesting() {
        let headings = vec![
            Heading { level: 2, id: "a".into(), text: "A".into() },
            Heading { level: 3, id: "b".into(), text: "B".into() },
            Heading { level: 4, id: "deep".into(), text: "Deep".into() },
            Heading { level: 2, id: "c".into(), text: "C".into() },
        ];
        let mut out = String::new();
        push_toc(&mut out, &headings, 3).unwrap();
        assert_eq!(
            "<ul>\n<li>\n<a href=\"#a\">A</a>\n<ul>\n<li>\n<a href=\"#b\">B</a>\n</li>\n</ul>\n</li>\n<li>\n<a href=\"#c\">C</a>\n</li>\n</ul>\n",
            out
        );
    }

    #[test]
    fn test_toc_empty() {
        let mut out = String::new();
        push_toc(&mut out, &[], 3).unwrap();
        assert_eq!("", out);
    }
}
