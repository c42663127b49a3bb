//! Plain-text teasers for index pages and feed descriptions. Rendered HTML is
//! treated as an opaque character stream: markup and bracketed reference
//! artifacts are spliced out, whitespace is normalized, and the text is cut
//! at a word boundary.

/// The marker appended to every non-empty summary.
pub const ELLIPSIS: &str = "…";

/// Removes every `open ... close` span, scanning from the first `open` each
/// time. An `open` with no matching `close` after it stops the scan and the
/// remainder is kept verbatim.
fn strip_spans(text: &str, open: char, close: char) -> String {
    let mut out = text.to_owned();
    while let Some(start) = out.find(open) {
        match out[start + open.len_utf8()..].find(close) {
            Some(offset) => {
                let end = start + open.len_utf8() + offset + close.len_utf8();
                out.replace_range(start..end, "");
            }
            None => break,
        }
    }
    out
}

/// Strips `<...>` tags and `[...]` footnote/reference spans until nothing
/// more can be removed.
pub fn strip_markup(html: &str) -> String {
    let mut current = html.to_owned();
    loop {
        let next = strip_spans(&strip_spans(&current, '<', '>'), '[', ']');
        if next == current {
            return next;
        }
        current = next;
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.replace(ELLIPSIS, "...")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" .", ".")
}

/// Produces a teaser of at most `max_length` characters (ellipsis excluded)
/// from rendered HTML. The cut backs off to the last space so that words are
/// kept whole; a single word longer than `max_length` is cut hard.
/// Punctuation attached to the last kept word stays, so a cut after
/// `Hello world,` yields `Hello world,…`.
pub fn summarize(html: &str, max_length: usize) -> String {
    if max_length == 0 {
        return String::new();
    }

    let text = normalize_whitespace(&strip_markup(html));
    let chars: Vec<char> = text.chars().collect();

    let cut = if chars.len() <= max_length || chars[max_length] == ' ' {
        chars.len().min(max_length)
    } else {
        chars[..max_length]
            .iter()
            .rposition(|c| *c == ' ')
            .unwrap_or(max_length)
    };

    let summary: String = chars[..cut].iter().collect();
    let summary = summary.trim();
    if summary.is_empty() {
        return String::new();
    }
    format!("{}{}", summary, ELLIPSIS)
}
