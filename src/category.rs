//! Defines the [`Keyword`] and [`Category`] types. Keywords are attached to
//! articles; categories are the aggregation buckets built from them.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// The output directory for category pages.
pub const CATEGORIES_DIRECTORY: &str = "categories";

/// A keyword attached to an [`crate::article::Article`]. Keywords are
/// compared by their normalized spelling (trimmed, inner whitespace
/// collapsed, lowercased), so `Go`, `go ` and `GO` are the same keyword
/// while `C`, `C++` and `C#` stay distinct.
#[derive(Clone, Debug)]
pub struct Keyword {
    /// A file- and anchor-safe identifier derived one-to-one from the
    /// normalized spelling. See [`keyword_id`].
    pub id: String,

    /// The name as first spelled in the article header.
    pub name: String,
}

impl Keyword {
    /// Returns `None` for a blank name.
    pub fn new(name: &str) -> Option<Keyword> {
        let name = name.trim();
        let normalized = normalize(name);
        if normalized.is_empty() {
            return None;
        }
        Some(Keyword {
            id: keyword_id(&normalized),
            name: name.to_owned(),
        })
    }

    /// Parses a comma-separated keyword line, dropping duplicates (by id)
    /// while keeping the first spelling.
    pub fn parse_list(line: &str) -> Vec<Keyword> {
        let mut keywords: Vec<Keyword> = Vec::new();
        for keyword in line.split(',').filter_map(Keyword::new) {
            if !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
        keywords
    }
}

impl Hash for Keyword {
    /// Delegates directly to the `id` field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialEq for Keyword {
    /// Delegates directly to the `id` field.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Keyword {}

/// Trims, collapses runs of whitespace into one space and lowercases.
pub fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Maps a normalized keyword to an identifier made of `[a-z0-9_-]`. Names
/// spelled only with lowercase ASCII letters, digits, `-` and spaces map
/// directly, spaces becoming `_`. Any other name is transliterated, stripped
/// to the same character set, and suffixed with a short hash of the
/// normalized spelling, so `c++` and `c#` never share a page with `c`.
pub fn keyword_id(normalized: &str) -> String {
    let plain = normalized
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | ' '));
    if plain {
        return normalized.replace(' ', "_");
    }

    let base: String = deunicode::deunicode(normalized)
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => Some(c),
            ' ' => Some('_'),
            _ => None,
        })
        .collect();
    let hash = blake3::hash(normalized.as_bytes()).to_hex();
    let suffix = &hash.as_str()[..ID_HASH_LENGTH];
    if base.is_empty() {
        suffix.to_owned()
    } else {
        format!("{}-{}", base, suffix)
    }
}

const ID_HASH_LENGTH: usize = 8;

/// An aggregation bucket for every article sharing a keyword identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,

    /// The output location of the category's own page.
    pub location: PathBuf,
}

impl Category {
    pub fn new(keyword: &Keyword) -> Category {
        Category {
            id: keyword.id.clone(),
            name: keyword.name.clone(),
            location: PathBuf::from(CATEGORIES_DIRECTORY).join(format!("{}.html", keyword.id)),
        }
    }
}

/// Collects every distinct category from a set of keyword lists. The map is
/// keyed (and therefore ordered) by identifier.
pub fn collect<'a>(
    keyword_lists: impl IntoIterator<Item = &'a [Keyword]>,
) -> BTreeMap<String, Category> {
    let mut categories = BTreeMap::new();
    for keywords in keyword_lists {
        for keyword in keywords {
            categories
                .entry(keyword.id.clone())
                .or_insert_with(|| Category::new(keyword));
        }
    }
    categories
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keyword_normalization() {
        let go = Keyword::new("Go").unwrap();
        let go_spaced = Keyword::new(" go ").unwrap();
        assert_eq!(go, go_spaced);
        assert_eq!("go", go.id);
        assert_eq!("Go", go.name);
        assert_eq!("web dev", normalize("  Web \t Dev "));
        assert!(Keyword::new("  ").is_none());
    }

    #[test]
    fn test_punctuation_keeps_keywords_distinct() {
        let lists = vec![
            Keyword::parse_list("C"),
            Keyword::parse_list("C++"),
            Keyword::parse_list("C#"),
            Keyword::parse_list("c++ "),
        ];
        let categories = collect(lists.iter().map(Vec::as_slice));
        assert_eq!(3, categories.len());
        for id in categories.keys() {
            assert!(id
                .chars()
                .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_')));
        }
        let cpp = Keyword::new("C++").unwrap();
        assert!(cpp.id.starts_with("c-"));
        assert_eq!("C++", categories[&cpp.id].name);
    }

    #[test]
    fn test_spaces_and_dashes_stay_distinct() {
        let spaced = Keyword::new("Web Dev").unwrap();
        let dashed = Keyword::new("web-dev").unwrap();
        let underscored = Keyword::new("web_dev").unwrap();
        assert_eq!("web_dev", spaced.id);
        assert_eq!("web-dev", dashed.id);
        assert_ne!(spaced.id, underscored.id);
    }

    #[test]
    fn test_parse_list_collapses_duplicates() {
        let keywords = Keyword::parse_list("C++, c++ , Rust,,  ");
        assert_eq!(2, keywords.len());
        assert_eq!("C++", keywords[0].name);
        assert_eq!("rust", keywords[1].id);
    }

    #[test]
    fn test_collect_merges_equivalent_spellings() {
        let first = Keyword::parse_list("Go, Rust");
        let second = Keyword::parse_list("go , Web  Dev");
        let categories = collect(vec![first.as_slice(), second.as_slice()]);
        let ids: Vec<&str> = categories.keys().map(String::as_str).collect();
        assert_eq!(vec!["go", "rust", "web_dev"], ids);
        assert_eq!(
            PathBuf::from("categories/go.html"),
            categories["go"].location
        );
        assert_eq!("Go", categories["go"].name);
    }
}
