//! Assembles the listing pages: the main and drafts indexes, one page per
//! category, the combined categories listing and the yearly calendar pages.
//!
//! Every listing is the concatenation of its articles' snippets, newest
//! first, between a header and a footer. Page-level placeholders are
//! substituted last, which also resolves the relative root links the
//! snippets carry.

use crate::article::Kind;
use crate::category::{Category, CATEGORIES_DIRECTORY};
use crate::config::Config;
use crate::page::{Page, PageArticle};
use crate::render::category_link;
use crate::template::{populate, Bindings, CategoriesTemplate, Placeholder, Templates};
use crate::url::{relative_root, to_link};
use chrono::Datelike;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

const CALENDAR_INDEX: &str = "index.html";

/// The page-level values of one listing.
#[derive(Default)]
struct Scope {
    title: String,
    category_title: String,
    category_id: String,

    /// Relative to the output root; empty when the listing has no category.
    category_link: String,

    /// Relative to the output root.
    parent: String,
}

pub struct IndexBuilder<'a> {
    config: &'a Config,
    templates: &'a Templates,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(config: &'a Config, templates: &'a Templates) -> IndexBuilder<'a> {
        IndexBuilder { config, templates }
    }

    /// The root listing of every article of `kind`.
    pub fn kind_index(&self, kind: Kind, pages: &[&PageArticle]) -> Page {
        self.listing(
            PathBuf::from(kind.index_file()),
            pages,
            Scope {
                title: self.config.title.clone(),
                parent: Kind::Public.index_file().to_owned(),
                ..Scope::default()
            },
        )
    }

    /// One page per category, in identifier order, listing the public
    /// articles carrying that keyword.
    pub fn category_pages(
        &self,
        categories: &BTreeMap<String, Category>,
        public: &[&PageArticle],
    ) -> Vec<Page> {
        let parent = match self.templates.categories {
            Some(_) => categories_index_location(),
            None => PathBuf::from(Kind::Public.index_file()),
        };
        categories
            .values()
            .map(|category| {
                let members = members(category, public);
                self.listing(
                    category.location.clone(),
                    &members,
                    Scope {
                        title: category.name.clone(),
                        category_title: category.name.clone(),
                        category_id: category.id.clone(),
                        category_link: category_link(&category.id, self.config.category_links),
                        parent: to_link(&parent),
                    },
                )
            })
            .collect()
    }

    /// The combined listing of every category and its articles, or `None`
    /// when the template set has no categories fragment.
    pub fn categories_index(
        &self,
        categories: &BTreeMap<String, Category>,
        public: &[&PageArticle],
    ) -> Option<Page> {
        let template = self.templates.categories.as_ref()?;
        let mut body = template.page.header.clone();
        for category in categories.values() {
            body.push_str(&self.category_block(template, category, public));
        }
        body.push_str(&template.page.footer);

        Some(self.finish(
            categories_index_location(),
            body,
            Scope {
                title: self.config.title.clone(),
                parent: Kind::Public.index_file().to_owned(),
                ..Scope::default()
            },
        ))
    }

    fn category_block(
        &self,
        template: &CategoriesTemplate,
        category: &Category,
        public: &[&PageArticle],
    ) -> String {
        let bindings = Bindings::new()
            .with(Placeholder::CategoryTitle, category.name.as_str())
            .with(Placeholder::CategoryId, category.id.as_str())
            .with(
                Placeholder::CategoryLink,
                format!(
                    "{}{}",
                    Placeholder::RelativeRootLink.token(),
                    category_link(&category.id, self.config.category_links)
                ),
            );

        let mut block = populate(&template.category.header, &bindings);
        for page in members(category, public).iter().rev() {
            let mut item_bindings = page.item_bindings.clone();
            item_bindings
                .set(Placeholder::CategoryTitle, category.name.as_str())
                .set(Placeholder::CategoryId, category.id.as_str());
            block.push_str(&populate(&template.category.item, &item_bindings));
        }
        block.push_str(&populate(&template.category.footer, &bindings));
        block
    }

    /// One page per publication year, at `{year}/index.html`.
    pub fn calendar_pages(&self, public: &[&PageArticle]) -> Vec<Page> {
        let mut years: BTreeMap<i32, Vec<&PageArticle>> = BTreeMap::new();
        for &page in public {
            if let Some(date) = page.article.date() {
                years.entry(date.year()).or_default().push(page);
            }
        }

        years
            .into_iter()
            .map(|(year, pages)| {
                let year = year.to_string();
                let location = PathBuf::from(&year).join(CALENDAR_INDEX);
                self.listing(
                    location,
                    &pages,
                    Scope {
                        title: year.clone(),
                        category_title: year.clone(),
                        category_link: format!("{}/{}", year, CALENDAR_INDEX),
                        category_id: year,
                        parent: Kind::Public.index_file().to_owned(),
                    },
                )
            })
            .collect()
    }

    /// Wraps the snippets of `pages`, newest first, in the index fragment.
    fn listing(&self, location: PathBuf, pages: &[&PageArticle], scope: Scope) -> Page {
        let body = self
            .templates
            .index
            .wrap(pages.iter().rev().map(|page| page.snippet.as_str()));
        self.finish(location, body, scope)
    }

    fn finish(&self, location: PathBuf, body: String, scope: Scope) -> Page {
        let root = relative_root(&location);
        let category_link = match scope.category_link.as_str() {
            "" => String::new(),
            link => format!("{}{}", root, link),
        };
        let bindings = Bindings::new()
            .with(Placeholder::Title, scope.title)
            .with(Placeholder::BlogTitle, self.config.title.as_str())
            .with(Placeholder::Author, self.config.author.as_str())
            .with(Placeholder::RootLink, self.config.site_root.as_str())
            .with(Placeholder::RelativeRootLink, root.as_str())
            .with(Placeholder::ParentLink, format!("{}{}", root, scope.parent))
            .with(Placeholder::CategoryTitle, scope.category_title)
            .with(Placeholder::CategoryId, scope.category_id)
            .with(Placeholder::CategoryLink, category_link);

        debug!(location = %location.display(), "built listing");
        Page::new(location, populate(&body, &bindings))
    }
}

/// The location of the combined categories listing.
pub fn categories_index_location() -> PathBuf {
    PathBuf::from(CATEGORIES_DIRECTORY).join("index.html")
}

fn members<'p, 'a>(category: &Category, public: &[&'p PageArticle<'a>]) -> Vec<&'p PageArticle<'a>> {
    public
        .iter()
        .copied()
        .filter(|page| page.article.keywords().iter().any(|k| k.id == category.id))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::article::Article;
    use crate::category::{self, Keyword};
    use crate::render::ArticleRenderer;
    use crate::template::Section;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn config() -> Config {
        Config::default_for(Path::new("/blog"))
    }

    fn templates(categories: bool) -> Templates {
        Templates {
            article: "{#CONTENT}".to_owned(),
            index: Section {
                header: "<h1>{#TITLE}</h1><a href=\"{#PARENT_LINK}\">up</a><ul>".to_owned(),
                item: "<li><a href=\"{#LINK}\">{#TITLE}</a></li>".to_owned(),
                footer: "</ul>{#CATEGORY_ID}".to_owned(),
            },
            categories: if categories {
                Some(CategoriesTemplate {
                    page: Section {
                        header: "<dl>".to_owned(),
                        item: String::new(),
                        footer: "</dl>".to_owned(),
                    },
                    category: Section {
                        header: "<dt id=\"{#CATEGORY_ID}\">{#CATEGORY_TITLE}</dt>".to_owned(),
                        item: "<dd><a href=\"{#LINK}\">{#TITLE}</a></dd>".to_owned(),
                        footer: String::new(),
                    },
                })
            } else {
                None
            },
            syntax: None,
        }
    }

    fn articles() -> Vec<Article> {
        vec![
            Article::new(
                "First",
                NaiveDate::from_ymd_opt(2023, 12, 1),
                "A",
                "One.\n",
                Keyword::parse_list("Go"),
            ),
            Article::new(
                "Second",
                NaiveDate::from_ymd_opt(2024, 1, 2),
                "A",
                "Two.\n",
                Keyword::parse_list("go , Rust"),
            ),
            Article::new(
                "Third",
                NaiveDate::from_ymd_opt(2024, 2, 3),
                "A",
                "Three.\n",
                Keyword::parse_list("Rust"),
            ),
        ]
    }

    #[test]
    fn test_main_index_is_newest_first() {
        let (config, templates, articles) = (config(), templates(false), articles());
        let mut renderer = ArticleRenderer::new(&config, &templates);
        let pages: Vec<PageArticle> = articles.iter().map(|a| renderer.render(a)).collect();
        let public: Vec<&PageArticle> = pages.iter().collect();

        let index = IndexBuilder::new(&config, &templates).kind_index(Kind::Public, &public);
        assert_eq!(PathBuf::from("index.html"), index.location);
        assert_eq!(
            "<h1>A new blog</h1><a href=\"index.html\">up</a><ul>\
             <li><a href=\"articles/2024/02/third.html\">Third</a></li>\
             <li><a href=\"articles/2024/01/second.html\">Second</a></li>\
             <li><a href=\"articles/2023/12/first.html\">First</a></li>\
             </ul>",
            index.html
        );
    }

    #[test]
    fn test_category_pages_merge_spellings() {
        let (config, templates, articles) = (config(), templates(false), articles());
        let mut renderer = ArticleRenderer::new(&config, &templates);
        let pages: Vec<PageArticle> = articles.iter().map(|a| renderer.render(a)).collect();
        let public: Vec<&PageArticle> = pages.iter().collect();
        let categories = category::collect(articles.iter().map(Article::keywords));

        let built = IndexBuilder::new(&config, &templates).category_pages(&categories, &public);
        let locations: Vec<PathBuf> = built.iter().map(|p| p.location.clone()).collect();
        assert_eq!(
            vec![
                PathBuf::from("categories/go.html"),
                PathBuf::from("categories/rust.html")
            ],
            locations
        );
        assert_eq!(
            "<h1>Go</h1><a href=\"../index.html\">up</a><ul>\
             <li><a href=\"../articles/2024/01/second.html\">Second</a></li>\
             <li><a href=\"../articles/2023/12/first.html\">First</a></li>\
             </ul>go",
            built[0].html
        );
    }

    #[test]
    fn test_categories_index() {
        let (config, templates, articles) = (config(), templates(true), articles());
        let mut renderer = ArticleRenderer::new(&config, &templates);
        let pages: Vec<PageArticle> = articles.iter().map(|a| renderer.render(a)).collect();
        let public: Vec<&PageArticle> = pages.iter().collect();
        let categories = category::collect(articles.iter().map(Article::keywords));
        let builder = IndexBuilder::new(&config, &templates);

        let listing = builder.categories_index(&categories, &public).unwrap();
        assert_eq!(categories_index_location(), listing.location);
        assert_eq!(
            "<dl><dt id=\"go\">Go</dt>\
             <dd><a href=\"../articles/2024/01/second.html\">Second</a></dd>\
             <dd><a href=\"../articles/2023/12/first.html\">First</a></dd>\
             <dt id=\"rust\">Rust</dt>\
             <dd><a href=\"../articles/2024/02/third.html\">Third</a></dd>\
             <dd><a href=\"../articles/2024/01/second.html\">Second</a></dd>\
             </dl>",
            listing.html
        );

        // Category pages point back at the listing once it exists.
        let go = &builder.category_pages(&categories, &public)[0];
        assert!(go.html.contains("<a href=\"../categories/index.html\">up</a>"));

        let without = self::templates(false);
        assert!(IndexBuilder::new(&config, &without)
            .categories_index(&categories, &public)
            .is_none());
    }

    #[test]
    fn test_calendar_pages_group_by_year() {
        let (config, templates, articles) = (config(), templates(false), articles());
        let mut renderer = ArticleRenderer::new(&config, &templates);
        let pages: Vec<PageArticle> = articles.iter().map(|a| renderer.render(a)).collect();
        let public: Vec<&PageArticle> = pages.iter().collect();

        let years = IndexBuilder::new(&config, &templates).calendar_pages(&public);
        assert_eq!(2, years.len());
        assert_eq!(PathBuf::from("2023/index.html"), years[0].location);
        assert_eq!(PathBuf::from("2024/index.html"), years[1].location);
        assert_eq!(
            "<h1>2024</h1><a href=\"../index.html\">up</a><ul>\
             <li><a href=\"../articles/2024/02/third.html\">Third</a></li>\
             <li><a href=\"../articles/2024/01/second.html\">Second</a></li>\
             </ul>2024",
            years[1].html
        );
    }
}
