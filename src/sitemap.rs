//! Sitemap generation. The document is small and flat, so it is written
//! directly as text.

use crate::htmlrenderer::EscapeHtml;
use crate::page::PageArticle;
use crate::url::to_link;
use chrono::NaiveDate;
use std::fmt;
use std::path::Path;
use tracing::debug;
use url::Url;

/// The output location of the sitemap.
pub const SITEMAP_FILE: &str = "sitemap.xml";

const LASTMOD_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeFreq {
    Monthly,
    Yearly,
}

impl ChangeFreq {
    fn as_str(self) -> &'static str {
        match self {
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
        }
    }
}

/// A sitemap URL entry.
#[derive(Debug, Clone)]
struct SitemapUrl {
    loc: String,
    lastmod: Option<NaiveDate>,
    changefreq: ChangeFreq,
    priority: f32,
}

/// Builds the sitemap. Index pages are refreshed monthly and stamped with
/// `today`; articles carry their publication date; every other listing
/// (categories, calendar years) gets the lowest priority and no date.
pub fn build_sitemap(
    site_root: &Url,
    index_pages: &[&Path],
    article_pages: &[&PageArticle],
    other_pages: &[&Path],
    today: NaiveDate,
) -> String {
    let loc = |location: &Path| format!("{}{}", site_root, to_link(location));

    let mut urls = Vec::with_capacity(index_pages.len() + article_pages.len() + other_pages.len());
    urls.extend(index_pages.iter().map(|&location| SitemapUrl {
        loc: loc(location),
        lastmod: Some(today),
        changefreq: ChangeFreq::Monthly,
        priority: 1.0,
    }));
    urls.extend(article_pages.iter().map(|page| SitemapUrl {
        loc: loc(page.page.location.as_path()),
        lastmod: page.article.date(),
        changefreq: ChangeFreq::Yearly,
        priority: 0.6,
    }));
    urls.extend(other_pages.iter().map(|&location| SitemapUrl {
        loc: loc(location),
        lastmod: None,
        changefreq: ChangeFreq::Yearly,
        priority: 0.1,
    }));
    debug!(count = urls.len(), "generating sitemap");

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for url in &urls {
        xml.push_str(&url.to_string());
    }
    xml.push_str("</urlset>\n");
    xml
}

impl fmt::Display for SitemapUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  <url>")?;
        writeln!(f, "    <loc>{}</loc>", EscapeHtml(&self.loc))?;
        if let Some(lastmod) = self.lastmod {
            writeln!(f, "    <lastmod>{}</lastmod>", lastmod.format(LASTMOD_FORMAT))?;
        }
        writeln!(f, "    <changefreq>{}</changefreq>", self.changefreq.as_str())?;
        writeln!(f, "    <priority>{:.1}</priority>", self.priority)?;
        writeln!(f, "  </url>")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::article::Article;
    use crate::page::Page;
    use crate::template::Bindings;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_build_sitemap() {
        let article = Article::new(
            "Hello World",
            NaiveDate::from_ymd_opt(2024, 3, 5),
            "Jane Doe",
            "Text.\n",
            Vec::new(),
        );
        let page = PageArticle {
            article: &article,
            page: Page::new("articles/2024/03/hello_world.html", String::new()),
            summary: String::new(),
            content: String::new(),
            snippet: String::new(),
            item_bindings: Bindings::new(),
        };
        let site_root = Url::parse("https://example.com/").unwrap();
        let category = PathBuf::from("categories/c-&-go.html");

        let xml = build_sitemap(
            &site_root,
            &[Path::new("index.html")],
            &[&page],
            &[category.as_path()],
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        );
        assert_eq!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/index.html</loc>
    <lastmod>2024-04-01</lastmod>
    <changefreq>monthly</changefreq>
    <priority>1.0</priority>
  </url>
  <url>
    <loc>https://example.com/articles/2024/03/hello_world.html</loc>
    <lastmod>2024-03-05</lastmod>
    <changefreq>yearly</changefreq>
    <priority>0.6</priority>
  </url>
  <url>
    <loc>https://example.com/categories/c-&amp;-go.html</loc>
    <changefreq>yearly</changefreq>
    <priority>0.1</priority>
  </url>
</urlset>
"#,
            xml
        );
    }
}
