//! Exports the [`Generator`] which stitches together the high-level steps of
//! building the output site: rendering every article ([`crate::render`]),
//! writing article and draft pages, assembling the listings
//! ([`crate::index`]) along with the feed and the sitemap, and copying the
//! static resources. Every page goes through [`crate::write::save_page`], so
//! unchanged output is never rewritten.

use crate::article::{Article, Kind};
use crate::category;
use crate::config::Config;
use crate::feed::{self, build_feed, FeedConfig, FEED_FILE};
use crate::index::IndexBuilder;
use crate::page::{Page, PageArticle};
use crate::render::ArticleRenderer;
use crate::sitemap::{build_sitemap, SITEMAP_FILE};
use crate::template::{self, Templates, FRAGMENT_FILES};
use crate::util::{copy_item, rmdir};
use crate::write::{save_page, Saved};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::ops::BitOr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Selects which parts of the site a run (re)generates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mode(u8);

impl Mode {
    pub const ARTICLES: Mode = Mode(1);
    pub const DRAFTS: Mode = Mode(2);
    pub const INDEX: Mode = Mode(4);
    pub const RESOURCES: Mode = Mode(8);

    /// Rewrites pages and copies files even when the output is up to date.
    pub const FORCE: Mode = Mode(16);

    pub const ALL: Mode = Mode(1 | 2 | 4 | 8);

    pub fn contains(self, other: Mode) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn without(self, other: Mode) -> Mode {
        Mode(self.0 & !other.0)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::ALL
    }
}

impl BitOr for Mode {
    type Output = Mode;

    fn bitor(self, other: Mode) -> Mode {
        Mode(self.0 | other.0)
    }
}

/// What a run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Public article pages written.
    pub articles: usize,

    /// Draft pages written.
    pub drafts: usize,

    /// Listing pages, the feed and the sitemap written.
    pub indexes: usize,

    /// Local media files in place next to article and draft pages, copied
    /// in this run or already up to date.
    pub assets: usize,

    /// Pages left alone because their content did not change.
    pub skipped: usize,

    /// Pages and assets that failed to write or copy.
    pub failures: usize,

    /// Whether the resources directory was copied without failures.
    pub resources: bool,
}

impl Report {
    /// Tallies a saved page as skipped or failed, returning whether it was
    /// written.
    fn record(&mut self, saved: Saved) -> bool {
        if saved.failed {
            self.failures += 1;
        } else if !saved.written {
            self.skipped += 1;
        }
        saved.written
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} articles, {} drafts, {} index pages written ({} assets, {} pages skipped, {} failures)",
            self.articles, self.drafts, self.indexes, self.assets, self.skipped, self.failures
        )
    }
}

/// Generates a site from a [`Config`]. Constructing one loads the template
/// set; a missing or malformed required template is fatal.
pub struct Generator<'a> {
    config: &'a Config,
    templates: Templates,
}

impl<'a> Generator<'a> {
    /// Loads the templates and copies the theme files (everything in the
    /// template directory that is not a fragment) to the output root.
    pub fn new(config: &'a Config) -> Result<Generator<'a>> {
        let templates = Templates::load(&config.template_directory)?;
        let generator = Generator { config, templates };
        generator.copy_theme();
        Ok(generator)
    }

    fn copy_theme(&self) {
        let entries = match fs::read_dir(&self.config.template_directory) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    dir = %self.config.template_directory.display(),
                    "listing template directory: {}", err
                );
                return;
            }
        };
        for entry in entries.filter_map(|entry| entry.ok()) {
            let name = entry.file_name();
            if FRAGMENT_FILES.iter().any(|fragment| name == *fragment) {
                continue;
            }
            copy_item(
                &entry.path(),
                &self.config.output_directory.join(&name),
                false,
            );
        }
    }

    /// Runs the parts of the pipeline selected by `mode`. `articles` must be
    /// in chronological order, as returned by
    /// [`crate::article::Loader::load_articles`].
    pub fn generate(&self, articles: &[Article], mode: Mode) -> Result<Report> {
        self.generate_at(articles, mode, Utc::now())
    }

    /// Like [`Generator::generate`], with an explicit build time for the
    /// feed and the sitemap.
    pub fn generate_at(
        &self,
        articles: &[Article],
        mode: Mode,
        now: DateTime<Utc>,
    ) -> Result<Report> {
        let force = mode.contains(Mode::FORCE);
        let output = &self.config.output_directory;
        let mut report = Report::default();

        let mut renderer = ArticleRenderer::new(self.config, &self.templates);
        let pages: Vec<PageArticle> = articles.iter().map(|a| renderer.render(a)).collect();
        warn_collisions(&pages);
        let (public, drafts): (Vec<&PageArticle>, Vec<&PageArticle>) = pages
            .iter()
            .partition(|page| page.article.kind() == Kind::Public);
        info!(
            articles = public.len(),
            drafts = drafts.len(),
            "rendered articles"
        );

        if mode.contains(Mode::ARTICLES) {
            let written = self.write_articles(Kind::Public, &public, force, &mut report)?;
            report.articles = written;
        }
        if mode.contains(Mode::DRAFTS) {
            let written = self.write_articles(Kind::Draft, &drafts, force, &mut report)?;
            report.drafts = written;
        }

        if mode.contains(Mode::INDEX) {
            let listings = self.listings(&public, &drafts, now)?;
            let mut written = 0;
            for page in &listings {
                if report.record(save_page(page, output, force)) {
                    written += 1;
                }
            }
            info!(written, total = listings.len(), "wrote index pages");
            report.indexes = written;
        }

        if mode.contains(Mode::RESOURCES) {
            let resources = &self.config.resources_directory;
            report.resources = if resources.is_dir() {
                copy_item(resources, output, force)
            } else {
                debug!(dir = %resources.display(), "no resources directory");
                true
            };
            info!(ok = report.resources, "copied resources");
        }

        Ok(report)
    }

    /// Writes the pages of one kind, returning how many were written.
    fn write_articles(
        &self,
        kind: Kind,
        pages: &[&PageArticle],
        force: bool,
        report: &mut Report,
    ) -> Result<usize> {
        let output = &self.config.output_directory;
        if force {
            let dir = output.join(kind.directory());
            rmdir(&dir).map_err(|err| Error::Clean { path: dir, err })?;
        }

        let mut written = 0;
        for page in pages {
            let saved = save_page(&page.page, output, force);
            report.assets += saved.assets;
            report.failures += saved.asset_failures;
            if report.record(saved) {
                written += 1;
            }
        }
        info!(kind = kind.directory(), written, total = pages.len(), "wrote pages");
        Ok(written)
    }

    /// Every listing page plus the feed and the sitemap.
    fn listings(
        &self,
        public: &[&PageArticle],
        drafts: &[&PageArticle],
        now: DateTime<Utc>,
    ) -> Result<Vec<Page>> {
        let builder = IndexBuilder::new(self.config, &self.templates);
        // Keywords used only by drafts stay unpublished.
        let categories = category::collect(public.iter().map(|page| page.article.keywords()));

        let mut index_pages = vec![
            builder.kind_index(Kind::Public, public),
            builder.kind_index(Kind::Draft, drafts),
        ];
        if let Some(listing) = builder.categories_index(&categories, public) {
            index_pages.push(listing);
        }
        let mut other_pages = builder.category_pages(&categories, public);
        if self.config.calendar_pages {
            other_pages.extend(builder.calendar_pages(public));
        }

        let description = format!("{}, a blog by {}.", self.config.title, self.config.author);
        let feed = build_feed(
            &FeedConfig {
                title: &self.config.title,
                description: &description,
                site_root: &self.config.site_root,
            },
            public,
            self.config.rss_count,
            now,
        )?;

        // The drafts index stays out of the sitemap.
        let sitemap_index: Vec<&Path> = index_pages
            .iter()
            .map(|page| page.location.as_path())
            .filter(|location| *location != Path::new(Kind::Draft.index_file()))
            .collect();
        let sitemap_other: Vec<&Path> = other_pages
            .iter()
            .map(|page| page.location.as_path())
            .collect();
        let sitemap = build_sitemap(
            &self.config.site_root,
            &sitemap_index,
            public,
            &sitemap_other,
            now.naive_utc().date(),
        );
        debug!(categories = categories.len(), "built listings");

        let mut pages = index_pages;
        pages.extend(other_pages);
        pages.push(Page::new(FEED_FILE, feed));
        pages.push(Page::new(SITEMAP_FILE, sitemap));
        Ok(pages)
    }
}

/// Checks that the template directory holds a usable template set without
/// building anything.
pub fn check_templates(dir: &Path) -> Result<()> {
    Templates::load(dir)?;
    Ok(())
}

/// The result of a generation run.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for generating a site. Only problems that make the whole
/// run meaningless end up here; individual pages that fail to write are
/// logged and counted instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the template set cannot be loaded.
    #[error(transparent)]
    Template(#[from] template::Error),

    /// Returned for I/O problems while cleaning output directories.
    #[error("cleaning directory `{}`: {err}", .path.display())]
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned when the feed cannot be built.
    #[error(transparent)]
    Feed(#[from] feed::Error),
}

// Articles whose sanitized titles match within a month share a location;
// the one written last wins.
fn warn_collisions(pages: &[PageArticle]) {
    let mut seen = HashSet::new();
    for page in pages {
        if !seen.insert(page.page.location.as_path()) {
            warn!(
                location = %page.page.location.display(),
                title = page.article.title(),
                "article overwrites another article at the same location"
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::article::Loader;
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_mode_bits() {
        let mode = Mode::ALL.without(Mode::ARTICLES | Mode::RESOURCES) | Mode::FORCE;
        assert!(mode.contains(Mode::DRAFTS));
        assert!(mode.contains(Mode::INDEX));
        assert!(mode.contains(Mode::FORCE));
        assert!(!mode.contains(Mode::ARTICLES));
        assert!(!mode.contains(Mode::RESOURCES));
        assert!(!Mode::ALL.contains(Mode::FORCE));
    }

    /// Copies `testdata/` into a scratch project.
    fn project() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let testdata = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata");
        assert!(copy_item(&testdata, dir.path(), true));
        let config = Config::from_project_file(&dir.path().join("quire.yaml")).unwrap();
        (dir, config)
    }

    fn now() -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 4, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        )
    }

    fn load(config: &Config) -> Vec<Article> {
        Loader::new(&config.date_format, &config.author).load_articles(&config.articles_directory)
    }

    #[test]
    fn test_generate_site() {
        let (_dir, config) = project();
        let articles = load(&config);
        let generator = Generator::new(&config).unwrap();
        let report = generator.generate_at(&articles, Mode::ALL, now()).unwrap();

        assert_eq!(2, report.articles);
        assert_eq!(1, report.drafts);
        assert_eq!(1, report.assets);
        assert_eq!(0, report.failures);
        assert!(report.resources);

        let out = &config.output_directory;
        for file in &[
            "index.html",
            "index-drafts.html",
            "feed.xml",
            "sitemap.xml",
            "categories/index.html",
            "categories/go.html",
            "categories/rust.html",
            "2024/index.html",
            "articles/2024/03/hello_world.html",
            "articles/2024/03/hello_world/ferris.png",
            "articles/2024/02/getting_started.html",
            "drafts/my_draft.html",
            "style.css",
            "robots.txt",
        ] {
            assert!(out.join(file).is_file(), "missing {}", file);
        }
        assert!(!out.join("article.html").exists());
        assert!(!out.join("categories/secret_plans.html").exists());

        let index = fs::read_to_string(out.join("index.html")).unwrap();
        let newer = index.find("Hello World").unwrap();
        let older = index.find("Getting Started").unwrap();
        assert!(newer < older);
        assert!(!index.contains("My Draft"));
        assert!(index.contains("href=\"articles/2024/03/hello_world.html\""));

        let go = fs::read_to_string(out.join("categories/go.html")).unwrap();
        assert!(go.contains("href=\"../articles/2024/03/hello_world.html\""));
        assert!(go.contains("href=\"../articles/2024/02/getting_started.html\""));

        let article = fs::read_to_string(out.join("articles/2024/03/hello_world.html")).unwrap();
        assert!(article.contains("src=\"hello_world/ferris.png\""));
        assert!(article.contains("<link rel=\"stylesheet\" href=\"../../../highlight.css\"></head>"));
        assert!(article.contains("href=\"../../../categories/go.html\""));

        let sitemap = fs::read_to_string(out.join("sitemap.xml")).unwrap();
        assert!(sitemap.contains("<loc>https://blog.example.com/articles/2024/03/hello_world.html</loc>"));
        assert!(!sitemap.contains("my_draft"));
        assert!(!sitemap.contains("index-drafts.html"));
        assert!(!sitemap.contains("secret_plans"));

        let categories = fs::read_to_string(out.join("categories/index.html")).unwrap();
        assert!(categories.contains("id=\"rust\""));
        assert!(!categories.contains("Secret Plans"));

        let feed = fs::read_to_string(out.join("feed.xml")).unwrap();
        assert_eq!(2, feed.matches("<item>").count());
        assert!(!feed.contains("My Draft"));
        assert!(feed.contains("<description>Test Blog, a blog by Jane Doe.</description>"));
    }

    #[test]
    fn test_regenerate_skips_unchanged_pages() {
        let (_dir, config) = project();
        let articles = load(&config);
        let generator = Generator::new(&config).unwrap();
        generator.generate_at(&articles, Mode::ALL, now()).unwrap();

        let again = generator.generate_at(&articles, Mode::ALL, now()).unwrap();
        assert_eq!(0, again.articles);
        assert_eq!(0, again.drafts);
        assert_eq!(0, again.indexes);
        assert_eq!(1, again.assets);
        assert_eq!(0, again.failures);

        let forced = generator
            .generate_at(&articles, Mode::ALL | Mode::FORCE, now())
            .unwrap();
        assert_eq!(2, forced.articles);
        assert_eq!(1, forced.drafts);
    }

    #[test]
    fn test_missing_asset_is_a_failure() {
        let (_dir, config) = project();
        fs::remove_file(config.articles_directory.join("ferris.png")).unwrap();
        let articles = load(&config);
        let report = Generator::new(&config)
            .unwrap()
            .generate_at(&articles, Mode::ALL, now())
            .unwrap();

        assert_eq!(2, report.articles);
        assert_eq!(0, report.assets);
        assert_eq!(1, report.failures);
        assert!(!config
            .output_directory
            .join("articles/2024/03/hello_world/ferris.png")
            .exists());
    }

    #[test]
    fn test_drafts_only() {
        let (_dir, config) = project();
        let articles = load(&config);
        let mode = Mode::ALL.without(Mode::ARTICLES | Mode::RESOURCES | Mode::INDEX) | Mode::DRAFTS;
        let report = Generator::new(&config)
            .unwrap()
            .generate_at(&articles, mode, now())
            .unwrap();
        assert_eq!(0, report.articles);
        assert_eq!(1, report.drafts);
        assert!(config.output_directory.join("drafts/my_draft.html").is_file());
        assert!(!config.output_directory.join("index.html").exists());
    }

    #[test]
    fn test_missing_templates_are_fatal() {
        let dir = TempDir::new().unwrap();
        let config = Config::default_for(dir.path());
        assert!(matches!(
            Generator::new(&config),
            Err(Error::Template(template::Error::Read { .. }))
        ));
        assert!(check_templates(&config.template_directory).is_err());
    }
}
