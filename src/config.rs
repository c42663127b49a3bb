//! Loads the `quire.yaml` project file. Every field is optional; directory
//! paths are resolved against the directory containing the project file.

use crate::util::open;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// The project file name searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "quire.yaml";

/// Where keyword links on article pages point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryLinks {
    /// `categories/{id}.html`
    Page,

    /// `categories/index.html#{id}`
    Anchor,
}

impl Default for CategoryLinks {
    fn default() -> Self {
        CategoryLinks::Page
    }
}

#[derive(Deserialize, Serialize)]
#[serde(default)]
struct Paths {
    articles: PathBuf,
    template: PathBuf,
    output: PathBuf,
    resources: PathBuf,

    /// Where `upload` mirrors the output, typically a mounted share.
    upload: Option<PathBuf>,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            articles: PathBuf::from("articles"),
            template: PathBuf::from("template"),
            output: PathBuf::from("output"),
            resources: PathBuf::from("resources"),
            upload: None,
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(default)]
struct Project {
    title: String,
    author: String,
    site_root: Url,
    date_format: String,
    image_width: String,
    images_link: bool,
    rss_count: usize,
    summary_length: usize,
    calendar_pages: bool,
    category_links: CategoryLinks,
    table_of_contents: bool,
    paths: Paths,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            title: String::from("A new blog"),
            author: String::from("John Appleseed"),
            site_root: default_site_root(),
            date_format: String::from("%m/%d/%Y"),
            image_width: String::from("640"),
            images_link: false,
            rss_count: 10,
            summary_length: 400,
            calendar_pages: false,
            category_links: CategoryLinks::default(),
            table_of_contents: false,
            paths: Paths::default(),
        }
    }
}

fn default_site_root() -> Url {
    Url::parse("http://localhost/").unwrap() // should always succeed
}

/// The resolved settings for one generation run.
#[derive(Clone, Debug)]
pub struct Config {
    pub project_file: PathBuf,
    pub articles_directory: PathBuf,
    pub template_directory: PathBuf,
    pub output_directory: PathBuf,
    pub resources_directory: PathBuf,
    pub upload_directory: Option<PathBuf>,

    pub title: String,
    pub author: String,

    /// The absolute URL of the site; always ends with `/`.
    pub site_root: Url,

    /// The `chrono` format of article date lines (and of `{#DATE}`).
    pub date_format: String,

    pub image_width: String,
    pub images_link: bool,
    pub rss_count: usize,
    pub summary_length: usize,
    pub calendar_pages: bool,
    pub category_links: CategoryLinks,
    pub table_of_contents: bool,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for a project file.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)
            .with_context(|| format!("Loading configuration `{}`", path.display()))?;
        let root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{}'",
                path.display()
            )
        })?;
        Ok(Config::resolve(project, root, path))
    }

    fn resolve(project: Project, root: &Path, project_file: &Path) -> Config {
        Config {
            project_file: project_file.to_owned(),
            articles_directory: root.join(&project.paths.articles),
            template_directory: root.join(&project.paths.template),
            output_directory: root.join(&project.paths.output),
            resources_directory: root.join(&project.paths.resources),
            upload_directory: project.paths.upload.as_ref().map(|dir| root.join(dir)),
            title: project.title,
            author: project.author,
            site_root: with_trailing_slash(project.site_root),
            date_format: project.date_format,
            image_width: project.image_width,
            images_link: project.images_link,
            rss_count: project.rss_count,
            summary_length: project.summary_length,
            calendar_pages: project.calendar_pages,
            category_links: project.category_links,
            table_of_contents: project.table_of_contents,
        }
    }

    /// The configuration used when a project file sets nothing, rooted at
    /// `root`.
    pub fn default_for(root: &Path) -> Config {
        Config::resolve(Project::default(), root, &root.join(PROJECT_FILE))
    }

    /// Creates a new project in `root`: a default project file and the
    /// articles, template, output and resources directories. Refuses to
    /// overwrite an existing project file.
    pub fn write_default(root: &Path) -> Result<Config> {
        let path = root.join(PROJECT_FILE);
        if path.exists() {
            return Err(anyhow!(
                "Unable to set up, project file already exists at `{}`",
                path.display()
            ));
        }
        let config = Config::default_for(root);
        for dir in &[
            &config.articles_directory,
            &config.template_directory,
            &config.output_directory,
            &config.resources_directory,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Creating directory `{}`", dir.display()))?;
        }
        let yaml = serde_yaml::to_string(&Project::default())?;
        fs::write(&path, yaml).with_context(|| format!("Writing `{}`", path.display()))?;
        Ok(config)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "project file:      {}", self.project_file.display())?;
        writeln!(f, "articles:          {}", self.articles_directory.display())?;
        writeln!(f, "template:          {}", self.template_directory.display())?;
        writeln!(f, "output:            {}", self.output_directory.display())?;
        writeln!(f, "resources:         {}", self.resources_directory.display())?;
        match &self.upload_directory {
            Some(dir) => writeln!(f, "upload:            {}", dir.display())?,
            None => writeln!(f, "upload:            (none)")?,
        }
        writeln!(f, "title:             {}", self.title)?;
        writeln!(f, "author:            {}", self.author)?;
        writeln!(f, "site root:         {}", self.site_root)?;
        writeln!(f, "date format:       {}", self.date_format)?;
        writeln!(f, "image width:       {}", self.image_width)?;
        writeln!(f, "images link:       {}", self.images_link)?;
        writeln!(f, "rss items:         {}", self.rss_count)?;
        writeln!(f, "summary length:    {}", self.summary_length)?;
        writeln!(f, "calendar pages:    {}", self.calendar_pages)?;
        writeln!(f, "category links:    {:?}", self.category_links)?;
        write!(f, "table of contents: {}", self.table_of_contents)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_from_project_file_resolves_paths_and_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join(PROJECT_FILE),
            "title: My Blog\nsite_root: https://example.com/blog\ncategory_links: anchor\npaths:\n  output: public\n  upload: /mnt/www\n",
        )?;
        let config = Config::from_project_file(&dir.path().join(PROJECT_FILE))?;
        assert_eq!("My Blog", config.title);
        assert_eq!("John Appleseed", config.author);
        assert_eq!("https://example.com/blog/", config.site_root.as_str());
        assert_eq!(CategoryLinks::Anchor, config.category_links);
        assert_eq!(dir.path().join("public"), config.output_directory);
        assert_eq!(dir.path().join("articles"), config.articles_directory);
        assert_eq!(Some(PathBuf::from("/mnt/www")), config.upload_directory);
        assert_eq!(400, config.summary_length);
        Ok(())
    }

    #[test]
    fn test_from_directory_searches_ancestors() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(PROJECT_FILE), "title: Found\n")?;
        let nested = dir.path().join("articles").join("deeper");
        fs::create_dir_all(&nested)?;
        assert_eq!("Found", Config::from_directory(&nested)?.title);
        Ok(())
    }

    #[test]
    fn test_write_default_creates_project() -> Result<()> {
        let dir = TempDir::new()?;
        let config = Config::write_default(dir.path())?;
        assert!(config.articles_directory.is_dir());
        assert!(config.template_directory.is_dir());
        let reloaded = Config::from_project_file(&dir.path().join(PROJECT_FILE))?;
        assert_eq!(config.title, reloaded.title);
        assert_eq!(None, reloaded.upload_directory);
        assert!(Config::write_default(dir.path()).is_err());
        Ok(())
    }
}
