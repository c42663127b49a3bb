//! Publishes the output tree by mirroring it to a [`Remote`]. The mirror
//! only sends what the destination does not have yet: existing files are
//! left alone unless the transfer is forced, in which case the destination
//! item is removed and sent again. Listing pages (indexes, the feed, the
//! sitemap, category and calendar pages) change with every new article, so
//! they are always forced.

use crate::article::Kind;
use crate::build::Mode;
use crate::category::CATEGORIES_DIRECTORY;
use crate::feed::FEED_FILE;
use crate::sitemap::SITEMAP_FILE;
use std::fmt;
use std::fs;
use std::io;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A publishing destination. Paths are relative to the destination root.
pub trait Remote {
    /// Fails if the destination cannot be reached.
    fn check(&self) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Removes a file or a whole directory tree.
    fn remove(&mut self, path: &Path) -> io::Result<()>;

    /// Creates a directory and its parents; an existing directory is fine.
    fn create_dir(&mut self, path: &Path) -> io::Result<()>;

    /// Sends the local file `src` to `dst`.
    fn put(&mut self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// A destination directory on a locally mounted file system.
pub struct DirectoryRemote {
    root: PathBuf,
}

impl DirectoryRemote {
    pub fn new(root: impl Into<PathBuf>) -> DirectoryRemote {
        DirectoryRemote { root: root.into() }
    }
}

impl Remote for DirectoryRemote {
    fn check(&self) -> io::Result<()> {
        match fs::metadata(&self.root)?.is_dir() {
            true => Ok(()),
            false => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("`{}` is not a directory", self.root.display()),
            )),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.root.join(path).exists()
    }

    fn remove(&mut self, path: &Path) -> io::Result<()> {
        let path = self.root.join(path);
        match path.is_dir() {
            true => fs::remove_dir_all(path),
            false => fs::remove_file(path),
        }
    }

    fn create_dir(&mut self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(self.root.join(path))
    }

    fn put(&mut self, src: &Path, dst: &Path) -> io::Result<()> {
        fs::copy(src, self.root.join(dst)).map(|_| ())
    }
}

/// What a mirror did, counted in files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transfer {
    pub sent: usize,

    /// Files already present at the destination.
    pub skipped: usize,

    pub failed: usize,
}

impl AddAssign for Transfer {
    fn add_assign(&mut self, other: Transfer) {
        self.sent += other.sent;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} files uploaded, {} already present, {} failures",
            self.sent, self.skipped, self.failed
        )
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Mirrors the local file or directory `src` to `dst` on `remote`. Hidden
/// entries are never sent.
pub fn mirror<R: Remote + ?Sized>(remote: &mut R, src: &Path, dst: &Path, force: bool) -> Transfer {
    let mut transfer = Transfer::default();
    if is_hidden(src) {
        return transfer;
    }
    if !src.exists() {
        warn!(src = %src.display(), "nothing to upload");
        transfer.failed += 1;
        return transfer;
    }
    if force && remote.exists(dst) {
        if let Err(err) = remote.remove(dst) {
            warn!(dst = %dst.display(), "removing remote item failed: {}", err);
            transfer.failed += 1;
            return transfer;
        }
    }

    let entries = WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));
    for result in entries {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!(src = %src.display(), "listing directory: {}", err);
                transfer.failed += 1;
                continue;
            }
        };
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = match relative.as_os_str().is_empty() {
            true => dst.to_owned(),
            false => dst.join(relative),
        };

        let result = if entry.file_type().is_dir() {
            remote.create_dir(&target)
        } else if remote.exists(&target) {
            transfer.skipped += 1;
            continue;
        } else {
            remote.put(entry.path(), &target)
        };
        match result {
            Ok(()) if entry.file_type().is_file() => {
                debug!(dst = %target.display(), "uploaded");
                transfer.sent += 1;
            }
            Ok(()) => {}
            Err(err) => {
                warn!(dst = %target.display(), "upload failed: {}", err);
                transfer.failed += 1;
            }
        }
    }
    transfer
}

/// Whether a top-level output entry is a listing: the indexes, the feed,
/// the sitemap, the categories and the calendar years.
fn is_listing(name: &str) -> bool {
    name == Kind::Public.index_file()
        || name == Kind::Draft.index_file()
        || name == FEED_FILE
        || name == SITEMAP_FILE
        || name == CATEGORIES_DIRECTORY
        || (!name.is_empty() && name.chars().all(|c| c.is_ascii_digit()))
}

/// Uploads the parts of `output` selected by `mode` to the root of
/// `remote`. Article and draft pages, and resources, honor [`Mode::FORCE`].
/// Listings are always sent again.
pub fn upload<R: Remote + ?Sized>(remote: &mut R, output: &Path, mode: Mode) -> Transfer {
    let force = mode.contains(Mode::FORCE);
    let mut transfer = Transfer::default();

    let mut top_level: Vec<String> = match fs::read_dir(output) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(err) => {
            warn!(dir = %output.display(), "reading output directory: {}", err);
            transfer.failed += 1;
            return transfer;
        }
    };
    top_level.sort();

    if mode.contains(Mode::INDEX) {
        let mut listings = Transfer::default();
        for name in top_level.iter().filter(|name| is_listing(name)) {
            listings += mirror(remote, &output.join(name), Path::new(name), true);
        }
        info!(?listings, "uploaded index pages");
        transfer += listings;
    }

    for kind in [Kind::Public, Kind::Draft].iter().copied() {
        let selected = match kind {
            Kind::Public => Mode::ARTICLES,
            Kind::Draft => Mode::DRAFTS,
        };
        if !mode.contains(selected) {
            continue;
        }
        let dir = kind.directory();
        let pages = match output.join(dir).exists() {
            true => mirror(remote, &output.join(dir), Path::new(dir), force),
            false => Transfer::default(),
        };
        info!(kind = dir, ?pages, "uploaded pages");
        transfer += pages;
    }

    if mode.contains(Mode::RESOURCES) {
        let mut resources = Transfer::default();
        let pages = [Kind::Public.directory(), Kind::Draft.directory()];
        for name in top_level
            .iter()
            .filter(|name| !is_listing(name) && !pages.contains(&name.as_str()))
        {
            resources += mirror(remote, &output.join(name), Path::new(name), force);
        }
        info!(?resources, "uploaded resources");
        transfer += resources;
    }

    transfer
}
