//! Persists [`Page`]s to disk. A page is only rewritten when its content
//! differs from what is already on disk (or when forced), which keeps the
//! output tree stable for downstream mirroring.

use crate::page::Page;
use crate::util::copy_item;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A content hash of an output payload.
pub fn content_hash(bytes: &[u8]) -> blake3::Hash {
    blake3::hash(bytes)
}

/// The outcome of saving one page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Saved {
    /// The page file was (re)written.
    pub written: bool,

    /// Writing the page file failed.
    pub failed: bool,

    /// Assets now in place next to the page, copied or already there.
    pub assets: usize,

    /// Assets that could not be copied.
    pub asset_failures: usize,
}

/// Writes `page` below `output` unless an identical file is already there,
/// then copies the page's assets next to it. Failures are logged and
/// counted in the returned [`Saved`]; they never abort the run.
pub fn save_page(page: &Page, output: &Path, force: bool) -> Saved {
    let path = output.join(&page.location);
    let mut saved = Saved::default();
    match write_if_changed(page, &path, force) {
        Ok(written) => saved.written = written,
        Err(err) => {
            warn!(path = %path.display(), "writing page failed: {}", err);
            saved.failed = true;
        }
    }
    let (assets, asset_failures) = copy_assets(page, output, force);
    saved.assets = assets;
    saved.asset_failures = asset_failures;
    saved
}

fn write_if_changed(page: &Page, path: &Path, force: bool) -> std::io::Result<bool> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if !force && path.is_file() {
        let existing = fs::read(path)?;
        if content_hash(&existing) == content_hash(page.html.as_bytes()) {
            debug!(path = %path.display(), "unchanged, skipping");
            return Ok(false);
        }
    }

    fs::write(path, &page.html)?;
    debug!(path = %path.display(), "wrote page");
    Ok(true)
}

/// Copies every asset of `page`, returning how many are in place and how
/// many failed.
pub fn copy_assets(page: &Page, output: &Path, force: bool) -> (usize, usize) {
    // Assets of one page all share the page's own asset directory.
    if let Some(dir) = page
        .assets
        .first()
        .and_then(|(_, dst)| output.join(dst).parent().map(Path::to_owned))
    {
        if let Err(err) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), "creating asset directory failed: {}", err);
            return (0, page.assets.len());
        }
    }
    let copied = page
        .assets
        .iter()
        .filter(|(src, dst)| copy_item(src, &output.join(dst), force))
        .count();
    (copied, page.assets.len() - copied)
}
