use anyhow::{anyhow, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

pub fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}

/// Removes `dir` and everything below it. A missing directory is not an
/// error.
pub fn rmdir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound => Ok(()),
            _ => Err(e),
        },
    }
}

/// Copies a file or a whole directory tree from `src` to `dst`. Existing
/// destination files are overwritten only when `force` is set; otherwise
/// they are left alone and count as copied. Returns `false` if anything
/// failed to copy.
pub fn copy_item(src: &Path, dst: &Path, force: bool) -> bool {
    if src.is_dir() {
        return copy_dir(src, dst, force);
    }
    match copy_file(src, dst, force) {
        Ok(()) => true,
        Err(err) => {
            warn!(src = %src.display(), dst = %dst.display(), "copy failed: {}", err);
            false
        }
    }
}

fn copy_file(src: &Path, dst: &Path, force: bool) -> io::Result<()> {
    if dst.exists() && !force {
        return Ok(());
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst).map(|_| ())
}

fn copy_dir(src: &Path, dst: &Path, force: bool) -> bool {
    let mut ok = true;
    for result in WalkDir::new(src).min_depth(1) {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!(src = %src.display(), "listing directory: {}", err);
                ok = false;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        // strip_prefix shouldn't fail since `src` is always an ancestor of
        // the entry
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        ok &= copy_item(entry.path(), &dst.join(relative), force);
    }
    ok
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_item_respects_force() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("out").join("dst.txt");
        fs::write(&src, "new").unwrap();

        assert!(copy_item(&src, &dst, false));
        assert_eq!("new", fs::read_to_string(&dst).unwrap());

        fs::write(&dst, "old").unwrap();
        assert!(copy_item(&src, &dst, false));
        assert_eq!("old", fs::read_to_string(&dst).unwrap());

        assert!(copy_item(&src, &dst, true));
        assert_eq!("new", fs::read_to_string(&dst).unwrap());
    }

    #[test]
    fn test_copy_item_directory_tree() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("resources");
        fs::create_dir_all(src.join("css")).unwrap();
        fs::write(src.join("css").join("site.css"), "body {}").unwrap();
        fs::write(src.join("favicon.ico"), "icon").unwrap();

        let dst = dir.path().join("output");
        assert!(copy_item(&src, &dst, false));
        assert_eq!(
            "body {}",
            fs::read_to_string(dst.join("css").join("site.css")).unwrap()
        );
        assert!(dst.join("favicon.ico").is_file());
    }

    #[test]
    fn test_copy_item_missing_source() {
        let dir = TempDir::new().unwrap();
        assert!(!copy_item(
            &dir.path().join("missing.png"),
            &dir.path().join("out.png"),
            false
        ));
    }

    #[test]
    fn test_rmdir_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        assert!(rmdir(&dir.path().join("nope")).is_ok());
    }
}
